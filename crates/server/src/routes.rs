//! HTTP routes.
//!
//! - `GET /v1/registry_auth`: the registry token endpoint
//! - `POST /v1/registry_auth`: the same request as a JSON body
//! - `GET /healthz`: liveness plus a key material check

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::get,
};
use registry_auth_authn::{AuthError, ScopeParam, TokenRequest, TokenResponse, TokenService};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ApiError;

/// Path of the token endpoint.
pub const TOKEN_PATH: &str = "/v1/registry_auth";

/// Path of the health probe.
pub const HEALTH_PATH: &str = "/healthz";

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The token service.
    pub service: Arc<TokenService>,
}

/// Builds the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(TOKEN_PATH, get(issue_token).post(issue_token_json))
        .route(HEALTH_PATH, get(health))
        .with_state(state)
}

/// Decodes the query string of a token request.
///
/// `scope` may repeat; one value stays a single scope string, several become
/// a list. Only `offline_token=true` asks for a refresh token.
pub fn token_request_from_query(pairs: Vec<(String, String)>) -> TokenRequest {
    let mut request = TokenRequest::default();
    let mut scopes = Vec::new();

    for (key, value) in pairs {
        match key.as_str() {
            "service" => request.service = value,
            "scope" => scopes.push(value),
            "account" => request.account = Some(value),
            "client_id" => request.client_id = Some(value),
            "offline_token" => request.offline_token = value == "true",
            _ => {},
        }
    }

    request.scope = match scopes.len() {
        0 => None,
        1 => scopes.pop().map(ScopeParam::Single),
        _ => Some(ScopeParam::Many(scopes)),
    };
    request
}

/// JSON body of `POST /v1/registry_auth`.
///
/// `scope` is taken as raw JSON: a string, an array of strings or `null`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenRequestBody {
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub scope: Value,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub offline_token: bool,
}

impl TokenRequestBody {
    /// Normalizes the body into a [`TokenRequest`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ScopeFormat`] if `scope` has any other JSON shape.
    pub fn into_request(self) -> Result<TokenRequest, AuthError> {
        Ok(TokenRequest {
            service: self.service,
            scope: ScopeParam::from_value(self.scope)?,
            account: self.account,
            client_id: self.client_id,
            offline_token: self.offline_token,
        })
    }
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok())
}

/// `GET /v1/registry_auth`
pub async fn issue_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<TokenResponse>, ApiError> {
    let request = token_request_from_query(pairs);
    let response = state.service.handle(authorization(&headers), &request).await?;
    Ok(Json(response))
}

/// `POST /v1/registry_auth`
pub async fn issue_token_json(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<TokenRequestBody>,
) -> Result<Json<TokenResponse>, ApiError> {
    let request = body.into_request()?;
    let response = state.service.handle(authorization(&headers), &request).await?;
    Ok(Json(response))
}

/// `GET /healthz`
pub async fn health(State(state): State<AppState>) -> Response {
    match state.service.issuer().keys().key_id().await {
        Ok(kid) => Json(json!({"status": "ok", "kid": kid})).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"status": "unavailable"})))
                .into_response()
        },
    }
}
