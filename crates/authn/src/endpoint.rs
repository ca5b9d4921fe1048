//! Token endpoint orchestration.
//!
//! [`TokenService::handle`] is everything the HTTP layer needs: it takes the
//! raw `Authorization` header and the decoded query and returns either a
//! signed token or an [`AuthError`] whose [`class`](AuthError::class) picks
//! the HTTP status.
//!
//! ```text
//! Unauthenticated ──▶ Authenticated ──▶ ScopeParsed ──▶ Authorized ──▶ Issued
//!        │                  │  │                           │
//!        ▼                  │  └── offline_token ──▶ refresh token
//!  MissingCredential        └── no scope ──▶ zero-access token
//! ```

use std::{collections::BTreeMap, sync::Arc};

use registry_auth_storage::{
    AuditAction, AuditEvent, AuditLogger, AuditResult, EntityDirectory, TracingAuditLogger,
    audit::repository_resource,
};
use serde::{Deserialize, Serialize};

use crate::{
    credential::{CallerIdentity, CredentialResolver},
    decider::{AuthorizationDecider, CallerContext},
    error::{AuthError, ErrorClass, Result},
    issuer::TokenIssuer,
    scope::{AccessRequest, ScopeParam, parse_scope},
};

/// Actor recorded for requests that never authenticated.
const ANONYMOUS_ACTOR: &str = "anonymous";

/// Query parameters of a registry token request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
pub struct TokenRequest {
    /// Service the token is for; must match the configured audience.
    #[builder(into)]
    pub service: String,

    /// Requested scope. `None` is a login probe.
    pub scope: Option<ScopeParam>,

    /// Account the client claims to be. Informational only.
    #[builder(into)]
    pub account: Option<String>,

    /// Client software identifier. Informational only.
    #[builder(into)]
    pub client_id: Option<String>,

    /// Ask for a refresh token instead of an access token.
    #[builder(default)]
    #[serde(default)]
    pub offline_token: bool,
}

/// Successful response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The signed token.
    pub token: String,
}

/// Authenticates, authorizes and issues registry tokens.
#[derive(bon::Builder)]
pub struct TokenService {
    credentials: Arc<dyn CredentialResolver>,
    directory: Arc<dyn EntityDirectory>,
    decider: AuthorizationDecider,
    issuer: TokenIssuer,
    #[builder(default = Arc::new(TracingAuditLogger))]
    audit: Arc<dyn AuditLogger>,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("decider", &self.decider)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// The issuer tokens are signed with.
    #[must_use]
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Handles one token request.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingCredential`] without an `Authorization` header
    /// - resolver errors, typically [`AuthError::InvalidCredential`]
    /// - [`AuthError::UnexpectedService`] for a foreign `service`
    /// - [`AuthError::AccessDenied`] for the first refused scope entry
    /// - [`AuthError::Lookup`], [`AuthError::KeyLoad`] or [`AuthError::TokenSigning`] for
    ///   infrastructure faults
    #[tracing::instrument(
        name = "registry_token_request",
        skip_all,
        fields(
            service = %request.service,
            account = request.account.as_deref().unwrap_or_default(),
            client_id = request.client_id.as_deref().unwrap_or_default(),
            offline = request.offline_token,
        )
    )]
    pub async fn handle(
        &self,
        authorization: Option<&str>,
        request: &TokenRequest,
    ) -> Result<TokenResponse> {
        let result = self.process(authorization, request).await;
        if let Err(e) = &result {
            match e.class() {
                ErrorClass::Forbidden => {
                    tracing::debug!(code = e.code(), error = %e, "Token request refused");
                },
                ErrorClass::Internal => {
                    tracing::error!(code = e.code(), error = %e, "Token request failed");
                },
            }
        }
        result
    }

    async fn process(
        &self,
        authorization: Option<&str>,
        request: &TokenRequest,
    ) -> Result<TokenResponse> {
        let Some(authorization) = authorization else {
            let err = AuthError::MissingCredential;
            self.record_credential_rejection(request, &err).await;
            return Err(err);
        };

        let identity = match self.credentials.resolve(authorization).await {
            Ok(identity) => identity,
            Err(e) => {
                self.record_credential_rejection(request, &e).await;
                return Err(e);
            },
        };

        let expected = &self.issuer.settings().audience;
        if request.service != *expected {
            tracing::warn!(
                requested = %request.service,
                expected = %expected,
                "Received registry auth request for unexpected service"
            );
            let err = AuthError::unexpected_service(&request.service);
            self.record(
                request,
                &identity.id,
                AuditAction::RejectCredential,
                service_resource(request),
                AuditResult::Failure(err.code().to_owned()),
                BTreeMap::new(),
            )
            .await;
            return Err(err);
        }

        if request.offline_token {
            let token = self.issuer.issue_refresh_token(&identity).await?;
            self.record(
                request,
                &identity.id,
                AuditAction::IssueRefreshToken,
                service_resource(request),
                AuditResult::Success,
                BTreeMap::new(),
            )
            .await;
            return Ok(TokenResponse { token });
        }

        let accesses = request.scope.as_ref().map(parse_scope).unwrap_or_default();
        if accesses.is_empty() {
            tracing::debug!(user = %identity.id, "No scope requested, issuing login token");
        } else {
            self.authorize(request, &identity, &accesses).await?;
        }

        let token = self.issuer.issue_access_token(&identity, &accesses).await?;
        self.record(
            request,
            &identity.id,
            AuditAction::IssueAccessToken,
            describe(&accesses),
            AuditResult::Success,
            BTreeMap::new(),
        )
        .await;
        Ok(TokenResponse { token })
    }

    async fn authorize(
        &self,
        request: &TokenRequest,
        identity: &CallerIdentity,
        accesses: &[AccessRequest],
    ) -> Result<()> {
        if identity.is_admin {
            tracing::debug!(user = %identity.id, "Admin caller, skipping authorization");
            return Ok(());
        }

        let ctx = CallerContext::resolve(identity.clone(), self.directory.as_ref()).await?;
        let result = self.decider.authorize_all(&ctx, accesses).await;

        if let Err(AuthError::AccessDenied { access, reason, .. }) = &result {
            let extra = BTreeMap::from([
                ("reason".to_owned(), reason.to_string()),
                ("tier".to_owned(), reason.tier().to_string()),
                ("actions".to_owned(), access.actions.join(",")),
            ]);
            self.record(
                request,
                &identity.id,
                AuditAction::DenyAccess,
                repository_resource(&access.resource_type, &access.name),
                AuditResult::Failure(reason.to_string()),
                extra,
            )
            .await;
        }
        result
    }

    async fn record_credential_rejection(&self, request: &TokenRequest, err: &AuthError) {
        if err.class() != ErrorClass::Forbidden {
            return;
        }
        self.record(
            request,
            ANONYMOUS_ACTOR,
            AuditAction::RejectCredential,
            service_resource(request),
            AuditResult::Failure(err.code().to_owned()),
            BTreeMap::new(),
        )
        .await;
    }

    async fn record(
        &self,
        request: &TokenRequest,
        actor: &str,
        action: AuditAction,
        resource: String,
        result: AuditResult,
        extra: BTreeMap<String, String>,
    ) {
        let mut metadata = request_metadata(request);
        metadata.extend(extra);
        let event = AuditEvent::builder()
            .actor(actor)
            .action(action)
            .resource(resource)
            .result(result)
            .metadata(metadata)
            .build();
        self.audit.log(&event).await;
    }
}

fn service_resource(request: &TokenRequest) -> String {
    format!("service:{}", request.service)
}

fn request_metadata(request: &TokenRequest) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    if let Some(account) = &request.account {
        metadata.insert("account".to_owned(), account.clone());
    }
    if let Some(client_id) = &request.client_id {
        metadata.insert("client_id".to_owned(), client_id.clone());
    }
    metadata
}

fn describe(accesses: &[AccessRequest]) -> String {
    if accesses.is_empty() {
        return "login".to_owned();
    }
    accesses
        .iter()
        .map(|access| {
            let resource = repository_resource(&access.resource_type, &access.name);
            format!("{resource}:{}", access.actions.join(","))
        })
        .collect::<Vec<_>>()
        .join(" ")
}
