//! Registry token issuance.
//!
//! Tokens are compact RS256 JWTs. The header carries the certificate-derived
//! `kid` so the registry can match the token to the certificate it was
//! configured with. Two kinds are issued:
//!
//! - **access tokens** list the granted `{type, name, actions}` entries in an `access` claim and
//!   live for an hour by default;
//! - **refresh tokens** (`usage: "refresh_token"`) carry no grant and live for thirty days by
//!   default. Clients request them with `offline_token=true`.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use jsonwebtoken::{Algorithm, Header};
use serde::{Deserialize, Serialize};

use crate::{
    config::{DEFAULT_ACCESS_TOKEN_TTL, DEFAULT_ISSUER, DEFAULT_REFRESH_TOKEN_TTL, DEFAULT_SERVICE},
    credential::CallerIdentity,
    error::{AuthError, Result},
    keys::KeyMaterial,
    scope::AccessRequest,
};

/// Value of the `usage` claim on refresh tokens.
pub const REFRESH_TOKEN_USAGE: &str = "refresh_token";

/// Registered claims and lifetimes applied to every token.
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder)]
pub struct TokenSettings {
    /// `aud` claim; the registry's configured service.
    #[builder(into, default = DEFAULT_SERVICE.to_owned())]
    pub audience: String,
    /// `iss` claim.
    #[builder(into, default = DEFAULT_ISSUER.to_owned())]
    pub issuer: String,
    /// Access token lifetime.
    #[builder(default = DEFAULT_ACCESS_TOKEN_TTL)]
    pub access_ttl: Duration,
    /// Refresh token lifetime.
    #[builder(default = DEFAULT_REFRESH_TOKEN_TTL)]
    pub refresh_ttl: Duration,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Claims of an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Caller's external id.
    pub sub: String,
    /// Caller's internal account id.
    pub user: String,
    /// Granted entries. Empty for a login probe.
    pub access: Vec<AccessRequest>,
    /// Unique token id.
    pub jti: String,
    /// Audience (service id).
    pub aud: String,
    /// Issuer id.
    pub iss: String,
    /// Issued at (seconds since epoch).
    pub iat: i64,
    /// Expiration (seconds since epoch).
    pub exp: i64,
}

/// Claims of a refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Caller's external id.
    pub sub: String,
    /// Caller's internal account id.
    pub user: String,
    /// Always [`REFRESH_TOKEN_USAGE`].
    pub usage: String,
    /// Unique token id.
    pub jti: String,
    /// Audience (service id).
    pub aud: String,
    /// Issuer id.
    pub iss: String,
    /// Issued at (seconds since epoch).
    pub iat: i64,
    /// Expiration (seconds since epoch).
    pub exp: i64,
}

/// Signs registry tokens with the service key.
///
/// Issuance has no side effects beyond the signature; every call gets a
/// fresh random `jti`.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    keys: Arc<KeyMaterial>,
    settings: TokenSettings,
}

struct Registered {
    jti: String,
    iat: i64,
    exp: i64,
}

impl TokenIssuer {
    /// Creates an issuer.
    #[must_use]
    pub fn new(keys: Arc<KeyMaterial>, settings: TokenSettings) -> Self {
        Self { keys, settings }
    }

    /// The key material tokens are signed with.
    #[must_use]
    pub fn keys(&self) -> &Arc<KeyMaterial> {
        &self.keys
    }

    /// Claims and lifetimes in use.
    #[must_use]
    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    /// Issues an access token granting exactly `access`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyLoad`] if the key material is unusable and
    /// [`AuthError::TokenSigning`] if signing fails.
    pub async fn issue_access_token(
        &self,
        identity: &CallerIdentity,
        access: &[AccessRequest],
    ) -> Result<String> {
        let registered = registered_claims(self.settings.access_ttl)?;
        let claims = AccessClaims {
            sub: identity.id.clone(),
            user: identity.internal_id.clone(),
            access: access.to_vec(),
            jti: registered.jti,
            aud: self.settings.audience.clone(),
            iss: self.settings.issuer.clone(),
            iat: registered.iat,
            exp: registered.exp,
        };
        self.sign(&claims).await
    }

    /// Issues a refresh token.
    ///
    /// # Errors
    ///
    /// Same as [`issue_access_token`](Self::issue_access_token).
    pub async fn issue_refresh_token(&self, identity: &CallerIdentity) -> Result<String> {
        let registered = registered_claims(self.settings.refresh_ttl)?;
        let claims = RefreshClaims {
            sub: identity.id.clone(),
            user: identity.internal_id.clone(),
            usage: REFRESH_TOKEN_USAGE.to_owned(),
            jti: registered.jti,
            aud: self.settings.audience.clone(),
            iss: self.settings.issuer.clone(),
            iat: registered.iat,
            exp: registered.exp,
        };
        self.sign(&claims).await
    }

    async fn sign<C: Serialize>(&self, claims: &C) -> Result<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.keys.key_id().await?);
        let key = self.keys.encoding_key().await?;

        jsonwebtoken::encode(&header, claims, &key).map_err(|e| {
            tracing::error!(error = %e, "Failed to sign registry token");
            AuthError::token_signing(e.to_string())
        })
    }
}

fn registered_claims(ttl: Duration) -> Result<Registered> {
    let ttl = i64::try_from(ttl.as_secs())
        .map_err(|_| AuthError::config("token lifetime is out of range"))?;
    let iat = Utc::now().timestamp();
    Ok(Registered { jti: uuid::Uuid::new_v4().to_string(), iat, exp: iat.saturating_add(ttl) })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::{
        jwt::{decode_token_header, decode_unverified_claims, verify_token},
        testutil::{FIXTURE_KEY_ID, fixture_issuer, fixture_key_material},
    };

    fn alice() -> CallerIdentity {
        CallerIdentity::builder().id("alice").internal_id("u-1").build()
    }

    #[tokio::test]
    async fn test_access_token_header_and_claims() {
        let issuer = fixture_issuer();
        let access = vec![AccessRequest::parse("repository:model-a/img:pull")];
        let token = issuer.issue_access_token(&alice(), &access).await.unwrap();

        let header = decode_token_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some(FIXTURE_KEY_ID));
        assert_eq!(header.typ.as_deref(), Some("JWT"));

        let key = issuer.keys().decoding_key().await.unwrap();
        let claims: AccessClaims =
            verify_token(&token, &key, DEFAULT_SERVICE, DEFAULT_ISSUER).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.user, "u-1");
        assert_eq!(claims.access, access);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(uuid::Uuid::parse_str(&claims.jti).is_ok());
    }

    #[tokio::test]
    async fn test_empty_grant_still_verifies() {
        let issuer = fixture_issuer();
        let token = issuer.issue_access_token(&alice(), &[]).await.unwrap();

        let key = issuer.keys().decoding_key().await.unwrap();
        let claims: AccessClaims =
            verify_token(&token, &key, DEFAULT_SERVICE, DEFAULT_ISSUER).unwrap();
        assert!(claims.access.is_empty());

        let raw: serde_json::Value = decode_unverified_claims(&token).unwrap();
        assert_eq!(raw["access"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_refresh_token_claims() {
        let issuer = fixture_issuer();
        let token = issuer.issue_refresh_token(&alice()).await.unwrap();

        let key = issuer.keys().decoding_key().await.unwrap();
        let claims: RefreshClaims =
            verify_token(&token, &key, DEFAULT_SERVICE, DEFAULT_ISSUER).unwrap();
        assert_eq!(claims.usage, REFRESH_TOKEN_USAGE);
        assert_eq!(claims.exp - claims.iat, 30 * 24 * 3600);

        let raw: serde_json::Value = decode_unverified_claims(&token).unwrap();
        assert!(raw.get("access").is_none());
    }

    #[tokio::test]
    async fn test_jti_is_fresh_per_token() {
        let issuer = fixture_issuer();
        let a: AccessClaims =
            decode_unverified_claims(&issuer.issue_access_token(&alice(), &[]).await.unwrap())
                .unwrap();
        let b: AccessClaims =
            decode_unverified_claims(&issuer.issue_access_token(&alice(), &[]).await.unwrap())
                .unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[tokio::test]
    async fn test_custom_settings_are_applied() {
        let settings = TokenSettings::builder()
            .audience("registry.example.com")
            .issuer("model-hub")
            .access_ttl(Duration::from_secs(120))
            .build();
        let issuer = TokenIssuer::new(Arc::new(fixture_key_material()), settings);
        let token = issuer.issue_access_token(&alice(), &[]).await.unwrap();

        let key = issuer.keys().decoding_key().await.unwrap();
        let claims: AccessClaims =
            verify_token(&token, &key, "registry.example.com", "model-hub").unwrap();
        assert_eq!(claims.exp - claims.iat, 120);
    }

    #[tokio::test]
    async fn test_unreadable_key_fails_issuance() {
        let keys = Arc::new(KeyMaterial::new("/nonexistent/key.pem", "/nonexistent/cert.pem"));
        let issuer = TokenIssuer::new(keys, TokenSettings::default());
        let err = issuer.issue_access_token(&alice(), &[]).await.unwrap_err();
        assert!(matches!(err, AuthError::KeyLoad { .. }));
    }
}
