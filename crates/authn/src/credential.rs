//! Caller authentication.
//!
//! Registry clients (`docker login`, `docker pull`) send HTTP Basic
//! credentials to the token endpoint. A [`CredentialResolver`] turns the
//! raw `Authorization` header into a [`CallerIdentity`].
//!
//! [`AdminTokenResolver`] wraps any resolver and recognizes the service's
//! own admin token (see [`KeyMaterial::admin_token`]) so internal
//! automation can pull and push without a user account.

use std::{collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::{
    error::{AuthError, Result},
    keys::KeyMaterial,
};

/// Internal id given to callers authenticated with the admin token.
pub const ADMIN_INTERNAL_ID: &str = "admin";

/// An authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
pub struct CallerIdentity {
    /// External user id; becomes the token's `sub`.
    #[builder(into)]
    pub id: String,

    /// Internal account id; becomes the token's `user` claim.
    #[builder(into)]
    pub internal_id: String,

    /// Admins bypass every authorization tier.
    #[builder(default)]
    #[serde(default)]
    pub is_admin: bool,
}

/// Resolves an `Authorization` header to a caller.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// Authenticates the header value.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredential`] if the header is malformed or
    /// does not authenticate. Backend failures may surface as other variants.
    async fn resolve(&self, authorization: &str) -> Result<CallerIdentity>;
}

#[async_trait]
impl<R: CredentialResolver + ?Sized> CredentialResolver for Arc<R> {
    async fn resolve(&self, authorization: &str) -> Result<CallerIdentity> {
        (**self).resolve(authorization).await
    }
}

/// Parsed HTTP Basic credentials. The secret is wiped on drop.
#[derive(Clone)]
pub struct BasicCredentials {
    /// The user name before the first `:`.
    pub username: String,
    secret: Zeroizing<String>,
}

impl BasicCredentials {
    /// Parses `Basic base64(username:secret)`. The scheme is case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredential`] for any other scheme, invalid
    /// base64 or UTF-8, a missing `:`, or an empty user name.
    ///
    /// # Examples
    ///
    /// ```
    /// use registry_auth_authn::credential::BasicCredentials;
    ///
    /// let creds = BasicCredentials::parse("Basic YWxpY2U6czNjcmV0").unwrap();
    /// assert_eq!(creds.username, "alice");
    /// assert_eq!(creds.secret(), "s3cret");
    /// ```
    pub fn parse(header: &str) -> Result<Self> {
        let (scheme, encoded) = header
            .trim()
            .split_once(' ')
            .ok_or_else(|| AuthError::invalid_credential("malformed authorization header"))?;

        if !scheme.eq_ignore_ascii_case("basic") {
            return Err(AuthError::invalid_credential(format!(
                "unsupported authorization scheme '{scheme}'"
            )));
        }

        let decoded = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|_| AuthError::invalid_credential("basic credentials are not base64"))?,
        );
        let decoded = std::str::from_utf8(&decoded)
            .map_err(|_| AuthError::invalid_credential("basic credentials are not UTF-8"))?;

        let (username, secret) = decoded
            .split_once(':')
            .ok_or_else(|| AuthError::invalid_credential("basic credentials lack a ':'"))?;

        if username.is_empty() {
            return Err(AuthError::invalid_credential("empty user name"));
        }

        Ok(Self { username: username.to_owned(), secret: Zeroizing::new(secret.to_owned()) })
    }

    /// Builds a Basic header value.
    #[must_use]
    pub fn encode(username: &str, secret: &str) -> String {
        let raw = Zeroizing::new(format!("{username}:{secret}"));
        format!("Basic {}", STANDARD.encode(raw.as_bytes()))
    }

    /// The secret part of the credentials.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Compares the secret with `expected` in constant time.
    #[must_use]
    pub fn secret_matches(&self, expected: &str) -> bool {
        self.secret.as_bytes().ct_eq(expected.as_bytes()).into()
    }
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Accepts the service admin token as a Basic secret, else delegates.
///
/// Any user name may be presented with the admin token; it becomes the
/// token's `sub` so automation can identify itself.
#[derive(Debug)]
pub struct AdminTokenResolver<R> {
    keys: Arc<KeyMaterial>,
    inner: R,
}

impl<R> AdminTokenResolver<R> {
    /// Wraps `inner`.
    pub fn new(keys: Arc<KeyMaterial>, inner: R) -> Self {
        Self { keys, inner }
    }
}

#[async_trait]
impl<R: CredentialResolver> CredentialResolver for AdminTokenResolver<R> {
    async fn resolve(&self, authorization: &str) -> Result<CallerIdentity> {
        if let Ok(credentials) = BasicCredentials::parse(authorization) {
            let admin_token = self.keys.admin_token().await?;
            if credentials.secret_matches(&admin_token) {
                tracing::debug!(user = %credentials.username, "Authenticated with admin token");
                return Ok(CallerIdentity {
                    id: credentials.username,
                    internal_id: ADMIN_INTERNAL_ID.to_owned(),
                    is_admin: true,
                });
            }
        }

        self.inner.resolve(authorization).await
    }
}

#[derive(Debug, Clone)]
struct StoredCredential {
    secret_digest: [u8; 32],
    identity: CallerIdentity,
}

/// In-memory user accounts keyed by user name, for tests and development.
///
/// Secrets are kept as SHA-256 digests and compared in constant time.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    users: Arc<RwLock<HashMap<String, StoredCredential>>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `identity` under its `id` with the given secret.
    pub fn add_user(&self, identity: CallerIdentity, secret: &str) {
        let stored = StoredCredential { secret_digest: digest(secret), identity };
        self.users.write().insert(stored.identity.id.clone(), stored);
    }

    /// Number of registered users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    /// Returns `true` if no user is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

fn digest(secret: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(secret.as_bytes()));
    out
}

#[async_trait]
impl CredentialResolver for MemoryCredentialStore {
    async fn resolve(&self, authorization: &str) -> Result<CallerIdentity> {
        let credentials = BasicCredentials::parse(authorization)?;
        let presented = digest(credentials.secret());

        let users = self.users.read();
        let stored = users
            .get(&credentials.username)
            .filter(|stored| bool::from(stored.secret_digest[..].ct_eq(&presented[..])))
            .ok_or_else(|| AuthError::invalid_credential("User authentication failed"))?;

        Ok(stored.identity.clone())
    }
}
