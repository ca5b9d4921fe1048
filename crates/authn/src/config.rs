//! Configuration for the registry token service.
//!
//! [`RegistryAuthConfig`] names the signing key files and the identifiers
//! written into every token. It is deserialized from the server's config
//! file (durations in `humantime` form such as `1h` or `30d`) or built in
//! code with a validating builder.

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    error::{AuthError, Result},
    issuer::TokenSettings,
};

/// Default `aud` claim, which registries compare with their configured service.
pub const DEFAULT_SERVICE: &str = "RegistryAuth";

/// Default `iss` claim.
pub const DEFAULT_ISSUER: &str = "RegistryIssuer";

/// Default access token lifetime (1 hour).
pub const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Default refresh token lifetime (30 days).
pub const DEFAULT_REFRESH_TOKEN_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Token service configuration.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use registry_auth_authn::RegistryAuthConfig;
///
/// let config = RegistryAuthConfig::builder()
///     .private_key_path("/etc/registry-auth/key.pem")
///     .certificate_path("/etc/registry-auth/cert.pem")
///     .access_token_ttl(Duration::from_secs(300))
///     .build()?;
///
/// assert_eq!(config.service(), "RegistryAuth");
/// # Ok::<(), registry_auth_authn::AuthError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryAuthConfig {
    /// PEM private key used to sign tokens.
    pub(crate) private_key_path: PathBuf,

    /// PEM certificate holding the matching public key.
    pub(crate) certificate_path: PathBuf,

    /// Service id; requests for any other service are refused.
    #[serde(default = "default_service")]
    pub(crate) service: String,

    /// Issuer id written to `iss`.
    #[serde(default = "default_issuer")]
    pub(crate) issuer: String,

    /// Access token lifetime.
    #[serde(with = "humantime_serde", default = "default_access_token_ttl")]
    pub(crate) access_token_ttl: Duration,

    /// Refresh token lifetime.
    #[serde(with = "humantime_serde", default = "default_refresh_token_ttl")]
    pub(crate) refresh_token_ttl: Duration,
}

fn default_service() -> String {
    DEFAULT_SERVICE.to_owned()
}

fn default_issuer() -> String {
    DEFAULT_ISSUER.to_owned()
}

fn default_access_token_ttl() -> Duration {
    DEFAULT_ACCESS_TOKEN_TTL
}

fn default_refresh_token_ttl() -> Duration {
    DEFAULT_REFRESH_TOKEN_TTL
}

#[bon::bon]
impl RegistryAuthConfig {
    /// Creates a new configuration, validating all fields.
    ///
    /// # Optional Fields
    ///
    /// * `service` - default `RegistryAuth`
    /// * `issuer` - default `RegistryIssuer`
    /// * `access_token_ttl` - default 1 hour
    /// * `refresh_token_ttl` - default 30 days
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if a key path, the service or the
    /// issuer is empty, or a TTL is zero.
    #[builder]
    pub fn new(
        #[builder(into)] private_key_path: PathBuf,
        #[builder(into)] certificate_path: PathBuf,
        #[builder(into, default = DEFAULT_SERVICE.to_owned())] service: String,
        #[builder(into, default = DEFAULT_ISSUER.to_owned())] issuer: String,
        #[builder(default = DEFAULT_ACCESS_TOKEN_TTL)] access_token_ttl: Duration,
        #[builder(default = DEFAULT_REFRESH_TOKEN_TTL)] refresh_token_ttl: Duration,
    ) -> Result<Self> {
        let config = Self {
            private_key_path,
            certificate_path,
            service,
            issuer,
            access_token_ttl,
            refresh_token_ttl,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks a configuration obtained by deserialization.
    ///
    /// # Errors
    ///
    /// Same conditions as the builder.
    pub fn validate(&self) -> Result<()> {
        if self.private_key_path.as_os_str().is_empty() {
            return Err(AuthError::config("private_key_path cannot be empty"));
        }
        if self.certificate_path.as_os_str().is_empty() {
            return Err(AuthError::config("certificate_path cannot be empty"));
        }
        if self.service.trim().is_empty() {
            return Err(AuthError::config("service cannot be empty"));
        }
        if self.issuer.trim().is_empty() {
            return Err(AuthError::config("issuer cannot be empty"));
        }
        if self.access_token_ttl.is_zero() {
            return Err(AuthError::config("access_token_ttl must be greater than zero"));
        }
        if self.refresh_token_ttl.is_zero() {
            return Err(AuthError::config("refresh_token_ttl must be greater than zero"));
        }
        Ok(())
    }

    /// Returns the private key path.
    #[must_use]
    pub fn private_key_path(&self) -> &std::path::Path {
        &self.private_key_path
    }

    /// Returns the certificate path.
    #[must_use]
    pub fn certificate_path(&self) -> &std::path::Path {
        &self.certificate_path
    }

    /// Returns the service id.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Returns the issuer id.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns the access token lifetime.
    #[must_use]
    pub fn access_token_ttl(&self) -> Duration {
        self.access_token_ttl
    }

    /// Returns the refresh token lifetime.
    #[must_use]
    pub fn refresh_token_ttl(&self) -> Duration {
        self.refresh_token_ttl
    }

    /// Claims and lifetimes for the token issuer.
    #[must_use]
    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings::builder()
            .audience(self.service.clone())
            .issuer(self.issuer.clone())
            .access_ttl(self.access_token_ttl)
            .refresh_ttl(self.refresh_token_ttl)
            .build()
    }
}
