//! Server configuration.
//!
//! Loaded from an optional TOML file, then `REGISTRY_AUTH__*` environment
//! variables (`__` separates nesting levels), then CLI overrides:
//!
//! ```toml
//! listen = "0.0.0.0:3100"
//! seed = "/etc/registry-auth/seed.json"
//!
//! [auth]
//! private_key_path = "/etc/registry-auth/key.pem"
//! certificate_path = "/etc/registry-auth/cert.pem"
//! service = "RegistryAuth"
//! access_token_ttl = "1h"
//! ```
//!
//! `REGISTRY_AUTH__AUTH__SERVICE=registry.example.com` overrides `auth.service`.

use std::{
    net::{Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
};

use registry_auth_authn::RegistryAuthConfig;
use serde::Deserialize;

use crate::error::ServerError;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "REGISTRY_AUTH";

/// Default listen address.
pub const DEFAULT_LISTEN: SocketAddr = SocketAddr::new(
    std::net::IpAddr::V4(Ipv4Addr::LOCALHOST),
    3100,
);

/// Top-level server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the HTTP server binds to.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Token service settings.
    pub auth: RegistryAuthConfig,

    /// Optional JSON seed for the in-memory stores.
    #[serde(default)]
    pub seed: Option<PathBuf>,
}

fn default_listen() -> SocketAddr {
    DEFAULT_LISTEN
}

impl ServerConfig {
    /// Loads the configuration from `path` (if any) and the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if a source cannot be read or the
    /// merged result does not deserialize, and [`ServerError::Auth`] if the
    /// token settings are invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ServerError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).format(config::FileFormat::Toml));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX).prefix_separator("__").separator("__"),
        );
        Self::finish(builder)
    }

    /// Parses a TOML document, without consulting the environment.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub fn from_toml(toml: &str) -> Result<Self, ServerError> {
        let builder = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml));
        Self::finish(builder)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ServerError> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.auth.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::time::Duration;

    use super::*;

    const MINIMAL: &str = r#"
        [auth]
        private_key_path = "/keys/key.pem"
        certificate_path = "/keys/cert.pem"
    "#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = ServerConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.listen, DEFAULT_LISTEN);
        assert!(config.seed.is_none());
        assert_eq!(config.auth.service(), "RegistryAuth");
        assert_eq!(config.auth.access_token_ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_full_config() {
        let config = ServerConfig::from_toml(
            r#"
            listen = "0.0.0.0:8080"
            seed = "/etc/seed.json"

            [auth]
            private_key_path = "/keys/key.pem"
            certificate_path = "/keys/cert.pem"
            service = "registry.example.com"
            issuer = "model-hub"
            access_token_ttl = "5m"
            refresh_token_ttl = "7d"
            "#,
        )
        .unwrap();

        assert_eq!(config.listen.port(), 8080);
        assert_eq!(config.seed.as_deref(), Some(Path::new("/etc/seed.json")));
        assert_eq!(config.auth.service(), "registry.example.com");
        assert_eq!(config.auth.issuer(), "model-hub");
        assert_eq!(config.auth.access_token_ttl(), Duration::from_secs(300));
        assert_eq!(config.auth.refresh_token_ttl(), Duration::from_secs(7 * 24 * 3600));
    }

    #[test]
    fn test_missing_auth_section_is_rejected() {
        assert!(matches!(ServerConfig::from_toml(""), Err(ServerError::Config(_))));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let toml = format!("{MINIMAL}\nbogus = true\n");
        assert!(matches!(ServerConfig::from_toml(&toml), Err(ServerError::Config(_))));
    }

    #[test]
    fn test_invalid_auth_settings_are_rejected() {
        let toml = format!("{MINIMAL}\nservice = \"\"\n");
        assert!(matches!(ServerConfig::from_toml(&toml), Err(ServerError::Auth(_))));
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry-auth.toml");
        std::fs::write(&path, MINIMAL).unwrap();

        let config = ServerConfig::load(Some(&path)).unwrap();
        assert_eq!(config.auth.private_key_path(), Path::new("/keys/key.pem"));
    }
}
