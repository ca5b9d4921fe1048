//! # Registry Token Authentication
//!
//! Token service for OCI/Docker registries using the token authentication
//! flow. A registry redirects unauthenticated clients here; this crate
//! authenticates them, decides which of the requested scope entries they may
//! have, and signs an RS256 token the registry verifies against the
//! service certificate.
//!
//! This crate provides:
//! - **Key material**: certificate-derived `kid`, private-key-derived admin token
//! - **Scope parsing**: `type[(class)]:name:actions` entries from string or list input
//! - **Authorization**: a chain of tiers (current models, then legacy deployments)
//! - **Issuance**: access and refresh tokens
//! - **Orchestration**: [`TokenService`] ties the steps together for the HTTP layer
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use registry_auth_authn::{
//!     AuthorizationDecider, KeyMaterial, MemoryCredentialStore, RegistryAuthConfig,
//!     TokenIssuer, TokenRequest, TokenService, credential::AdminTokenResolver,
//! };
//! use registry_auth_storage::MemoryRegistryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RegistryAuthConfig::builder()
//!     .private_key_path("/etc/registry-auth/key.pem")
//!     .certificate_path("/etc/registry-auth/cert.pem")
//!     .build()?;
//!
//! let keys = Arc::new(KeyMaterial::from_config(&config));
//! keys.preload().await?;
//!
//! let store = Arc::new(MemoryRegistryStore::new());
//! let service = TokenService::builder()
//!     .credentials(Arc::new(AdminTokenResolver::new(keys.clone(), MemoryCredentialStore::new())))
//!     .directory(store.clone())
//!     .decider(AuthorizationDecider::standard(store))
//!     .issuer(TokenIssuer::new(keys, config.token_settings()))
//!     .build();
//!
//! let request = TokenRequest::builder().service("RegistryAuth").build();
//! let response = service.handle(Some("Basic YWxpY2U6czNjcmV0"), &request).await?;
//! println!("{}", response.token);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Service configuration.
pub mod config;
/// Caller authentication.
pub mod credential;
pub mod decider;
pub mod endpoint;
/// Token service error types.
pub mod error;
pub mod issuer;
pub mod jwt;
/// Signing key material and derived identifiers.
pub mod keys;
/// Registry scope parsing.
pub mod scope;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic, missing_docs)]
pub mod testutil;
/// Token header validation.
pub mod validation;

// Re-export key types for convenience
pub use config::RegistryAuthConfig;
pub use credential::{CallerIdentity, CredentialResolver, MemoryCredentialStore};
pub use decider::{AuthorizationDecider, CallerContext, DenyReason, Resolution};
pub use endpoint::{TokenRequest, TokenResponse, TokenService};
pub use error::{AuthError, ErrorClass, Result};
pub use issuer::{AccessClaims, RefreshClaims, TokenIssuer, TokenSettings};
pub use keys::KeyMaterial;
pub use scope::{AccessRequest, ScopeParam, parse_scope};
pub use validation::{ACCEPTED_ALGORITHMS, FORBIDDEN_ALGORITHMS, validate_algorithm};
