//! Shared test utilities for the token service.
//!
//! Fixture RSA material lives in `tests/fixtures/`; the golden key id and
//! admin token below are what any registry computes from those files. The
//! module is feature-gated behind `testutil` so it never ships in production
//! builds.
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use registry_auth_authn::testutil::{FixtureService, basic_auth};
//! use registry_auth_storage::testutil::FixtureIds;
//! ```

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use registry_auth_storage::{MemoryAuditLogger, MemoryRegistryStore, testutil::seeded_store};

use crate::{
    credential::{AdminTokenResolver, BasicCredentials, CallerIdentity, MemoryCredentialStore},
    decider::AuthorizationDecider,
    endpoint::TokenService,
    issuer::{TokenIssuer, TokenSettings},
    keys::KeyMaterial,
};

/// Key id of `tests/fixtures/cert.pem`.
pub const FIXTURE_KEY_ID: &str = "7334:4BQC:JI4L:JOWY:ZNNL:A22C:HOUF:3SMF:JIDM:OLZF:6Z4Q:5OSD";

/// Admin token derived from `tests/fixtures/key.pem`.
pub const FIXTURE_ADMIN_TOKEN: &str = "2959d1de-92b3-4939-814d-23a6d416d095";

/// Secret every fixture user logs in with.
pub const FIXTURE_SECRET: &str = "correct horse battery staple";

/// Path of a file in `tests/fixtures/`.
pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

/// Key material backed by the fixture key and certificate.
pub fn fixture_key_material() -> KeyMaterial {
    KeyMaterial::new(fixture_path("key.pem"), fixture_path("cert.pem"))
}

/// Issuer with default settings over [`fixture_key_material`].
pub fn fixture_issuer() -> TokenIssuer {
    TokenIssuer::new(Arc::new(fixture_key_material()), TokenSettings::default())
}

/// A `Basic` header for a fixture user.
pub fn basic_auth(user: &str) -> String {
    BasicCredentials::encode(user, FIXTURE_SECRET)
}

/// A fully wired [`TokenService`] over the seeded collaborator store.
///
/// Every user in the seeded store can log in with [`FIXTURE_SECRET`]; any
/// user name with [`FIXTURE_ADMIN_TOKEN`] is an admin.
pub struct FixtureService {
    /// The service under test.
    pub service: TokenService,
    /// Backing collaborator data; mutate it to shape a scenario.
    pub store: MemoryRegistryStore,
    /// Registered accounts.
    pub credentials: MemoryCredentialStore,
    /// Captured audit events.
    pub audit: MemoryAuditLogger,
}

impl FixtureService {
    /// Builds the service with default token settings.
    pub fn new() -> Self {
        Self::with_settings(TokenSettings::default())
    }

    /// Builds the service with custom token settings.
    pub fn with_settings(settings: TokenSettings) -> Self {
        Self::with_store(seeded_store(), settings)
    }

    /// Builds the service over an arbitrary store.
    pub fn with_store(store: MemoryRegistryStore, settings: TokenSettings) -> Self {
        use registry_auth_storage::testutil::FixtureIds;

        let keys = Arc::new(fixture_key_material());
        let credentials = MemoryCredentialStore::new();
        for user in [
            FixtureIds::COLLABORATOR,
            FixtureIds::REQUESTER,
            FixtureIds::DEPLOYMENT_OWNER,
            FixtureIds::STRANGER,
        ] {
            let identity = CallerIdentity::builder().id(user).internal_id(format!("u-{user}")).build();
            credentials.add_user(identity, FIXTURE_SECRET);
        }

        let audit = MemoryAuditLogger::new();
        let shared = Arc::new(store.clone());
        let service = TokenService::builder()
            .credentials(Arc::new(AdminTokenResolver::new(keys.clone(), credentials.clone())))
            .directory(shared.clone())
            .decider(AuthorizationDecider::standard(shared))
            .issuer(TokenIssuer::new(keys, settings))
            .audit(Arc::new(audit.clone()))
            .build();

        Self { service, store, credentials, audit }
    }
}

impl Default for FixtureService {
    fn default() -> Self {
        Self::new()
    }
}

/// Asserts that an expression is an `Err` matching an [`AuthError`](crate::AuthError) pattern.
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use registry_auth_authn::{AuthError, assert_auth_error};
///
/// let result: Result<(), AuthError> = Err(AuthError::MissingCredential);
/// assert_auth_error!(result, AuthError::MissingCredential);
/// ```
#[macro_export]
macro_rules! assert_auth_error {
    ($expr:expr, $pattern:pat $(if $guard:expr)? $(,)?) => {
        match $expr {
            Err($pattern) $(if $guard)? => {},
            Err(other) => panic!(
                "expected error matching `{}`, got: {other:?}",
                stringify!($pattern)
            ),
            Ok(_) => panic!("expected error matching `{}`, got Ok", stringify!($pattern)),
        }
    };
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::error::AuthError;

    #[test]
    fn test_fixture_files_exist() {
        for name in ["key.pem", "cert.pem", "public.pem", "other_key.pem", "other_cert.pem"] {
            assert!(fixture_path(name).exists(), "missing fixture {name}");
        }
    }

    #[test]
    fn test_fixture_service_registers_users() {
        let fixture = FixtureService::new();
        assert_eq!(fixture.credentials.len(), 4);
        assert!(fixture.audit.events().is_empty());
    }

    #[test]
    fn test_assert_auth_error_matches() {
        let result: Result<(), AuthError> = Err(AuthError::config("bad"));
        assert_auth_error!(result, AuthError::Config(ref m) if m == "bad");
    }

    #[test]
    #[should_panic(expected = "got Ok")]
    fn test_assert_auth_error_panics_on_ok() {
        let result: Result<(), AuthError> = Ok(());
        assert_auth_error!(result, AuthError::MissingCredential);
    }
}
