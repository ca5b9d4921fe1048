//! Harness shared by the integration tests.
//!
//! Wires a [`TokenService`] over the seeded collaborator store using only
//! the public API, the way the server binary does.
#![allow(dead_code, clippy::expect_used)]

use std::sync::Arc;

use registry_auth_authn::{
    AccessClaims, AuthorizationDecider, CallerIdentity, MemoryCredentialStore, ScopeParam,
    TokenIssuer, TokenRequest, TokenService, TokenSettings,
    credential::{AdminTokenResolver, BasicCredentials},
    jwt::verify_access_token,
    keys::KeyMaterial,
    testutil::fixture_key_material,
};
pub use registry_auth_authn::testutil::{
    FIXTURE_ADMIN_TOKEN as ADMIN_TOKEN, FIXTURE_KEY_ID as KEY_ID, FIXTURE_SECRET as SECRET,
    fixture_path as fixture,
};
use registry_auth_storage::{
    EntityDirectory, MemoryAuditLogger, MemoryRegistryStore,
    testutil::{FixtureIds, seeded_store},
};

pub const SERVICE: &str = "RegistryAuth";
pub const ISSUER: &str = "RegistryIssuer";

pub fn key_material() -> Arc<KeyMaterial> {
    Arc::new(fixture_key_material())
}

pub fn basic(user: &str) -> String {
    BasicCredentials::encode(user, SECRET)
}

pub fn admin(user: &str) -> String {
    BasicCredentials::encode(user, ADMIN_TOKEN)
}

pub fn request(scope: Option<ScopeParam>) -> TokenRequest {
    TokenRequest::builder()
        .service(SERVICE)
        .maybe_scope(scope)
        .account("docker")
        .client_id("docker")
        .build()
}

pub fn scoped(scope: &str) -> TokenRequest {
    request(Some(ScopeParam::from(scope)))
}

pub struct Harness {
    pub service: TokenService,
    pub store: MemoryRegistryStore,
    pub audit: MemoryAuditLogger,
    pub keys: Arc<KeyMaterial>,
}

impl Harness {
    pub fn new() -> Self {
        let store = seeded_store();
        let shared = Arc::new(store.clone());
        Self::with_directory(store, shared)
    }

    /// Uses `directory` for entity resolution instead of the seeded store.
    pub fn with_directory(store: MemoryRegistryStore, directory: Arc<dyn EntityDirectory>) -> Self {
        let keys = key_material();
        let credentials = MemoryCredentialStore::new();
        for user in [
            FixtureIds::COLLABORATOR,
            FixtureIds::REQUESTER,
            FixtureIds::DEPLOYMENT_OWNER,
            FixtureIds::STRANGER,
        ] {
            credentials.add_user(
                CallerIdentity::builder().id(user).internal_id(format!("u-{user}")).build(),
                SECRET,
            );
        }

        let audit = MemoryAuditLogger::new();
        let service = TokenService::builder()
            .credentials(Arc::new(AdminTokenResolver::new(keys.clone(), credentials)))
            .directory(directory)
            .decider(AuthorizationDecider::standard(Arc::new(store.clone())))
            .issuer(TokenIssuer::new(keys.clone(), TokenSettings::default()))
            .audit(Arc::new(audit.clone()))
            .build();

        Self { service, store, audit, keys }
    }

    pub async fn access_claims(&self, token: &str) -> AccessClaims {
        verify_access_token(token, &self.keys, &TokenSettings::default())
            .await
            .expect("issued token should verify")
    }
}
