//! Development seed data.
//!
//! Without a governance backend the server runs on
//! [`MemoryRegistryStore`]; a JSON seed file fills it at startup:
//!
//! ```json
//! {
//!   "models": [{"id": "model-a", "collaborators": [{"entity": "user:alice"}]}],
//!   "access_requests": [{"id": "ar-1", "model_id": "model-a", "entities": ["group:analysts"]}],
//!   "deployments": [{"id": "dep-legacy", "owners": ["user:carol"]}],
//!   "memberships": {"bob": ["group:analysts"]},
//!   "users": [{"id": "alice", "internal_id": "u-1", "secret": "s3cret"}]
//! }
//! ```

use std::{collections::BTreeMap, path::Path};

use registry_auth_authn::{CallerIdentity, MemoryCredentialStore};
use registry_auth_storage::{
    Entity, LegacyDeployment, MemoryRegistryStore, Model, ModelAccessRequest,
};
use serde::Deserialize;

use crate::error::ServerError;

/// A login account.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedUser {
    /// External user id (`sub`).
    pub id: String,
    /// Internal account id (`user` claim).
    pub internal_id: String,
    /// Basic-auth secret.
    pub secret: String,
}

/// Contents of a seed file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Seed {
    /// Current-generation models.
    #[serde(default)]
    pub models: Vec<Model>,
    /// Model access requests.
    #[serde(default)]
    pub access_requests: Vec<ModelAccessRequest>,
    /// Legacy deployments.
    #[serde(default)]
    pub deployments: Vec<LegacyDeployment>,
    /// Group memberships by user id.
    #[serde(default)]
    pub memberships: BTreeMap<String, Vec<Entity>>,
    /// Login accounts.
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

impl Seed {
    /// Reads a seed file.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Seed`] if the file is unreadable or not a seed.
    pub async fn from_path(path: &Path) -> Result<Self, ServerError> {
        let raw = tokio::fs::read(path).await.map_err(|e| ServerError::seed(path, e.to_string()))?;
        serde_json::from_slice(&raw).map_err(|e| ServerError::seed(path, e.to_string()))
    }

    /// Loads every record into the stores.
    pub fn apply(self, store: &MemoryRegistryStore, credentials: &MemoryCredentialStore) {
        let counts = (
            self.models.len(),
            self.access_requests.len(),
            self.deployments.len(),
            self.users.len(),
        );

        for model in self.models {
            store.insert_model(model);
        }
        for request in self.access_requests {
            store.insert_access_request(request);
        }
        for deployment in self.deployments {
            store.insert_deployment(deployment);
        }
        for (user, entities) in self.memberships {
            for entity in entities {
                store.add_membership(&user, entity);
            }
        }
        for user in self.users {
            let identity =
                CallerIdentity::builder().id(user.id).internal_id(user.internal_id).build();
            credentials.add_user(identity, &user.secret);
        }

        tracing::info!(
            models = counts.0,
            access_requests = counts.1,
            deployments = counts.2,
            users = counts.3,
            "Loaded seed data"
        );
    }
}
