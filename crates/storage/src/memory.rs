//! In-memory implementation of every lookup trait.
//!
//! [`MemoryRegistryStore`] backs the unit and integration tests and the
//! development seed mode of the server. It does not persist anything.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::{
    access_request::ModelAccessRequest,
    deployment::LegacyDeployment,
    error::{StorageError, StorageResult},
    model::Model,
    store::{AccessRequestStore, DeploymentStore, EntityDirectory, ModelStore},
    types::{AccessRequestId, DeploymentId, Entity, ModelId},
};

#[derive(Debug, Default)]
struct Inner {
    models: HashMap<ModelId, Model>,
    access_requests: HashMap<ModelId, Vec<ModelAccessRequest>>,
    deployments: HashMap<DeploymentId, LegacyDeployment>,
    memberships: HashMap<String, Vec<Entity>>,
}

/// Thread-safe in-memory store for models, access requests, legacy
/// deployments and group memberships.
///
/// Cloning is cheap and clones share state.
///
/// # Identifier validation
///
/// Empty identifiers and identifiers containing whitespace are rejected
/// with [`StorageError::InvalidId`], mirroring backends that cannot parse
/// such ids. Callers treat that the same as "not found".
///
/// # Examples
///
/// ```
/// use registry_auth_storage::{MemoryRegistryStore, Model, ModelId, ModelStore};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let store = MemoryRegistryStore::new();
/// store.insert_model(Model::builder().id("model-a").build());
///
/// let found = store.get_model("alice", &ModelId::from("model-a")).await.unwrap();
/// assert!(found.is_some());
/// # });
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryRegistryStore {
    inner: Arc<RwLock<Inner>>,
    lookups: Arc<AtomicU64>,
}

impl MemoryRegistryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a model.
    pub fn insert_model(&self, model: Model) {
        self.inner.write().models.insert(model.id.clone(), model);
    }

    /// Adds an access request to its model's list.
    pub fn insert_access_request(&self, request: ModelAccessRequest) {
        self.inner
            .write()
            .access_requests
            .entry(request.model_id.clone())
            .or_default()
            .push(request);
    }

    /// Soft-deletes an access request.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if no request has that id.
    pub fn delete_access_request(&self, id: &AccessRequestId) -> StorageResult<()> {
        let mut inner = self.inner.write();
        let request = inner
            .access_requests
            .values_mut()
            .flat_map(|requests| requests.iter_mut())
            .find(|request| &request.id == id)
            .ok_or_else(|| StorageError::not_found(id.as_str()))?;

        if request.deleted_at.is_none() {
            request.deleted_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Inserts or replaces a legacy deployment.
    pub fn insert_deployment(&self, deployment: LegacyDeployment) {
        self.inner.write().deployments.insert(deployment.id.clone(), deployment);
    }

    /// Records that `user_id` holds `entity` (typically a group).
    pub fn add_membership(&self, user_id: &str, entity: Entity) {
        let mut inner = self.inner.write();
        let entities = inner.memberships.entry(user_id.to_owned()).or_default();
        if !entities.contains(&entity) {
            entities.push(entity);
        }
    }

    /// Number of lookups served since creation.
    #[must_use]
    pub fn lookup_count(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    fn record_lookup(&self) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }

    fn check_id(id: &str) -> StorageResult<()> {
        if id.is_empty() || id.chars().any(char::is_whitespace) {
            return Err(StorageError::invalid_id(id));
        }
        Ok(())
    }
}

#[async_trait]
impl ModelStore for MemoryRegistryStore {
    #[tracing::instrument(skip(self, id), fields(model_id = %id))]
    async fn get_model(&self, caller: &str, id: &ModelId) -> StorageResult<Option<Model>> {
        self.record_lookup();
        Self::check_id(id.as_str())?;
        Ok(self.inner.read().models.get(id).cloned())
    }
}

#[async_trait]
impl AccessRequestStore for MemoryRegistryStore {
    #[tracing::instrument(skip(self, model_id), fields(model_id = %model_id))]
    async fn list_model_access_requests(
        &self,
        caller: &str,
        model_id: &ModelId,
    ) -> StorageResult<Vec<ModelAccessRequest>> {
        self.record_lookup();
        Self::check_id(model_id.as_str())?;
        let inner = self.inner.read();
        let requests = inner
            .access_requests
            .get(model_id)
            .map(|requests| requests.iter().filter(|r| r.is_active()).cloned().collect())
            .unwrap_or_default();
        Ok(requests)
    }
}

#[async_trait]
impl DeploymentStore for MemoryRegistryStore {
    #[tracing::instrument(skip(self, id), fields(deployment_id = %id))]
    async fn get_deployment(
        &self,
        caller: &str,
        id: &DeploymentId,
    ) -> StorageResult<Option<LegacyDeployment>> {
        self.record_lookup();
        Self::check_id(id.as_str())?;
        Ok(self.inner.read().deployments.get(id).cloned())
    }
}

#[async_trait]
impl EntityDirectory for MemoryRegistryStore {
    #[tracing::instrument(skip(self))]
    async fn entities_for(&self, user_id: &str) -> StorageResult<Vec<Entity>> {
        self.record_lookup();
        let mut entities = vec![Entity::user(user_id)];
        if let Some(groups) = self.inner.read().memberships.get(user_id) {
            entities.extend(groups.iter().cloned());
        }
        Ok(entities)
    }
}
