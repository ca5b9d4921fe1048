//! Lookup traits consumed by the registry authorization decider.
//!
//! These traits are the narrow, read-only view the token service has onto
//! the governance platform's data. Production implementations sit in front
//! of the model, access-request and deployment services; tests and local
//! development use [`MemoryRegistryStore`](crate::MemoryRegistryStore).
//!
//! # Contract
//!
//! - Absent records are reported as `Ok(None)` (or an empty list), never as an error. A backend
//!   that cannot tell "malformed id" from "missing" may return [`StorageError::InvalidId`] or
//!   [`StorageError::NotFound`]; callers treat both as absent.
//! - Lookups have no side effects and are safe to retry, but nothing in this workspace retries
//!   them.
//! - Every lookup receives the caller's user id so backends can apply their own visibility rules.
//!
//! [`StorageError::InvalidId`]: crate::StorageError::InvalidId
//! [`StorageError::NotFound`]: crate::StorageError::NotFound

use async_trait::async_trait;

use crate::{
    access_request::ModelAccessRequest,
    deployment::LegacyDeployment,
    error::StorageResult,
    model::Model,
    types::{DeploymentId, Entity, ModelId},
};

/// Resolves current-generation models.
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Looks up a model by id on behalf of `caller`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(model))` if the model exists
    /// - `Ok(None)` if it does not
    /// - `Err(...)` on backend failures
    async fn get_model(&self, caller: &str, id: &ModelId) -> StorageResult<Option<Model>>;
}

/// Lists access requests raised against a model.
#[async_trait]
pub trait AccessRequestStore: Send + Sync {
    /// Returns the active (non-deleted) access requests for `model_id`.
    ///
    /// An unknown model yields an empty list.
    async fn list_model_access_requests(
        &self,
        caller: &str,
        model_id: &ModelId,
    ) -> StorageResult<Vec<ModelAccessRequest>>;
}

/// Resolves legacy deployments.
#[async_trait]
pub trait DeploymentStore: Send + Sync {
    /// Looks up a legacy deployment by its UUID on behalf of `caller`.
    async fn get_deployment(
        &self,
        caller: &str,
        id: &DeploymentId,
    ) -> StorageResult<Option<LegacyDeployment>>;
}

/// Expands a user into every entity alias it holds.
#[async_trait]
pub trait EntityDirectory: Send + Sync {
    /// Returns the entity set for `user_id`.
    ///
    /// The result always contains the user's own `user:<id>` entity followed
    /// by any group memberships.
    async fn entities_for(&self, user_id: &str) -> StorageResult<Vec<Entity>>;
}
