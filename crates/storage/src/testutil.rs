//! Shared test utilities for code that reads collaborator data.
//!
//! Feature-gated behind `testutil` so the helpers never reach production
//! builds.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! registry-auth-storage = { path = "../storage", features = ["testutil"] }
//! ```
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use registry_auth_storage::testutil::{FixtureIds, seeded_store};
//! ```

use crate::{
    access_request::ModelAccessRequest,
    deployment::LegacyDeployment,
    error::StorageResult,
    memory::MemoryRegistryStore,
    model::{Collaborator, Model},
    types::Entity,
};

/// Identifiers used by [`seeded_store`].
///
/// | Caller | Holds | Relationship |
/// |--------|-------|--------------|
/// | `alice` | `user:alice` | collaborator (owner) on `model-a` |
/// | `bob` | `user:bob`, `group:analysts` | covered by an access request on `model-a` |
/// | `carol` | `user:carol` | owner of legacy deployment `dep-legacy` |
/// | `mallory` | `user:mallory` | nothing |
#[derive(Debug, Clone, Copy)]
pub struct FixtureIds;

impl FixtureIds {
    /// Current-generation model id.
    pub const MODEL: &'static str = "model-a";
    /// Model with neither collaborators nor access requests.
    pub const EMPTY_MODEL: &'static str = "model-empty";
    /// Legacy deployment id.
    pub const DEPLOYMENT: &'static str = "dep-legacy";
    /// Collaborator on [`Self::MODEL`].
    pub const COLLABORATOR: &'static str = "alice";
    /// Caller covered by an access request on [`Self::MODEL`] through a group.
    pub const REQUESTER: &'static str = "bob";
    /// Owner of [`Self::DEPLOYMENT`].
    pub const DEPLOYMENT_OWNER: &'static str = "carol";
    /// Caller with no relationship to anything.
    pub const STRANGER: &'static str = "mallory";
    /// Group granted by the access request.
    pub const REQUESTER_GROUP: &'static str = "analysts";
}

/// Creates a [`MemoryRegistryStore`] populated per [`FixtureIds`].
#[must_use]
pub fn seeded_store() -> MemoryRegistryStore {
    let store = MemoryRegistryStore::new();

    store.insert_model(
        Model::builder()
            .id(FixtureIds::MODEL)
            .name("Image classifier")
            .collaborators(vec![
                Collaborator::builder()
                    .entity(Entity::user(FixtureIds::COLLABORATOR))
                    .roles(vec!["owner".to_owned()])
                    .build(),
            ])
            .build(),
    );
    store.insert_model(Model::builder().id(FixtureIds::EMPTY_MODEL).build());

    store.insert_access_request(
        ModelAccessRequest::builder()
            .id("ar-analysts")
            .model_id(FixtureIds::MODEL)
            .entities(vec![Entity::group(FixtureIds::REQUESTER_GROUP)])
            .created_by(FixtureIds::REQUESTER)
            .build(),
    );
    store.add_membership(FixtureIds::REQUESTER, Entity::group(FixtureIds::REQUESTER_GROUP));

    store.insert_deployment(
        LegacyDeployment::builder()
            .id(FixtureIds::DEPLOYMENT)
            .owners(vec![Entity::user(FixtureIds::DEPLOYMENT_OWNER)])
            .build(),
    );

    store
}

/// Assert that a [`StorageResult`](crate::StorageResult) is an "absent"
/// error (`NotFound` or `InvalidId`).
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use registry_auth_storage::{StorageError, StorageResult, assert_absent};
///
/// let result: StorageResult<()> = Err(StorageError::invalid_id(""));
/// assert_absent!(result);
/// ```
#[macro_export]
macro_rules! assert_absent {
    ($result:expr) => {
        assert!(
            matches!(&$result, Err(e) if e.is_absent()),
            "expected an absent-record error, got: {:?}",
            $result,
        );
    };
}

/// Returns `true` if the result is an error that is not an absent record.
pub fn is_infrastructure_failure<T>(result: &StorageResult<T>) -> bool {
    matches!(result, Err(e) if !e.is_absent())
}
