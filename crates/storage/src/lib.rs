//! Collaborator data for the registry token service.
//!
//! The token service never owns models, access requests or deployments. It
//! reads them through the narrow traits in [`store`] to decide whether a
//! caller may pull or push an image. This crate defines those records, the
//! traits, an in-memory implementation, and the audit log the service writes
//! its decisions to.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │              registry-auth-authn (decider)               │
//! ├──────────────────────────────────────────────────────────┤
//! │ ModelStore │ AccessRequestStore │ DeploymentStore │      │
//! │            │                    │ EntityDirectory │ Audit│
//! ├────────────┴────────────────────┴─────────────────┴──────┤
//! │ MemoryRegistryStore (tests, dev) │ service-backed stores │
//! └──────────────────────────────────┴───────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use registry_auth_storage::{Entity, EntityDirectory, MemoryRegistryStore};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let store = MemoryRegistryStore::new();
//! store.add_membership("alice", Entity::group("ml"));
//!
//! let entities = store.entities_for("alice").await.unwrap();
//! assert_eq!(entities, vec![Entity::user("alice"), Entity::group("ml")]);
//! # });
//! ```
//!
//! # Error Handling
//!
//! Lookups return [`StorageResult<T>`]. Absent records are `Ok(None)`;
//! [`StorageError::is_absent`] identifies errors that mean the same thing.
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module (seeded store fixture, assertion macros).

#![deny(unsafe_code)]

pub mod access_request;
pub mod audit;
pub mod deployment;
pub mod error;
pub mod memory;
pub mod model;
pub mod store;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
pub mod types;

pub use access_request::ModelAccessRequest;
pub use audit::{
    AuditAction, AuditEvent, AuditLogger, AuditResult, MemoryAuditLogger, NoopAuditLogger,
    TracingAuditLogger,
};
pub use deployment::LegacyDeployment;
pub use error::{BoxError, StorageError, StorageResult};
pub use memory::MemoryRegistryStore;
pub use model::{Collaborator, Model};
pub use store::{AccessRequestStore, DeploymentStore, EntityDirectory, ModelStore};
pub use types::{AccessRequestId, DeploymentId, Entity, ModelId};
