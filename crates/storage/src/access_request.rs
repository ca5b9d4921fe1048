//! Stored model access request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AccessRequestId, Entity, ModelId, intersects};

/// An approvable record granting a set of entities pull rights on a model.
///
/// Access requests are how non-collaborators obtain images: if any entity the
/// caller holds appears in [`entities`](Self::entities) of an active request
/// for the model, `pull` is allowed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
pub struct ModelAccessRequest {
    /// Request identifier.
    #[builder(into)]
    pub id: AccessRequestId,

    /// The model this request targets.
    #[builder(into)]
    pub model_id: ModelId,

    /// Entities the request covers.
    #[builder(default)]
    #[serde(default)]
    pub entities: Vec<Entity>,

    /// User who raised the request.
    #[builder(into, default)]
    #[serde(default)]
    pub created_by: String,

    /// When the request was raised.
    #[builder(default = Utc::now())]
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Soft-delete marker. Deleted requests grant nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ModelAccessRequest {
    /// Returns `true` unless the request has been deleted.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Returns `true` if the request covers any of the caller's entities.
    #[must_use]
    pub fn grants_any(&self, entities: &[Entity]) -> bool {
        intersects(entities, &self.entities)
    }
}
