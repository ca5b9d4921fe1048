//! Current-generation model record.

use serde::{Deserialize, Serialize};

use crate::types::{Entity, ModelId};

/// A standing grant on a model.
///
/// Collaborators may push, pull and delete images in every repository that
/// belongs to the model, whatever roles they hold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
pub struct Collaborator {
    /// The entity granted collaborator rights.
    #[builder(into)]
    pub entity: Entity,

    /// Roles held on the model (e.g. `owner`, `contributor`).
    #[builder(default)]
    #[serde(default)]
    pub roles: Vec<String>,
}

/// A model as read by the authorization decider.
///
/// Only the fields the decider needs are carried; the full model document
/// (card, releases, files) lives behind the model service.
///
/// # Example
///
/// ```
/// use registry_auth_storage::{Collaborator, Entity, Model};
///
/// let model = Model::builder()
///     .id("model-a")
///     .name("Image classifier")
///     .collaborators(vec![Collaborator::builder().entity(Entity::user("alice")).build()])
///     .build();
///
/// assert!(model.has_collaborator(&[Entity::user("alice")]));
/// assert!(!model.has_collaborator(&[Entity::user("bob")]));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
pub struct Model {
    /// Model identifier (first segment of the repository name).
    #[builder(into)]
    pub id: ModelId,

    /// Display name.
    #[builder(into, default)]
    #[serde(default)]
    pub name: String,

    /// Entities with standing push/pull/delete rights.
    #[builder(default)]
    #[serde(default)]
    pub collaborators: Vec<Collaborator>,
}

impl Model {
    /// Returns `true` if any of the caller's entities is a collaborator.
    #[must_use]
    pub fn has_collaborator(&self, entities: &[Entity]) -> bool {
        self.collaborators.iter().any(|collaborator| entities.contains(&collaborator.entity))
    }
}
