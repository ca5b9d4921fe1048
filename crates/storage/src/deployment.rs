//! Legacy deployment record.
//!
//! Deployments belong to the superseded ownership model. They are kept
//! readable so images pushed under that model can still be pulled by the
//! deployment's owners without migrating data.

use serde::{Deserialize, Serialize};

use crate::types::{DeploymentId, Entity, intersects};

/// A legacy deployment and the entities listed as its owners.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
pub struct LegacyDeployment {
    /// Deployment UUID (first segment of the repository name).
    #[builder(into)]
    pub id: DeploymentId,

    /// Owner contacts declared on the deployment.
    #[builder(default)]
    #[serde(default)]
    pub owners: Vec<Entity>,
}

impl LegacyDeployment {
    /// Returns `true` if any of the caller's entities is a listed owner.
    #[must_use]
    pub fn is_owned_by(&self, entities: &[Entity]) -> bool {
        intersects(entities, &self.owners)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_is_owned_by() {
        let deployment = LegacyDeployment::builder()
            .id("dep-1")
            .owners(vec![Entity::user("alice"), Entity::group("ops")])
            .build();

        assert!(deployment.is_owned_by(&[Entity::user("alice")]));
        assert!(deployment.is_owned_by(&[Entity::user("zed"), Entity::group("ops")]));
        assert!(!deployment.is_owned_by(&[Entity::user("zed")]));
    }

    #[test]
    fn test_no_owners_owned_by_nobody() {
        let deployment = LegacyDeployment::builder().id("dep-2").build();
        assert!(!deployment.is_owned_by(&[Entity::user("alice")]));
    }
}
