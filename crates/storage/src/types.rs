//! Identifier types shared by the record and store modules.

use serde::{Deserialize, Serialize};

/// Macro to define a newtype wrapper around `String` with standard trait
/// implementations.
///
/// Each generated type:
/// - Derives `Clone`, `Debug`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Serializes transparently as the inner string
/// - Implements `From<&str>` and `From<String>`
/// - Implements `Display` and `AsRef<str>`
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
            Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of a current-generation model.
    ///
    /// The first path segment of a registry repository name is looked up as
    /// a `ModelId` (`modelA/img` resolves to model `modelA`).
    ModelId
);

define_id!(
    /// Identifier of a legacy deployment (its UUID).
    DeploymentId
);

define_id!(
    /// Identifier of a stored model access request.
    AccessRequestId
);

define_id!(
    /// An identity alias such as `user:alice` or `group:ml-team`.
    ///
    /// A caller usually holds several entities: its own user entity plus
    /// every group it belongs to. Entity sets are compared by exact string
    /// equality.
    Entity
);

/// Entity kind prefix for individual users.
pub const USER_ENTITY_KIND: &str = "user";

/// Entity kind prefix for groups.
pub const GROUP_ENTITY_KIND: &str = "group";

impl Entity {
    /// Creates the entity alias for a user id (`user:<id>`).
    #[must_use]
    pub fn user(id: &str) -> Self {
        Self(format!("{USER_ENTITY_KIND}:{id}"))
    }

    /// Creates the entity alias for a group name (`group:<name>`).
    #[must_use]
    pub fn group(name: &str) -> Self {
        Self(format!("{GROUP_ENTITY_KIND}:{name}"))
    }

    /// Splits the entity into `(kind, value)`.
    ///
    /// Returns `None` if the entity has no `kind:` prefix.
    #[must_use]
    pub fn parts(&self) -> Option<(&str, &str)> {
        self.0.split_once(':')
    }
}

/// Returns `true` if any entity in `held` also appears in `listed`.
#[must_use]
pub fn intersects(held: &[Entity], listed: &[Entity]) -> bool {
    listed.iter().any(|entity| held.contains(entity))
}
