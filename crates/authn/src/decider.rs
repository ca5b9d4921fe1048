//! Per-scope authorization.
//!
//! Each requested [`AccessRequest`] is run through an ordered chain of
//! [`AccessResolver`]s. A resolver either decides ([`Resolution::Allowed`],
//! [`Resolution::Denied`]) or steps aside ([`Resolution::NotApplicable`]);
//! the first decision wins.
//!
//! The standard chain has two tiers:
//!
//! 1. [`CurrentModelResolver`]: the repository's first path segment names a model. Collaborators
//!    may do anything; everyone else may only `pull`, and only when an active access request
//!    covers one of their entities.
//! 2. [`LegacyDeploymentResolver`]: the first segment names a legacy deployment. Only its owners
//!    may `pull`, and nobody may push through this tier.
//!
//! A token request is atomic: [`AuthorizationDecider::authorize_all`] stops
//! at the first denial and nothing is issued.
//!
//! Absent records (including malformed ids, see
//! [`StorageError::is_absent`](registry_auth_storage::StorageError::is_absent))
//! never fail a request; they move it to the next tier. Any other lookup
//! failure aborts with [`AuthError::Lookup`].

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use fail::fail_point;
use registry_auth_storage::{
    AccessRequestStore, DeploymentId, DeploymentStore, Entity, EntityDirectory, ModelId,
    ModelStore, StorageError,
};

use crate::{
    credential::CallerIdentity,
    error::{AuthError, Result},
    scope::AccessRequest,
};

/// Authorization tier that produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Current-generation models and their collaborators.
    CurrentModel,
    /// Superseded deployment ownership.
    LegacyDeployment,
    /// No tier recognised the repository.
    None,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CurrentModel => write!(f, "current_model"),
            Self::LegacyDeployment => write!(f, "legacy_deployment"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Why an access entry was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// A non-collaborator asked for something other than exactly `pull`.
    NonCollaboratorWrite,
    /// A non-collaborator has no active access request for the model.
    NoMatchingAccessRequest,
    /// Legacy tier only serves `repository` resources.
    NonRepositoryType,
    /// No legacy deployment has that id.
    DeploymentNotFound,
    /// The caller is not an owner of the legacy deployment.
    NotDeploymentOwner,
    /// Legacy deployments only allow exactly `pull`, even for owners.
    LegacyWriteRequested,
    /// Every resolver stepped aside.
    NoTierApplies,
}

impl DenyReason {
    /// The tier that refused.
    #[must_use]
    pub fn tier(self) -> Tier {
        match self {
            Self::NonCollaboratorWrite | Self::NoMatchingAccessRequest => Tier::CurrentModel,
            Self::NonRepositoryType
            | Self::DeploymentNotFound
            | Self::NotDeploymentOwner
            | Self::LegacyWriteRequested => Tier::LegacyDeployment,
            Self::NoTierApplies => Tier::None,
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::NonCollaboratorWrite => "non-collaborators may only pull",
            Self::NoMatchingAccessRequest => "no valid access request found",
            Self::NonRepositoryType => "refusing non-repository request",
            Self::DeploymentNotFound => "no deployment found",
            Self::NotDeploymentOwner => "user not in deployment owner list",
            Self::LegacyWriteRequested => "legacy deployments only allow pull",
            Self::NoTierApplies => "no authorization tier applies",
        };
        f.write_str(message)
    }
}

/// Outcome of one resolver for one access entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The entry is allowed.
    Allowed,
    /// The entry is refused.
    Denied(DenyReason),
    /// This resolver does not recognise the repository.
    NotApplicable,
}

/// The caller as seen by the resolvers.
///
/// The entity set is resolved once per token request and shared by every
/// entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    /// The authenticated caller.
    pub identity: CallerIdentity,
    /// Every entity alias the caller holds.
    pub entities: Vec<Entity>,
}

impl CallerContext {
    /// Creates a context with a known entity set.
    #[must_use]
    pub fn new(identity: CallerIdentity, entities: Vec<Entity>) -> Self {
        Self { identity, entities }
    }

    /// Resolves the caller's entities from a directory.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Lookup`] if the directory fails.
    pub async fn resolve(
        identity: CallerIdentity,
        directory: &(impl EntityDirectory + ?Sized),
    ) -> Result<Self> {
        let entities = directory.entities_for(&identity.id).await?;
        Ok(Self { identity, entities })
    }
}

/// One authorization tier.
#[async_trait]
pub trait AccessResolver: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Decides one entry, or steps aside.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Lookup`] for infrastructure failures only.
    async fn resolve(&self, ctx: &CallerContext, access: &AccessRequest) -> Result<Resolution>;
}

fn absent_as_none<T>(result: std::result::Result<Option<T>, StorageError>) -> Result<Option<T>> {
    match result {
        Ok(found) => Ok(found),
        Err(e) if e.is_absent() => {
            tracing::debug!(error = %e, "Treating lookup error as absent record");
            Ok(None)
        },
        Err(e) => {
            tracing::error!(error = %e, "Collaborator lookup failed");
            Err(e.into())
        },
    }
}

/// Tier for current-generation models.
pub struct CurrentModelResolver {
    models: Arc<dyn ModelStore>,
    access_requests: Arc<dyn AccessRequestStore>,
}

impl CurrentModelResolver {
    /// Creates the tier over the given stores.
    pub fn new(models: Arc<dyn ModelStore>, access_requests: Arc<dyn AccessRequestStore>) -> Self {
        Self { models, access_requests }
    }
}

#[async_trait]
impl AccessResolver for CurrentModelResolver {
    fn name(&self) -> &'static str {
        "current_model"
    }

    async fn resolve(&self, ctx: &CallerContext, access: &AccessRequest) -> Result<Resolution> {
        let caller = ctx.identity.id.as_str();
        let model_id = ModelId::from(access.repository_key());

        fail_point!("decider-before-model-lookup", |_| {
            Err(AuthError::Lookup(StorageError::internal("injected failure before model lookup")))
        });
        let Some(model) = absent_as_none(self.models.get_model(caller, &model_id).await)? else {
            tracing::debug!(model_id = %model_id, "No current model, falling back");
            return Ok(Resolution::NotApplicable);
        };

        if model.has_collaborator(&ctx.entities) {
            return Ok(Resolution::Allowed);
        }

        if !access.is_pull_only() {
            return Ok(Resolution::Denied(DenyReason::NonCollaboratorWrite));
        }

        let requests =
            match self.access_requests.list_model_access_requests(caller, &model_id).await {
                Ok(requests) => requests,
                Err(e) if e.is_absent() => Vec::new(),
                Err(e) => return Err(e.into()),
            };

        if requests.iter().any(|request| request.is_active() && request.grants_any(&ctx.entities))
        {
            Ok(Resolution::Allowed)
        } else {
            Ok(Resolution::Denied(DenyReason::NoMatchingAccessRequest))
        }
    }
}

/// Tier for legacy deployments.
pub struct LegacyDeploymentResolver {
    deployments: Arc<dyn DeploymentStore>,
}

impl LegacyDeploymentResolver {
    /// Creates the tier over the given store.
    pub fn new(deployments: Arc<dyn DeploymentStore>) -> Self {
        Self { deployments }
    }
}

#[async_trait]
impl AccessResolver for LegacyDeploymentResolver {
    fn name(&self) -> &'static str {
        "legacy_deployment"
    }

    async fn resolve(&self, ctx: &CallerContext, access: &AccessRequest) -> Result<Resolution> {
        if !access.is_repository() {
            return Ok(Resolution::Denied(DenyReason::NonRepositoryType));
        }

        let deployment_id = DeploymentId::from(access.repository_key());
        let lookup = self.deployments.get_deployment(&ctx.identity.id, &deployment_id).await;
        let Some(deployment) = absent_as_none(lookup)? else {
            return Ok(Resolution::Denied(DenyReason::DeploymentNotFound));
        };

        if !deployment.is_owned_by(&ctx.entities) {
            return Ok(Resolution::Denied(DenyReason::NotDeploymentOwner));
        }

        // Owners included: this tier never grants more than pull.
        if !access.is_pull_only() {
            return Ok(Resolution::Denied(DenyReason::LegacyWriteRequested));
        }

        Ok(Resolution::Allowed)
    }
}

/// Runs access entries through the resolver chain.
#[derive(Clone)]
pub struct AuthorizationDecider {
    resolvers: Vec<Arc<dyn AccessResolver>>,
}

impl fmt::Debug for AuthorizationDecider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationDecider")
            .field("resolvers", &self.resolvers.iter().map(|r| r.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl AuthorizationDecider {
    /// Creates a decider with an explicit chain, consulted in order.
    #[must_use]
    pub fn new(resolvers: Vec<Arc<dyn AccessResolver>>) -> Self {
        Self { resolvers }
    }

    /// The standard chain: current models, then legacy deployments.
    #[must_use]
    pub fn standard<S>(store: Arc<S>) -> Self
    where
        S: ModelStore + AccessRequestStore + DeploymentStore + 'static,
    {
        Self::new(vec![
            Arc::new(CurrentModelResolver::new(store.clone(), store.clone())),
            Arc::new(LegacyDeploymentResolver::new(store)),
        ])
    }

    /// Decides one entry. Never returns [`Resolution::NotApplicable`].
    ///
    /// # Errors
    ///
    /// Propagates resolver errors.
    pub async fn decide(&self, ctx: &CallerContext, access: &AccessRequest) -> Result<Resolution> {
        for resolver in &self.resolvers {
            let resolution = resolver.resolve(ctx, access).await?;
            tracing::debug!(
                tier = resolver.name(),
                resolution = ?resolution,
                name = %access.name,
                "Tier outcome"
            );
            if resolution != Resolution::NotApplicable {
                return Ok(resolution);
            }
        }
        Ok(Resolution::Denied(DenyReason::NoTierApplies))
    }

    /// Requires every entry to be allowed.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AccessDenied`] for the first refused entry, or a
    /// lookup error.
    pub async fn authorize_all(&self, ctx: &CallerContext, accesses: &[AccessRequest]) -> Result<()> {
        for access in accesses {
            let reason = match self.decide(ctx, access).await? {
                Resolution::Allowed => continue,
                Resolution::Denied(reason) => reason,
                Resolution::NotApplicable => DenyReason::NoTierApplies,
            };

            tracing::warn!(
                caller = %ctx.identity.id,
                access.type = %access.resource_type,
                access.name = %access.name,
                access.actions = ?access.actions,
                tier = %reason.tier(),
                reason = %reason,
                "User does not have permission to carry out request"
            );
            return Err(AuthError::access_denied(access.clone(), reason, ctx.identity.id.clone()));
        }
        Ok(())
    }
}
