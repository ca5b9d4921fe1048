//! Audit logging for registry token decisions.
//!
//! Every token the service issues and every request it refuses produces an
//! [`AuditEvent`] recording who asked, for what, and the outcome. Denials
//! carry the failing access entry and the reason so operators can answer
//! "why was this pull refused" without replaying the request.
//!
//! # Backends
//!
//! - [`TracingAuditLogger`]: emits structured `tracing` events at INFO, suitable for log
//!   aggregation.
//! - [`MemoryAuditLogger`]: keeps events in memory for tests and local development.
//! - [`NoopAuditLogger`]: discards everything.
//!
//! # Usage
//!
//! ```no_run
//! use registry_auth_storage::audit::{
//!     AuditAction, AuditEvent, AuditLogger, AuditResult, TracingAuditLogger,
//! };
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let logger = TracingAuditLogger;
//! let event = AuditEvent::builder()
//!     .actor("alice")
//!     .action(AuditAction::IssueAccessToken)
//!     .resource("repository:model-a/img")
//!     .result(AuditResult::Success)
//!     .build();
//! logger.log(&event).await;
//! # });
//! ```

use std::{collections::BTreeMap, fmt, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Action performed by the token service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    /// An access token was issued (possibly with an empty grant).
    IssueAccessToken,
    /// An offline refresh token was issued.
    IssueRefreshToken,
    /// A requested access entry was refused.
    DenyAccess,
    /// The inbound credential or service was rejected.
    RejectCredential,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IssueAccessToken => write!(f, "issue_access_token"),
            Self::IssueRefreshToken => write!(f, "issue_refresh_token"),
            Self::DenyAccess => write!(f, "deny_access"),
            Self::RejectCredential => write!(f, "reject_credential"),
        }
    }
}

/// Outcome of an audited operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditResult {
    /// Operation completed successfully.
    Success,
    /// Operation failed with the given reason.
    Failure(String),
}

impl fmt::Display for AuditResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure(reason) => write!(f, "failure: {reason}"),
        }
    }
}

/// Structured audit event.
#[derive(Debug, Clone, bon::Builder)]
pub struct AuditEvent {
    /// When the event occurred (defaults to now).
    #[builder(default = Utc::now())]
    pub timestamp: DateTime<Utc>,
    /// Caller identity (`sub`), or `anonymous` before authentication.
    #[builder(into)]
    pub actor: String,
    /// The action that was performed.
    pub action: AuditAction,
    /// Resource identifier, e.g. `repository:model-a/img` or a comma-joined scope list.
    #[builder(into)]
    pub resource: String,
    /// Outcome of the operation.
    pub result: AuditResult,
    /// Additional context (deny tier, client id, ...).
    #[builder(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Trait for audit log backends.
#[async_trait]
pub trait AuditLogger: Send + Sync {
    /// Records an audit event.
    async fn log(&self, event: &AuditEvent);
}

#[async_trait]
impl<L: AuditLogger + ?Sized> AuditLogger for Arc<L> {
    async fn log(&self, event: &AuditEvent) {
        (**self).log(event).await;
    }
}

/// Audit logger that emits structured `tracing` events.
///
/// Field mapping:
/// - `audit.timestamp`: RFC 3339 timestamp
/// - `audit.actor`: caller identity
/// - `audit.action`: e.g. `deny_access`
/// - `audit.resource`: what was requested
/// - `audit.result`: `success` or `failure: ...`
/// - `audit.metadata`: `k=v` pairs, sorted by key
#[derive(Debug, Clone, Copy)]
pub struct TracingAuditLogger;

#[async_trait]
impl AuditLogger for TracingAuditLogger {
    async fn log(&self, event: &AuditEvent) {
        let metadata_str =
            event.metadata.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(", ");

        tracing::info!(
            audit.timestamp = %event.timestamp.to_rfc3339(),
            audit.actor = %event.actor,
            audit.action = %event.action,
            audit.resource = %event.resource,
            audit.result = %event.result,
            audit.metadata = %metadata_str,
            "audit_event"
        );
    }
}

/// No-op audit logger.
#[derive(Debug, Clone, Copy)]
pub struct NoopAuditLogger;

#[async_trait]
impl AuditLogger for NoopAuditLogger {
    async fn log(&self, _event: &AuditEvent) {}
}

/// Audit logger that keeps every event in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditLogger {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl MemoryAuditLogger {
    /// Creates an empty logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    /// Returns the recorded events for one action.
    #[must_use]
    pub fn events_for(&self, action: AuditAction) -> Vec<AuditEvent> {
        self.events.lock().iter().filter(|event| event.action == action).cloned().collect()
    }
}

#[async_trait]
impl AuditLogger for MemoryAuditLogger {
    async fn log(&self, event: &AuditEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Constructs a resource identifier for one repository access entry.
pub fn repository_resource(resource_type: &str, name: &str) -> String {
    format!("{resource_type}:{name}")
}
