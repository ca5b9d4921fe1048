//! Token service error types.
//!
//! Errors fall in two classes (see [`ErrorClass`]):
//!
//! - **Forbidden**: the caller, its scope or its token was refused. Surfaced to the registry
//!   client as HTTP 403 with a machine code and diagnostic context.
//! - **Internal**: key material, signing, lookups or configuration failed. Surfaced as HTTP 500
//!   without details and logged for operators.

use std::{collections::BTreeMap, path::Path};

use registry_auth_storage::StorageError;
use serde_json::{Value, json};
use thiserror::Error;

use crate::{decider::DenyReason, scope::AccessRequest};

/// How an error is reported to the registry client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Business-rule or credential refusal (HTTP 403).
    Forbidden,
    /// Infrastructure or configuration fault (HTTP 500).
    Internal,
}

/// Token service errors.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`; downstream match expressions must
/// include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// No `Authorization` header was sent.
    #[error("No authorisation header found")]
    MissingCredential,

    /// The credential could not be parsed or did not authenticate.
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// The request names a service other than the configured one.
    #[error("Received registry auth request for unexpected service '{requested}'")]
    UnexpectedService {
        /// Service named by the request.
        requested: String,
    },

    /// The scope parameter is neither a string nor a list of strings.
    #[error("Scope is an unexpected value: {0}")]
    ScopeFormat(String),

    /// An access entry was refused. The whole token request fails.
    #[error("Access denied for {caller} on {}:{}: {reason}", access.resource_type, access.name)]
    AccessDenied {
        /// The first refused entry.
        access: AccessRequest,
        /// Why the decider refused it.
        reason: DenyReason,
        /// The caller's user id.
        caller: String,
    },

    /// Key material is unreadable or malformed.
    #[error("Failed to load key material from {path}: {message}")]
    KeyLoad {
        /// File the key was read from.
        path: String,
        /// What went wrong.
        message: String,
    },

    /// The digest fed to the key identifier encoder has the wrong length.
    #[error("Invalid key identifier input: {bits} bits is not a multiple of 40")]
    InvalidKeyLength {
        /// Bit length that was supplied.
        bits: usize,
    },

    /// The token could not be signed.
    #[error("Token signing failed: {0}")]
    TokenSigning(String),

    /// A collaborator lookup failed for a reason other than an absent record.
    #[error("Lookup failed: {0}")]
    Lookup(
        /// The underlying storage error.
        #[source]
        StorageError,
    ),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Malformed token, cannot be decoded.
    #[error("Invalid token format: {0}")]
    InvalidTokenFormat(String),

    /// Signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// Audience doesn't match expected value.
    #[error("Invalid audience: {0}")]
    InvalidAudience(String),

    /// Issuer doesn't match expected value.
    #[error("Invalid issuer: {0}")]
    InvalidIssuer(String),

    /// Algorithm not in allowed list.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

impl AuthError {
    /// Creates an `InvalidCredential` error.
    #[must_use]
    pub fn invalid_credential(message: impl Into<String>) -> Self {
        Self::InvalidCredential(message.into())
    }

    /// Creates an `UnexpectedService` error.
    #[must_use]
    pub fn unexpected_service(requested: impl Into<String>) -> Self {
        Self::UnexpectedService { requested: requested.into() }
    }

    /// Creates a `ScopeFormat` error describing the offending JSON type.
    #[must_use]
    pub fn scope_format(message: impl Into<String>) -> Self {
        Self::ScopeFormat(message.into())
    }

    /// Creates an `AccessDenied` error.
    #[must_use]
    pub fn access_denied(
        access: AccessRequest,
        reason: DenyReason,
        caller: impl Into<String>,
    ) -> Self {
        Self::AccessDenied { access, reason, caller: caller.into() }
    }

    /// Creates a `KeyLoad` error for a key file.
    #[must_use]
    pub fn key_load(path: &Path, message: impl Into<String>) -> Self {
        Self::KeyLoad { path: path.display().to_string(), message: message.into() }
    }

    /// Creates a `TokenSigning` error.
    #[must_use]
    pub fn token_signing(message: impl Into<String>) -> Self {
        Self::TokenSigning(message.into())
    }

    /// Creates an `InvalidTokenFormat` error.
    #[must_use]
    pub fn invalid_token_format(message: impl Into<String>) -> Self {
        Self::InvalidTokenFormat(message.into())
    }

    /// Creates an `UnsupportedAlgorithm` error.
    #[must_use]
    pub fn unsupported_algorithm(message: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm(message.into())
    }

    /// Creates a `Config` error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredential => "credential_missing",
            Self::InvalidCredential(_) => "credential_invalid",
            Self::UnexpectedService { .. } => "unexpected_service",
            Self::ScopeFormat(_) => "scope_format",
            Self::AccessDenied { .. } => "access_denied",
            Self::KeyLoad { .. } => "key_load",
            Self::InvalidKeyLength { .. } => "invalid_key_length",
            Self::TokenSigning(_) => "token_signing",
            Self::Lookup(_) => "lookup_failed",
            Self::Config(_) => "config_invalid",
            Self::InvalidTokenFormat(_) => "token_invalid_format",
            Self::InvalidSignature => "token_invalid_signature",
            Self::TokenExpired => "token_expired",
            Self::InvalidAudience(_) => "token_invalid_audience",
            Self::InvalidIssuer(_) => "token_invalid_issuer",
            Self::UnsupportedAlgorithm(_) => "token_unsupported_algorithm",
        }
    }

    /// Whether the error is a refusal or a fault.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::KeyLoad { .. }
            | Self::InvalidKeyLength { .. }
            | Self::TokenSigning(_)
            | Self::Lookup(_)
            | Self::Config(_) => ErrorClass::Internal,
            _ => ErrorClass::Forbidden,
        }
    }

    /// Diagnostic context safe to return to the caller.
    ///
    /// Only values the request itself carried are included. Internal errors
    /// return an empty map.
    #[must_use]
    pub fn context(&self) -> BTreeMap<&'static str, Value> {
        let mut context = BTreeMap::new();
        match self {
            Self::UnexpectedService { requested } => {
                context.insert("service", json!(requested));
            },
            Self::AccessDenied { access, reason, .. } => {
                context.insert("access", json!(access));
                context.insert("reason", json!(reason.to_string()));
            },
            _ => {},
        }
        context
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidToken => {
                AuthError::InvalidTokenFormat("Invalid JWT structure".into())
            },
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidAudience => {
                AuthError::InvalidAudience("Audience validation failed".into())
            },
            ErrorKind::InvalidIssuer => AuthError::InvalidIssuer("Issuer validation failed".into()),
            ErrorKind::InvalidAlgorithm => {
                AuthError::UnsupportedAlgorithm("Algorithm not supported".into())
            },
            _ => AuthError::InvalidTokenFormat(format!("JWT error: {err}")),
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        AuthError::Lookup(err)
    }
}

/// Result type alias for token service operations.
pub type Result<T> = std::result::Result<T, AuthError>;
