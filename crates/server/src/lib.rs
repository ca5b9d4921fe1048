//! HTTP front end for the registry token service.
//!
//! The binary (`registry-auth`) loads a [`ServerConfig`], checks the key
//! material, fills the in-memory stores from an optional seed file, and
//! serves the routes in [`routes`].

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod routes;
pub mod seed;

use std::sync::Arc;

use registry_auth_authn::{
    AuthorizationDecider, KeyMaterial, MemoryCredentialStore, TokenIssuer, TokenService,
    credential::AdminTokenResolver,
};
use registry_auth_storage::{MemoryRegistryStore, TracingAuditLogger};
use tokio::net::TcpListener;

pub use crate::{
    config::ServerConfig,
    error::{ApiError, ServerError},
    routes::{AppState, router},
    seed::Seed,
};

/// Wires the token service for `config`.
///
/// Key files are read and both derived identifiers computed here, so a bad
/// key fails startup instead of the first request.
///
/// # Errors
///
/// Returns [`ServerError::Auth`] for unusable key material and
/// [`ServerError::Seed`] for an unreadable seed file.
pub async fn build_state(config: &ServerConfig) -> Result<AppState, ServerError> {
    let keys = Arc::new(KeyMaterial::from_config(&config.auth));
    keys.preload().await?;

    let store = MemoryRegistryStore::new();
    let credentials = MemoryCredentialStore::new();
    if let Some(path) = &config.seed {
        Seed::from_path(path).await?.apply(&store, &credentials);
    }

    let store = Arc::new(store);
    let service = TokenService::builder()
        .credentials(Arc::new(AdminTokenResolver::new(keys.clone(), credentials)))
        .directory(store.clone())
        .decider(AuthorizationDecider::standard(store))
        .issuer(TokenIssuer::new(keys, config.auth.token_settings()))
        .audit(Arc::new(TracingAuditLogger))
        .build();

    Ok(AppState { service: Arc::new(service) })
}

/// Serves `state` on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns [`ServerError::Io`] if serving fails.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "Registry token service listening");
    axum::serve(listener, router(state)).with_graceful_shutdown(shutdown).await?;
    Ok(())
}
