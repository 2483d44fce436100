//! tq-mr library interface
//!
//! Exposes the application state and router for integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use config::ServiceConfig;
use services::{
    DownloadJobClient, MetadataFallbackClient, ReleaseCatalogClient, SessionManager, TrackRegistry,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tq_common::events::EventBus;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Session lifecycle owner (registry, poller, resolver)
    pub session_manager: Arc<SessionManager>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last fatal pipeline error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    /// Wire up clients, registry and session manager from configuration
    pub fn new(config: &ServiceConfig) -> tq_common::Result<Self> {
        let event_bus = EventBus::new(256);
        let registry = TrackRegistry::new();
        let last_error = Arc::new(RwLock::new(None));

        let job_client = Arc::new(
            DownloadJobClient::new(config.job_server_url.clone())
                .map_err(|e| tq_common::Error::Config(e.to_string()))?,
        );

        let catalog = Arc::new(
            ReleaseCatalogClient::with_base_url(config.catalog_url.clone())
                .map_err(|e| tq_common::Error::Config(e.to_string()))?,
        );

        let fallback = config.fallback.as_ref().map(|f| {
            Arc::new(MetadataFallbackClient::new(
                f.api_key.clone(),
                f.base_url.clone(),
                f.model.clone(),
            )) as Arc<dyn services::FallbackLookup>
        });

        let session_manager = Arc::new(SessionManager::new(
            registry,
            event_bus.clone(),
            job_client,
            catalog,
            fallback,
            Arc::clone(&last_error),
        ));

        Ok(Self {
            session_manager,
            event_bus,
            startup_time: Utc::now(),
            last_error,
        })
    }
}

/// Build application router
///
/// The browser UI is an external origin, so the API is served with a
/// permissive CORS policy.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::health_routes())
        .merge(api::session_routes())
        .route("/events", get(api::event_stream))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
