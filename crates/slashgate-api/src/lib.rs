//! # slashgate-api
//!
//! HTTP surface of slashgate: the interactions webhook, request signature
//! verification, the dispatch engine behind it, and the outbound REST client
//! used for command registration.

pub mod dispatch;
pub mod rest;
pub mod routes;
pub mod verify;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use slashgate_common::config::ServerConfig;

pub use dispatch::{Application, ApplicationBuilder, BuildError};
pub use rest::{RestClient, RestError};
pub use verify::Verifier;

/// Shared state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub application: Arc<Application>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(application: Arc<Application>) -> Self {
        Self {
            application,
            started_at: Instant::now(),
        }
    }
}

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .merge(routes::interactions::router(&server.interactions_path))
        .merge(routes::health::router())
        .layer(tower_http::timeout::TimeoutLayer::new(Duration::from_secs(
            server.request_timeout_secs,
        )))
        .layer(tower_http::limit::RequestBodyLimitLayer::new(
            server.max_body_bytes,
        ))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
