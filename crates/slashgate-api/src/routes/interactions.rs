//! Interactions webhook.
//!
//! The platform POSTs every interaction here. The raw body is kept as bytes
//! because the signature covers it exactly as sent.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use slashgate_common::error::DispatchResult;
use slashgate_common::models::InteractionResponse;
use std::sync::Arc;
use tracing::instrument;

use crate::AppState;
use crate::verify::{SIGNATURE_HEADER, TIMESTAMP_HEADER};

pub fn router(path: &str) -> Router<Arc<AppState>> {
    Router::new().route(path, post(handle_interaction))
}

#[instrument(skip_all, fields(len = body.len()))]
async fn handle_interaction(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> DispatchResult<Json<InteractionResponse>> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let response = state
        .application
        .handle_webhook(header(SIGNATURE_HEADER), header(TIMESTAMP_HEADER), &body)
        .await?;
    Ok(Json(response))
}
