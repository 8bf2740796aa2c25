// ABOUTME: HTTP API for the kiosk control plane.
// ABOUTME: Thin axum handlers translating transport requests to lifecycle calls.

mod sites;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use tower_http::trace::TraceLayer;

use crate::lifecycle::SiteManager;

pub use sites::{CreateSiteRequest, DeleteSiteResponse, SiteResponse, UpdateSiteRequest};

/// Shared application state for the control plane.
#[derive(Clone)]
pub struct AppState {
    /// Lifecycle orchestrator handling every site operation.
    pub sites: Arc<SiteManager>,
}

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/sites", post(sites::create_site))
        .route("/sites", get(sites::list_sites))
        .route("/sites/{name}", get(sites::get_site))
        .route("/sites/{name}", put(sites::update_site))
        .route("/sites/{name}", delete(sites::delete_site))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> axum::Json<HealthResponse> {
    axum::Json(HealthResponse { status: "healthy" })
}

/// Health response.
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
}
