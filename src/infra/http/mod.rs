//! HTTP surface: the campaign API, uploaded picture delivery, and health.

pub mod error;
pub mod handlers;
mod middleware;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::get,
};

use crate::application::campaigns::CampaignService;
use crate::infra::db::PostgresRepositories;
use crate::infra::uploads::PictureStorage;

pub use middleware::{RequestContext, log_responses, set_request_context};

#[derive(Clone)]
pub struct ApiState {
    pub campaigns: Arc<CampaignService>,
    pub db: Arc<PostgresRepositories>,
    pub pictures: Arc<PictureStorage>,
}

pub fn build_router(state: ApiState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route(
            "/api/campaigns",
            get(handlers::list_campaigns).post(handlers::create_campaign),
        )
        .route("/api/campaigns/mobile", get(handlers::list_for_mobile))
        .route("/uploads/{*path}", get(handlers::serve_picture))
        .route("/healthz", get(handlers::health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
        .with_state(state)
}
