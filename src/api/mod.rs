pub mod auth;
pub mod dto;
pub mod errors;
pub mod extract;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::timeframe::TimeFrameParser;
use auth::ApiKeys;
use handlers::ApiDoc;

/// Shared by every handler; cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub time_frames: TimeFrameParser,
    pub api_keys: ApiKeys,
}

impl AppState {
    pub fn new(pool: PgPool, time_frames: TimeFrameParser, api_keys: ApiKeys) -> Self {
        Self { pool, time_frames, api_keys }
    }
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::<AppState>::with_openapi(ApiDoc::openapi())
        .route("/api/location", get(handlers::list_locations))
        .route("/api/location/search", get(handlers::search_locations))
        .route("/api/location/new", post(handlers::create_locations))
        .route(
            "/api/location/{id}",
            get(handlers::get_location)
                .patch(handlers::update_location)
                .delete(handlers::delete_location),
        )
        .route("/api/co2data/new", post(handlers::create_readings))
        .route(
            "/api/co2data/{id}/search",
            get(handlers::get_readings_by_time_frame),
        )
        .route(
            "/api/co2data/{id}/latest",
            get(handlers::get_latest_reading),
        )
        .split_for_parts();

    let require_api_key =
        middleware::from_fn_with_state(state.api_keys.clone(), auth::require_api_key);

    router
        .route_layer(require_api_key)
        .with_state(state)
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
        .fallback(handlers::route_not_found)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}
