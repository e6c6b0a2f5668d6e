use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use lps_protocol::{endpoints, MAX_BODY_SIZE};

use crate::handler;
use crate::state::AppState;

/// Build the axum router with all LPS endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::HEALTH, get(handler::health_handler))
        .route(endpoints::PAYLOADS, post(handler::create_payload))
        .route(
            endpoints::PAYLOAD,
            get(handler::get_payload).delete(handler::delete_payload),
        )
        .route(
            endpoints::PAYLOAD_BODY,
            get(handler::get_body).put(handler::put_body),
        )
        .route(
            endpoints::METADATA,
            get(handler::list_metadata).post(handler::add_metadata),
        )
        .route(endpoints::METADATA_ITEM, get(handler::get_metadata))
        .route(
            endpoints::DATA_REFERENCES,
            get(handler::list_data_references).post(handler::add_data_references),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
