pub mod events;
pub mod sse;

use axum::routing::{get, post};
use axum::Router;

use crate::server::state::AppState;

/// Build the `/events` routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stream", get(events::stream_handler))
        .route("/latest", get(events::latest_handler))
        .route("/publish", post(events::publish_handler))
}
