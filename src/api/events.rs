use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;

use crate::api::sse;
use crate::error::Result;
use crate::server::state::AppState;
use crate::session::StreamSession;
use crate::types::{LaunchEvent, PublishRequest};

/// GET /events/stream - Live launch events as server-sent events.
pub async fn stream_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = StreamSession::open(state.broker.clone(), state.shutdown.child_token());
    sse::sse_response(session)
}

/// GET /events/latest - Most recent launch event, or 204 before the first one.
pub async fn latest_handler(State(state): State<AppState>) -> Response {
    match state.broker.latest() {
        Some(event) => Json(event).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// POST /events/publish - Publish a launch event.
///
/// A missing or unset `launchTime` is stamped with the current time.
pub async fn publish_handler(
    State(state): State<AppState>,
    Json(request): Json<PublishRequest>,
) -> Result<(StatusCode, Json<LaunchEvent>)> {
    let event = request.into_event(Utc::now());
    state.publisher.publish(&event).await?;
    Ok((StatusCode::ACCEPTED, Json(event)))
}
