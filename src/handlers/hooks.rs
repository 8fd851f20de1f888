use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{app_state::AppState, handlers::ErrorResponse};

/// Publication hook: queue outbound pings for a content item.
pub async fn published(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    if state.dispatcher.notify_published(id) {
        StatusCode::ACCEPTED.into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "Ping queue unavailable".to_string(),
            }),
        )
            .into_response()
    }
}
