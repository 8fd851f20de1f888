use axum::{
    Form, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    app_state::AppState,
    handlers::{ErrorResponse, xml},
    pingback::{TrackbackError, TrackbackForm, trackback::response_xml},
};

/// A trackback URL opened in a browser leads to the item itself.
pub async fn redirect(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.trackbacks.permalink(id).await {
        Ok(permalink) => Redirect::permanent(permalink.as_str()).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn receive(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<TrackbackForm>,
) -> Response {
    match state.trackbacks.receive(id, form).await {
        Ok(_) => xml(response_xml(None)),
        Err(e) => error_response(e),
    }
}

fn error_response(error: TrackbackError) -> Response {
    match error {
        TrackbackError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Content not found".to_string(),
            }),
        )
            .into_response(),
        TrackbackError::MissingUrl { permalink } => {
            Redirect::permanent(permalink.as_str()).into_response()
        }
        TrackbackError::Disabled(_) | TrackbackError::AlreadyRegistered => {
            xml(response_xml(Some(&error.to_string())))
        }
        TrackbackError::Internal(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            xml(response_xml(Some("Trackback could not be registered"))),
        )
            .into_response(),
    }
}
