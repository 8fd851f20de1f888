pub mod hooks;
pub mod trackback;
pub mod xmlrpc;

use axum::{
    Router,
    http::header::CONTENT_TYPE,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::app_state::AppState;
use crate::health::health_check;
use crate::middleware::{RateLimit, rate_limit_middleware};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Full HTTP surface; the inbound protocol routes sit behind `rate_limit`.
pub fn router(state: AppState, rate_limit: RateLimit) -> Router {
    let inbound = Router::new()
        .route("/xmlrpc/", post(xmlrpc::handle))
        .route(
            "/trackback/{id}/",
            get(trackback::redirect).post(trackback::receive),
        )
        .route_layer(middleware::from_fn_with_state(
            rate_limit,
            rate_limit_middleware,
        ));

    Router::new()
        .merge(inbound)
        .route("/hooks/published/{id}", post(hooks::published))
        .route("/healthz", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}

pub(crate) fn xml(body: String) -> Response {
    ([(CONTENT_TYPE, "text/xml; charset=utf-8")], body).into_response()
}
