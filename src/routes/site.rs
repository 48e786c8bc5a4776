//! Site routes: every path not claimed elsewhere goes to the front controller.

use crate::handlers::front;
use crate::state::AppState;
use crate::upload::MAX_UPLOAD_SIZE;
use axum::{extract::DefaultBodyLimit, routing::any, Router};
use tower_http::limit::RequestBodyLimitLayer;

/// Request bodies above this are refused before parsing. Leaves room for a maximum-size
/// upload plus form fields, so oversized files reach the upload check and get a message.
pub const MAX_BODY_SIZE: usize = 2 * MAX_UPLOAD_SIZE;

pub fn site_routes(state: AppState) -> Router {
    Router::new()
        .route("/", any(front))
        .fallback(front)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .with_state(state)
}
