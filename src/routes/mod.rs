//! Route builders.

mod common;
mod site;

pub use common::common_routes;
pub use site::{site_routes, MAX_BODY_SIZE};

use crate::state::AppState;
use axum::Router;

/// Operational routes plus the site.
pub fn app(state: AppState) -> Router {
    common_routes(state.clone()).merge(site_routes(state))
}
