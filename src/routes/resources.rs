//! Resource routes. The resource is a path parameter; handlers resolve its descriptor.
//! Detail ids may contain slashes (OCD ids), hence the wildcard.

use crate::handlers::resource::{detail, list};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn resource_routes(state: AppState) -> Router {
    Router::new()
        .route("/:path_segment", get(list))
        .route("/:path_segment/*id", get(detail))
        .with_state(state)
}
