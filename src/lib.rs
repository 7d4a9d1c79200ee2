//! Civic API: read-only paginated resources with declarative includes.
//!
//! A resource catalog (tables, relations, resources) is validated and resolved once at
//! startup. Every request then runs the same pipeline: include tokens are checked against
//! the resource descriptor, folded into eager loads on an [`query::EntityQuery`], executed
//! through a [`store::Store`] as one data statement plus one count, and projected into the
//! public shape with normalization rules applied.

pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod query;
pub mod response;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;
pub mod telemetry;

pub use config::{load_from_path, resolve, FullConfig, PaginationSettings, ResolvedModel, ResourceDescriptor};
pub use error::{AppError, ConfigError};
pub use query::{EntityQuery, Filter};
pub use response::{PageEnvelope, PaginationMeta};
pub use routes::{common_routes, common_routes_with_ready, not_found, resource_routes};
pub use service::{PageRequest, ResourceService};
pub use state::AppState;
pub use store::{MemoryStore, PgStore, Row, Store};
pub use telemetry::init_tracing;

use axum::Router;

/// Full router: common routes plus resources, with a JSON 404 fallback.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(common_routes_with_ready(state.clone()))
        .merge(resource_routes(state))
        .fallback(not_found)
}
