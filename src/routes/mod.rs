mod common;
mod resources;

pub use common::{common_routes, common_routes_with_ready};
pub use resources::resource_routes;

use crate::error::AppError;
use axum::http::Uri;

/// Fallback for paths no router matched.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
