//! Single-entity fetch for get-by-id.

use crate::error::AppError;
use crate::query::EntityQuery;
use crate::store::{Row, Store};

/// Exactly one row must match. Two are fetched so a non-unique lookup is reported, not hidden.
pub async fn fetch_one(store: &dyn Store, query: EntityQuery<'_>, what: &str) -> Result<Row, AppError> {
    let mut rows = store.fetch(&query.window(2, 0)).await?;
    match rows.len() {
        0 => Err(AppError::NotFound(what.to_string())),
        1 => Ok(rows.remove(0)),
        _ => Err(AppError::MultipleResults(what.to_string())),
    }
}
