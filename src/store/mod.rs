//! Persistence boundary: the engine only needs filtered, ordered, windowed fetches with eager loads, and counts.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::AppError;
use crate::query::EntityQuery;
use async_trait::async_trait;

/// A fetched entity: table columns plus one key per eager-loaded relation
/// (array for to_many, object or null for to_one), nested the same way for chained loads.
pub type Row = serde_json::Map<String, serde_json::Value>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Rows matching the query, in query order, with eager loads attached.
    async fn fetch(&self, query: &EntityQuery<'_>) -> Result<Vec<Row>, AppError>;

    /// Rows matching the query's predicates.
    async fn count(&self, query: &EntityQuery<'_>) -> Result<u64, AppError>;

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
