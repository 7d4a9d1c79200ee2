//! Entity queries: include resolution, eager-load composition, lookups and PostgreSQL rendering.

mod builder;
mod includes;
pub mod lookup;
pub mod params;
pub mod sql;

pub use builder::*;
pub use includes::*;
pub use lookup::{jurisdiction_filter, jurisdiction_lookup, lookup_filter};
pub use params::PgBindValue;
