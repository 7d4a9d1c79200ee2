//! HTTP handlers for resource list and detail.

pub mod resource;
pub use resource::*;
