//! Response envelope for list endpoints.

use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u64,
    pub max_page: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct PageEnvelope {
    pub results: Vec<Value>,
    pub pagination: PaginationMeta,
}
