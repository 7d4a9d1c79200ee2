//! Shared application state for all routes. Everything here is read-only after startup.

use crate::config::{PaginationSettings, ResolvedModel};
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub model: Arc<ResolvedModel>,
    pub settings: PaginationSettings,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, model: ResolvedModel, settings: PaginationSettings) -> Self {
        AppState {
            store,
            model: Arc::new(model),
            settings,
        }
    }
}
