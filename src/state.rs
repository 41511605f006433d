//! Shared application state

use std::sync::Arc;

use crate::store::RecordStore;

/// State handed to every axum handler and middleware
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}
