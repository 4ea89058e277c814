// Application state module
// Per-process state shared by every connection

use crate::config::Config;
use crate::store::Store;

/// Application state
///
/// Connections hold this behind an `Arc`; the store hands out one pooled
/// database connection per request, so nothing here needs interior
/// mutability.
pub struct AppState {
    pub config: Config,
    pub store: Store,
}

impl AppState {
    pub fn new(config: Config, store: Store) -> Self {
        Self { config, store }
    }
}
