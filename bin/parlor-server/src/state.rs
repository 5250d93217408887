//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::completion::CompletionClient;
use crate::config::Config;
use crate::entities::SqliteStore;

/// State shared across all HTTP handlers.
///
/// Constructed once in `main` and cloned (cheaply, all fields are `Arc`)
/// into each handler; there is no process-global store handle.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Persistent conversation / message store.
    pub store: Arc<SqliteStore>,
    /// Client for the external completion service.
    pub completions: Arc<dyn CompletionClient>,
}
