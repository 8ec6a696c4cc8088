//! Application state shared across handlers.

use std::sync::Arc;

use bud_mcp::Dispatcher;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The dispatcher every request is routed through.
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}
