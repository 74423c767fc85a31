//! Shared state for the REST API server.

use crate::probe::Dispatcher;

/// Shared state for the REST API server.
#[derive(Clone)]
pub struct ApiState {
    /// Routes probe requests by scheme.
    pub dispatcher: Dispatcher,
}

impl ApiState {
    /// Creates a new API state.
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }
}
