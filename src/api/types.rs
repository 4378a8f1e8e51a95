//! Shared state for the HTTP layer.

use std::sync::Arc;

use crate::pipeline::Orchestrator;

/// Cloned into every handler via `State`.
#[derive(Clone)]
pub struct ApiContext {
    pub orchestrator: Arc<Orchestrator>,
    /// Gateway base URL, reported by `/health`. `None` when running without one.
    pub gateway_url: Option<String>,
}

impl ApiContext {
    pub fn new(orchestrator: Arc<Orchestrator>, gateway_url: Option<String>) -> Self {
        Self {
            orchestrator,
            gateway_url,
        }
    }
}
