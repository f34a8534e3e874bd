use std::sync::Arc;

use crate::services::RecommendationEngine;

/// Shared application state
///
/// Everything behind it is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RecommendationEngine>,
    pub default_top_k: usize,
}

impl AppState {
    pub fn new(engine: RecommendationEngine, default_top_k: usize) -> Self {
        Self {
            engine: Arc::new(engine),
            default_top_k,
        }
    }
}
