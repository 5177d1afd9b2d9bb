use std::sync::Arc;

use crate::analysis::pipeline::PipelineOrchestrator;
use crate::extraction::DocumentTextExtractor;

/// Shared application state injected into all route handlers via Axum extractors.
/// Everything here is read-only after startup; requests share no mutable state.
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<DocumentTextExtractor>,
    pub pipeline: Arc<PipelineOrchestrator>,
    /// Request body limit applied to the upload route.
    pub max_upload_bytes: usize,
}
