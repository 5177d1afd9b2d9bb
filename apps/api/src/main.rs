mod analysis;
mod config;
mod errors;
mod extraction;
mod llm_client;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::pipeline::PipelineOrchestrator;
use crate::config::Config;
use crate::extraction::ocr::{ocr_tools_available, PopplerRasterizer, TesseractRecognizer};
use crate::extraction::DocumentTextExtractor;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobFit API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(config.llm_config()).context("Failed to build LLM client")?;
    info!("LLM client initialized (model: {})", llm.model());

    // Initialize document extraction (structural text + OCR fallback)
    if !ocr_tools_available().await {
        warn!("OCR tools missing: scanned resumes will fail extraction");
    }
    let extractor = DocumentTextExtractor::new(
        Arc::new(PopplerRasterizer::new(config.ocr_dpi)),
        Arc::new(TesseractRecognizer::new(config.ocr_lang.clone())),
    );
    info!(
        "Document extractor initialized (OCR {} dpi, lang {})",
        config.ocr_dpi, config.ocr_lang
    );

    let pipeline = PipelineOrchestrator::new(Arc::new(llm), config.pipeline_deadline);

    // Build app state
    let state = AppState {
        extractor: Arc::new(extractor),
        pipeline: Arc::new(pipeline),
        max_upload_bytes: config.max_upload_bytes,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(&config.cors_allowed_origins)?);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// CORS restricted to the configured frontend origins.
fn build_cors(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o).with_context(|| format!("Invalid CORS origin '{o}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    info!("CORS allowed origins: {:?}", origins);

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]))
}
