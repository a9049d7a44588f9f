use anyhow::{Context, Result};
use facegate_core::{EncodingStore, FaceExtractor, OnnxExtractor, ARCFACE_EMBEDDING_DIM};
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod debug;
mod dispatcher;
mod engine;
mod error;
mod service;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    tracing::info!(?config, "facegated starting");

    // A corrupt store is fatal: never serve recognition against it.
    let store = EncodingStore::open(&config.store_path, ARCFACE_EMBEDDING_DIM)
        .with_context(|| format!("failed to open encoding store {}", config.store_path.display()))?;

    let scrfd_path = config.scrfd_model_path();
    let arcface_path = config.arcface_model_path();
    let mut extractors: Vec<Box<dyn FaceExtractor>> = Vec::with_capacity(config.engine_workers);
    for _ in 0..config.engine_workers {
        let extractor = OnnxExtractor::load(&scrfd_path, &arcface_path)
            .context("failed to load face models")?;
        extractors.push(Box::new(extractor));
    }
    let engine = engine::spawn_engine(extractors).context("failed to start extraction engine")?;

    if config.device_addr.is_none() {
        tracing::warn!("FACEGATE_DEVICE_ADDR not set; verdicts will not be dispatched");
    }

    let state = AppState::new(&config, store, engine).context("failed to build dispatcher")?;
    let app = api::router(state, config.max_image_bytes);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "facegated ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("facegated shutting down");
        })
        .await
        .context("HTTP server error")?;

    Ok(())
}
