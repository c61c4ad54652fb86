//! malscan server entrypoint: load artifacts once, then serve `/predict`
//! until Ctrl+C.

use malscan::{
    artifacts,
    config::ScannerConfig,
    decision::DecisionPolicy,
    features::{CommandExtractor, FeatureExtractor},
    logging::StructuredLogger,
    pipeline::InferencePipeline,
    server::{self, AppState},
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = ScannerConfig::default_path();
    let mut config = ScannerConfig::load(&config_path)?;
    config.apply_env()?;
    config.validate()?;

    StructuredLogger::init(config.log.json, &config.log.level);
    info!(config = %config_path.display(), "malscan server starting");

    let configured = CommandExtractor::from_config(&config.extractor);
    let extractor: Option<Arc<dyn FeatureExtractor>> = match configured {
        Some(cmd) => {
            info!(
                program = cmd.program(),
                version = %cmd.version(),
                timeout_secs = cmd.timeout().as_secs(),
                "feature extractor configured"
            );
            Some(Arc::new(cmd))
        }
        None => {
            warn!("no feature extractor configured; requests will be answered as unavailable");
            None
        }
    };

    // Artifacts must match what the extractor emits.
    if config.model.generation.is_none() {
        if let Some(ref ex) = extractor {
            config.model.generation = Some(ex.version());
        }
    }

    let policy = DecisionPolicy::from_config(&config.decision)?;
    let model = artifacts::load_model(&config.model);
    let pipeline = Arc::new(InferencePipeline::new(model, extractor, policy));
    info!(status = ?pipeline.status(), "pipeline ready");

    let app = server::router(AppState::new(pipeline), config.server.max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("malscan server stopping");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
}
