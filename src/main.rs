use std::sync::Arc;

use anyhow::Context;
use crop_predictor::{create_router, AppState, Config, Pipeline, PredictionService, Regressor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crop_predictor=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env();

    let pipeline = Pipeline::load(&config.model_path)?;
    // Warmup so a broken artifact fails here instead of on the first request
    let probe = pipeline.probe_record();
    let warm = pipeline
        .predict(&probe)
        .context("warmup prediction on the loaded model failed")?;
    let info = pipeline.info();
    tracing::info!(
        path = %config.model_path.display(),
        name = %info.name,
        version = %info.version,
        estimator = info.estimator,
        encoded_width = info.encoded_width,
        warmup = warm,
        "loaded model"
    );

    let state = AppState {
        service: PredictionService::new(Arc::new(pipeline)),
    };
    let app = create_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(address = %addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutting down");
            }
        })
        .await?;
    Ok(())
}
