use anyhow::{Context, Result};
use clap::Parser;
use loqa_speech_gateway::{
    create_router, AppState, Config, NatsRecognitionBackend, RetryPolicy, SessionConfig,
    SessionRegistry,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "loqa-speech-gateway", version, about = "Relay client audio to streaming speech recognition")]
struct Args {
    /// Config file path (extension optional)
    #[arg(long, default_value = "config/loqa-speech-gateway")]
    config: String,

    /// Override service.http.port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut cfg = Config::load(&args.config)?;
    if let Some(port) = args.port {
        cfg.service.http.port = port;
        cfg.validate()?;
    }

    info!("Loqa Speech Gateway v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);
    info!(
        "Recognition: {} @ {} Hz, {} ({})",
        cfg.recognition.encoding,
        cfg.recognition.sample_rate_hertz,
        cfg.recognition.language_code,
        cfg.recognition.model
    );

    let backend = NatsRecognitionBackend::connect(cfg.nats.clone()).await?;

    let session_config = SessionConfig {
        recognition: Arc::new(cfg.recognition.clone()),
        retry: RetryPolicy::from(&cfg.retry),
    };
    let registry = Arc::new(SessionRegistry::new(Arc::new(backend), session_config));

    let router = create_router(AppState::new(
        Arc::clone(&registry),
        cfg.service.outbound_queue,
    ));

    let addr = cfg.http_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    registry.shutdown().await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
