use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use log::{error, info, warn};
use spamsift::{
    app_router, init_logger, AppState, ModelManager, PredictionService, RateLimitConfig,
    ServiceConfig,
};

#[derive(Parser)]
#[command(author, version, about = "Serves spam/legitimate predictions over HTTP", long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 8000)]
    port: u16,

    /// Directory holding vectorizer.json, model.json and metadata.json
    #[arg(short, long, env = "SPAMSIFT_ARTIFACTS", default_value = ".")]
    artifacts: PathBuf,

    /// Maximum accepted message length, in characters
    #[arg(long, env = "SPAMSIFT_MAX_CHARS", default_value_t = 5000)]
    max_chars: usize,

    /// Prediction requests allowed per client per window (0 disables limiting)
    #[arg(long, default_value_t = 15)]
    rate_limit_requests: usize,

    /// Rate limit window in seconds
    #[arg(long, default_value_t = 60)]
    rate_limit_period_secs: u64,

    /// Rate-limit clients by the first X-Forwarded-For hop (only behind a trusted proxy)
    #[arg(long, env = "SPAMSIFT_TRUST_FORWARDED_FOR")]
    trust_forwarded_for: bool,
}

impl From<Args> for ServiceConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            artifacts_dir: args.artifacts,
            max_message_chars: args.max_chars,
            rate_limit: RateLimitConfig {
                max_requests: args.rate_limit_requests,
                period: Duration::from_secs(args.rate_limit_period_secs),
                trust_forwarded_for: args.trust_forwarded_for,
            },
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();
    let config = ServiceConfig::from(Args::parse());

    info!("=== Starting spam classifier service ===");
    info!("Artifacts directory: {:?}", config.artifacts_dir);
    info!("Maximum message length: {} characters", config.max_message_chars);
    if config.rate_limit.is_enabled() {
        info!(
            "Rate limit: {} requests per {:?} per client (keyed on {})",
            config.rate_limit.max_requests,
            config.rate_limit.period,
            if config.rate_limit.trust_forwarded_for { "X-Forwarded-For" } else { "peer address" }
        );
    } else {
        warn!("Rate limiting disabled");
    }

    let service = PredictionService::new(
        ModelManager::new(&config.artifacts_dir),
        config.max_message_chars,
    );
    match service.warm_up().await {
        Ok(classifier) => {
            let info = classifier.info();
            info!(
                "Classifier ready: {} model, {} features, version {}",
                info.model_kind,
                info.n_features,
                info.model_version.as_deref().unwrap_or("unknown")
            );
        }
        Err(e) => error!(
            "Failed to load artifacts, predictions will fail until they are available: {}",
            e
        ),
    }

    let app = app_router(AppState::new(service, config.rate_limit.clone()));
    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Listening on http://{}", bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Shutdown complete");
    Ok(())
}
