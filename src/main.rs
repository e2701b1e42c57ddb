//! svckit service entry point.
//!
//! # Startup Overview
//!
//! ```text
//!   CLI (--profile)
//!        │
//!        ▼
//!   .env + .env.<profile>  ──▶  LogOptions ──▶ Logger (console / rotating file)
//!        │
//!        ▼
//!   ApplicationOptions ──▶ Application::run
//!                              │ validate
//!                              │ reconcile port (SIGTERM stale owners)
//!                              │ install SIGINT → close log sink
//!                              │ log startup
//!                              │ bootstrap hook
//!                              ▼
//!                          AxumRuntime (routes + access log middleware)
//! ```

use axum::{routing::get, Router};
use clap::Parser;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use svckit::config::{ApplicationOptions, EnvConfig, LogOptions, Profile};
use svckit::http::{AxumRuntime, JsonResp};
use svckit::lifecycle::Application;
use svckit::observability::Logger;

#[derive(Parser)]
#[command(name = "svckit")]
#[command(about = "Structured-logging service runtime", long_about = None)]
struct Cli {
    /// Overlay `.env.<profile>` on top of `.env`.
    #[arg(short, long, value_enum)]
    profile: Option<Profile>,

    /// Global route prefix.
    #[arg(long, default_value = "/api/v1")]
    prefix: String,
}

fn routes() -> Router {
    Router::new()
        .route("/", get(|| async { JsonResp::ok(json!({ "name": env!("CARGO_PKG_NAME") })) }))
        .route("/health", get(|| async { JsonResp::ok(json!({ "status": "ok" })) }))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "svckit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = EnvConfig::load(cli.profile)?;

    let log_options = LogOptions::from_config(&config)?;
    let app_options = ApplicationOptions::from_config(&config)?;

    tracing::info!(
        mode = ?log_options.mode,
        level = %log_options.level,
        path = %log_options.path,
        "Configuration loaded"
    );

    let logger = Logger::new(log_options)?;

    let runtime = AxumRuntime::new(logger.clone())
        .with_prefix(cli.prefix)
        .route(routes());

    let mut app = Application::new(app_options, logger.clone());

    let result = app.run(runtime).await;
    logger.close();
    result?;

    tracing::info!("Shutdown complete");
    Ok(())
}
