// src/main.rs

use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tokio::net::TcpListener;
use tracing::{info, warn};

use securenexus::app::App;
use securenexus::config::Args;
use securenexus::core::engine::ZapClient;
use securenexus::gateway;
use securenexus::llm::gemini::GeminiClient;
use securenexus::logging::initialize_logging;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    args.validate()?;
    let log_path = initialize_logging()?;

    let engine = ZapClient::new(&args.zap_proxy, &args.zap_api_key)
        .wrap_err("failed to build the ZAP client")?;
    info!(zap = %engine.base_url(), workers = args.scan_workers, log = %log_path.display(), "Starting SecureNexus.");

    let mut app = App::new(Arc::new(engine), args.scan_settings(), args.scan_workers, args.report_dir());

    match args.gemini_api_key.clone().filter(|key| !key.trim().is_empty()) {
        Some(key) => {
            let model = GeminiClient::new(key, Some(args.gemini_model.clone()))
                .wrap_err("failed to build the Gemini client")?;
            app = app.with_model(Arc::new(model));
        }
        None => warn!("GEMINI_API_KEY is not set; code analysis and phishing checks are disabled."),
    }
    if let Some(dir) = args.static_dir.clone() {
        app = app.with_static_dir(dir);
    }

    let listener = TcpListener::bind(args.bind)
        .await
        .wrap_err_with(|| format!("failed to bind {}", args.bind))?;
    info!(address = %args.bind, report_dir = %args.report_dir().display(), "Listening.");

    axum::serve(listener, gateway::router(Arc::new(app)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for the shutdown signal.");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested.");
}
