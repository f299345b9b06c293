//! # Bouncer - Vibegate front door
//!
//! Hands out LLM-written challenges, lets the same model judge the answers,
//! and shows the verdict behind a post/redirect/get.
//!
//! ## Architecture
//! ```text
//! Browser → Bouncer (axum) → Completion API
//!              ↓
//!        Session store (in-memory)
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;
mod flow;
mod html;
mod llm;
mod prompts;
mod ratelimit;
mod routes;
mod sessions;
mod state;
mod templates;

use config::AppConfig;
use sessions::session_sweeper;
use state::AppState;

/// Vibegate Bouncer - access by vibe alone
#[derive(Parser, Debug)]
#[command(name = "bouncer")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/bouncer.toml")]
    config: String,

    /// Listen address (overrides config)
    #[arg(short, long, env = "LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,

    /// Verbose errors and debug logs; bare `--debug` means true
    #[arg(
        long,
        env = "DEBUG_MODE",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    debug: Option<String>,

    /// Model name passed to the provider
    #[arg(long, env = "DEFAULT_MODEL")]
    model: Option<String>,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "OPENAI_BASE_URL")]
    api_base: Option<String>,

    /// Provider API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// LiteLLM proxy base URL
    #[arg(long, env = "LITELLM_PROXY_API_BASE")]
    proxy_api_base: Option<String>,

    /// LiteLLM proxy key
    #[arg(long, env = "LITELLM_PROXY_API_KEY", hide_env_values = true)]
    proxy_api_key: Option<String>,

    /// Extra request headers as a JSON object
    #[arg(long, env = "LITELLM_CUSTOM_HEADERS")]
    custom_headers: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env must be loaded before clap reads the environment
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let mut args = Args::parse();
    if args.api_base.is_none() {
        args.api_base = std::env::var("OPENAI_API_BASE").ok();
    }

    // Initialize logging
    let debug_flag = args.debug.as_deref().is_some_and(config::is_truthy);
    let level = if debug_flag { "debug" } else { args.log_level.as_str() };
    init_logging(level, args.json_logs)?;

    info!("🚪 Starting Vibegate Bouncer v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::load(&args.config, &args)?;
    info!("📋 Configuration loaded from {}", args.config);

    if config.debug {
        warn!("DEBUG_MODE is enabled! This should NOT be used in production.");
    }
    info!(
        model = %config.llm.model,
        proxy = config.llm.uses_proxy(),
        api_key = config.llm.endpoint().1.is_some(),
        "🤖 Completion provider configured"
    );

    // Create shutdown broadcast channel
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    // Initialize application state
    let state = AppState::from_config(config.clone())?;

    // Spawn expired-session sweeper
    let sweeper_store = state.sessions();
    let sweeper_shutdown = shutdown_tx.subscribe();
    let sweep_interval = Duration::from_secs(config.session.sweep_interval_secs.max(1));
    tokio::spawn(async move {
        session_sweeper(sweeper_store, sweep_interval, sweeper_shutdown).await;
    });

    // Build router
    let app = routes::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!("🚀 Bouncer listening on {}", config.listen_addr);

    // Handle graceful shutdown
    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("🛑 Shutdown signal received");
        let _ = shutdown_tx.send(());
    };

    // Peer addresses feed the per-client rate limiter
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await
    .context("Server error")?;

    info!("👋 Bouncer shutdown complete");
    Ok(())
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
            .context("Failed to initialize logging")?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .try_init()
            .context("Failed to initialize logging")?;
    }

    Ok(())
}
