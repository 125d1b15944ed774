use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chat_backend::{
    auth::hash_password,
    config::{LogFormat, Settings, DEFAULT_CONFIG_FILE},
    ws_router, AppState,
};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::time::{interval, Duration};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Authenticated group chat server
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the server (default)
    Serve {
        /// TOML config file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },
    /// Print the scrypt hash of a password for the `users` table
    HashPassword { password: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::HashPassword { password }) => {
            println!("{}", hash_password(&password)?);
            Ok(())
        },
        Some(Command::Serve { config }) => serve(config).await,
        None => serve(PathBuf::from(DEFAULT_CONFIG_FILE)).await,
    }
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match settings.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn serve(config: PathBuf) -> anyhow::Result<()> {
    let settings = Settings::load_from(&config)
        .with_context(|| format!("loading settings from {}", config.display()))?;
    init_tracing(&settings);

    if settings.users.is_empty() {
        tracing::warn!("no users configured; nobody will be able to log in");
    }

    let bind_addr = settings.bind_addr;
    let state = Arc::new(AppState::new(settings));

    // Sweep expired sessions every 15 minutes
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = interval(Duration::from_secs(15 * 60));
        loop {
            interval.tick().await;
            sessions.sweep_expired();
        }
    });

    let app = ws_router::create_router(state);

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    info!(addr = %bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
