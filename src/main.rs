use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use review_helper::config::Config;
use review_helper::git::RepoManager;
use review_helper::github::OctocrabClient;
use review_helper::retry::RetryScheduler;
use review_helper::review::ReviewEngine;
use review_helper::server::{AppState, build_router};
use review_helper::webhooks::WebhookSecret;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "review_helper=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();
    let tries = config.tries()?;
    let secret = WebhookSecret::new(&config.github_secret)
        .map_err(|_| anyhow::anyhow!("GITHUB_SECRET cannot be used as an HMAC key"))?;
    let github = OctocrabClient::from_token(config.github_access_token.clone())
        .context("Failed to build the GitHub client")?;
    let repos_dir = config.repos_dir();
    let git = RepoManager::new(&repos_dir, config.commit_identity());

    let scheduler = RetryScheduler::new();
    let engine = ReviewEngine::new(github, git, scheduler.clone(), tries);
    let app = build_router(AppState::new(engine, secret));

    let addr = SocketAddr::new(config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    tracing::info!(%addr, repos_dir = %repos_dir.display(), "Listening");

    let interrupted = scheduler.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!(in_flight = interrupted.in_flight(), "Shutting down");
            interrupted.interrupt();
        })
        .await
        .context("Server error")?;

    scheduler.drain().await;
    tracing::info!("All asynchronous operations finished");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
