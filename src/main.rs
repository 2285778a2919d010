use std::{sync::Arc, time::Duration};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod aws_clients;
mod communities;
mod config;
mod db;
mod domain;
mod errors;
mod favourites;
mod feed;
mod handlers;
mod links;
mod memes;
mod models;
mod repositories;
mod routes;
mod startup;
mod store;
mod votes;

#[cfg(test)]
mod test_support;

use crate::auth::{Authenticator, TrustedHeaderAuthenticator};
use crate::communities::CommunityDirectory;
use crate::config::Config;
use crate::domain::EntityStore;
use crate::errors::AppError;
use crate::favourites::FavouriteRegistry;
use crate::feed::FeedEngine;
use crate::memes::MemeCatalog;
use crate::store::StoreHandle;
use crate::votes::VoteLedger;

/// AppState holds the services shared by every handler.
pub struct AppState {
    pub communities: CommunityDirectory,
    pub memes: MemeCatalog,
    pub feed: FeedEngine,
    pub favourites: FavouriteRegistry,
    pub votes: VoteLedger,
    pub authenticator: Arc<dyn Authenticator>,
}

impl AppState {
    pub fn new(store: Arc<dyn EntityStore>, timeout: Duration, authenticator: Arc<dyn Authenticator>) -> Self {
        let handle = StoreHandle::new(store, timeout);
        Self {
            communities: CommunityDirectory::new(handle.clone()),
            memes: MemeCatalog::new(handle.clone()),
            feed: FeedEngine::new(handle.clone()),
            favourites: FavouriteRegistry::new(handle.clone()),
            votes: VoteLedger::new(handle),
            authenticator,
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
    tracing::info!("Shutdown signal received, draining connections");
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing (logging)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "memeplace=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!(backend = ?config.store_backend, bind = %config.bind_address, "Configuration loaded");

    let store = startup::init_store(&config).await?;
    let authenticator = Arc::new(TrustedHeaderAuthenticator::new(config.auth_user_header.clone()));
    let state = Arc::new(AppState::new(store, config.store_timeout, authenticator));

    let app = routes::create_router(state, &config.allowed_origins);

    tracing::info!("Server listening on http://{}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
