//! Scoreboard Back binary entrypoint wiring the match authority, its background
//! tasks and the WebSocket, SSE and REST layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scoreboard_back::{
    config::AppConfig,
    dao::snapshot_store::{SnapshotStore, file::FileSnapshotStore},
    routes,
    services::{persistence, ticker},
    state::{AppState, SharedState, clock::SystemClock},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let store = open_store(&config).await?;
    let app_state = AppState::bootstrap(config, Arc::new(SystemClock), store).await;

    let persister_task = persistence::spawn_persister(app_state.clone());
    let ticker_task = ticker::spawn_ticker(app_state.clone());
    let sweeper_task = ticker::spawn_lock_sweeper(app_state.clone());

    let app = build_router(app_state.clone());

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    ticker_task.abort();
    sweeper_task.abort();
    persister_task.abort();
    persistence::flush(&app_state).await;
    Ok(())
}

/// Pick the snapshot backend: CouchDB when configured, JSON files otherwise.
async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn SnapshotStore>> {
    if let Some(store) = open_couch_store().await? {
        return Ok(store);
    }

    let storage = config.storage();
    info!(
        last_match = %storage.last_match_path().display(),
        settings = %storage.settings_path().display(),
        "using file snapshot store"
    );
    Ok(Arc::new(FileSnapshotStore::from_config(storage)))
}

#[cfg(feature = "couch-store")]
async fn open_couch_store() -> anyhow::Result<Option<Arc<dyn SnapshotStore>>> {
    use scoreboard_back::dao::snapshot_store::couchdb::{CouchConfig, CouchSnapshotStore};

    let Ok(couch) = CouchConfig::from_env() else {
        return Ok(None);
    };
    let database = couch.database.clone();
    let store = CouchSnapshotStore::connect(couch)
        .await
        .context("connecting to CouchDB")?;
    info!(%database, "using CouchDB snapshot store");
    Ok(Some(Arc::new(store)))
}

#[cfg(not(feature = "couch-store"))]
async fn open_couch_store() -> anyhow::Result<Option<Arc<dyn SnapshotStore>>> {
    Ok(None)
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
