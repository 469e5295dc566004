// Framework bootstrap for the surveillance server runtime.

use crate::frameworks::config;
use crate::interface_adapters::http::stats_handler;
use crate::interface_adapters::net::{snapshot_serializer, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{CameraCommand, SurveillanceUpdate, surveillance_task};

use axum::{Router, extract::ws::Utf8Bytes, routing::get};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};
use tokio::sync::{broadcast, mpsc, watch};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state();

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/stats", get(stats_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state() -> Arc<AppState> {
    // command_tx/rx: all client commands go to the single surveillance task.
    let (command_tx, command_rx) =
        mpsc::channel::<CameraCommand>(config::COMMAND_CHANNEL_CAPACITY);

    // update_tx/rx: camera snapshots broadcast to all connections.
    let (update_tx, _update_rx) =
        broadcast::channel::<SurveillanceUpdate>(config::SNAPSHOT_BROADCAST_CAPACITY);

    // Serialized snapshot bytes shared across connections, plus the latest
    // snapshot for lag recovery and initial state.
    let (update_bytes_tx, _update_bytes_rx) =
        broadcast::channel::<Utf8Bytes>(config::SNAPSHOT_BROADCAST_CAPACITY);
    let (update_latest_tx, _update_latest_rx) = watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));

    // Spawn the snapshot serializer in the adapter layer, subscribing before
    // the surveillance task starts so no early broadcast is missed.
    tokio::spawn(snapshot_serializer(
        update_tx.subscribe(),
        update_bytes_tx.clone(),
        update_latest_tx.clone(),
    ));

    // Spawn the authoritative surveillance loop.
    tokio::spawn(surveillance_task(command_rx, update_tx));

    Arc::new(AppState {
        command_tx,
        update_bytes_tx,
        update_latest_tx,
    })
}
