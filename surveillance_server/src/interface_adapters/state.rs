use crate::use_cases::CameraCommand;
use axum::extract::ws::Utf8Bytes;
use tokio::sync::{broadcast, mpsc, watch};

#[derive(Clone)]
pub struct AppState {
    // Commands flowing from the network into the surveillance task.
    pub command_tx: mpsc::Sender<CameraCommand>,
    // Serialized snapshots, shared across all connections.
    pub update_bytes_tx: broadcast::Sender<Utf8Bytes>,
    // Latest serialized snapshot for lag recovery and initial state.
    pub update_latest_tx: watch::Sender<Utf8Bytes>,
}
