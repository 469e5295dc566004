// Use-case level inputs/outputs for the surveillance task.

use crate::domain::{CameraSnapshot, CameraType, Limits, RegistryStats, Rotation, Vec3};
use tokio::sync::oneshot;

/// Commands flowing from connections into the surveillance task.
///
/// Request/response operations carry a reply sender; the position/rotation
/// stream produced by drag gestures is fire-and-forget.
#[derive(Debug)]
pub enum CameraCommand {
    Place {
        camera_type: CameraType,
        position: Vec3,
        rotation: Rotation,
        owner: u64,
        held: bool,
        reply: oneshot::Sender<Option<CameraSnapshot>>,
    },
    Remove {
        camera_id: String,
        requester: u64,
        reply: oneshot::Sender<bool>,
    },
    Move {
        camera_id: String,
        holder: u64,
        position: Vec3,
    },
    Rotate {
        camera_id: String,
        holder: u64,
        rotation: Rotation,
    },
    AcquireLock {
        camera_id: String,
        holder: u64,
        reply: oneshot::Sender<bool>,
    },
    ReleaseLock {
        camera_id: String,
        holder: u64,
    },
    SetViewer {
        viewer: u64,
        camera_id: Option<String>,
        reply: oneshot::Sender<bool>,
    },
    RegisterExternalViewer {
        connection_id: u64,
        camera_id: String,
        reply: oneshot::Sender<bool>,
    },
    UnregisterExternalViewer {
        connection_id: u64,
    },
    SetLimits {
        security: u32,
        stream: u32,
        reply: oneshot::Sender<Limits>,
    },
    GetStats {
        reply: oneshot::Sender<RegistryStats>,
    },
    /// Connection ended: remove owned cameras, release locks, clear viewer
    /// assignments. `participant` is None for watch-only connections.
    Disconnect {
        participant: Option<u64>,
        connection_id: u64,
    },
}

/// Broadcast snapshot of every camera, sent after each successful mutation.
#[derive(Debug, Clone)]
pub struct SurveillanceUpdate {
    pub revision: u64,
    pub cameras: Vec<CameraSnapshot>,
}
