// Client-side mirror of the surveillance wire protocol.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraType {
    Security,
    Stream,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn scaled(self, factor: f32) -> Vec3 {
        Vec3 {
            x: self.x * factor,
            y: self.y * factor,
            z: self.z * factor,
        }
    }

    pub fn plus(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    #[serde(default)]
    pub pitch: f32,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub roll: f32,
}

impl Rotation {
    pub const LEVEL: Rotation = Rotation {
        pitch: 0.0,
        yaw: 0.0,
        roll: 0.0,
    };
}

/// Camera ownership, matched exhaustively. `HeldBy` drives carrier hiding in
/// the feed renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Owner {
    Player { id: u64 },
    HeldBy { id: u64 },
    Unowned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraState {
    pub id: String,
    #[serde(rename = "type")]
    pub camera_type: CameraType,
    pub owner: Owner,
    pub position: Vec3,
    pub rotation: Rotation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotPayload {
    pub revision: u64,
    pub cameras: Vec<CameraState>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TypeStatsPayload {
    pub count: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StatsPayload {
    pub security: TypeStatsPayload,
    pub stream: TypeStatsPayload,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LimitsPayload {
    pub security: u32,
    pub stream: u32,
}

/// Messages arriving from the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    Identity { participant_id: Option<String> },
    Snapshot(SnapshotPayload),
    PlaceResult { camera: Option<CameraState> },
    RemoveResult { camera_id: String, removed: bool },
    LockResult { camera_id: String, granted: bool },
    ViewerResult { accepted: bool },
    Stats(StatsPayload),
    Limits(LimitsPayload),
}

/// Messages sent to the server.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    Join { participant_id: u64 },
    WatchOnly,
    PlaceCamera {
        #[serde(rename = "type")]
        camera_type: CameraType,
        position: Vec3,
        rotation: Rotation,
        held: bool,
    },
    RemoveCamera { camera_id: String },
    MoveCamera { camera_id: String, position: Vec3 },
    RotateCamera { camera_id: String, rotation: Rotation },
    AcquireLock { camera_id: String },
    ReleaseLock { camera_id: String },
    SetViewer { camera_id: Option<String> },
    SetLimits { security: u32, stream: u32 },
    GetStats,
}
