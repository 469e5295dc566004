// Wire protocol DTOs and conversions for public surveillance messages.

use crate::domain::{CameraSnapshot, CameraType, Limits, Owner, RegistryStats, Rotation, Vec3};
use crate::use_cases::SurveillanceUpdate;
use serde::{Deserialize, Serialize};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Assigned identity for the connection after the handshake is accepted.
    Identity { participant_id: Option<String> },
    // Full camera snapshot, broadcast after every successful mutation.
    Snapshot(SnapshotDto),
    // Outcome of a Place request; None means rejected (limit or bad input).
    PlaceResult { camera: Option<CameraDto> },
    // Outcome of a Remove request.
    RemoveResult { camera_id: String, removed: bool },
    // Outcome of an AcquireLock request.
    LockResult { camera_id: String, granted: bool },
    // Outcome of a SetViewer or external registration request.
    ViewerResult { accepted: bool },
    Stats(StatsDto),
    Limits(LimitsDto),
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Handshake for in-world participants.
    Join(JoinPayload),
    // Handshake for external watch-only connections (no in-world identity).
    WatchOnly,
    PlaceCamera(PlaceCameraDto),
    RemoveCamera { camera_id: String },
    MoveCamera { camera_id: String, position: Vec3Dto },
    RotateCamera {
        camera_id: String,
        rotation: RotationDto,
    },
    AcquireLock { camera_id: String },
    ReleaseLock { camera_id: String },
    SetViewer { camera_id: Option<String> },
    SetLimits { security: u32, stream: u32 },
    GetStats,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinPayload {
    pub participant_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceCameraDto {
    #[serde(rename = "type")]
    pub camera_type: CameraTypeDto,
    pub position: Vec3Dto,
    pub rotation: RotationDto,
    // True when the camera starts out carried rather than placed.
    #[serde(default)]
    pub held: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraTypeDto {
    Security,
    Stream,
}

impl From<CameraTypeDto> for CameraType {
    fn from(dto: CameraTypeDto) -> Self {
        match dto {
            CameraTypeDto::Security => CameraType::Security,
            CameraTypeDto::Stream => CameraType::Stream,
        }
    }
}

impl From<CameraType> for CameraTypeDto {
    fn from(camera_type: CameraType) -> Self {
        match camera_type {
            CameraType::Security => CameraTypeDto::Security,
            CameraType::Stream => CameraTypeDto::Stream,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Vec3Dto {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vec3Dto> for Vec3 {
    fn from(dto: Vec3Dto) -> Self {
        Self {
            x: dto.x,
            y: dto.y,
            z: dto.z,
        }
    }
}

impl From<Vec3> for Vec3Dto {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RotationDto {
    #[serde(default)]
    pub pitch: f32,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub roll: f32,
}

impl From<RotationDto> for Rotation {
    fn from(dto: RotationDto) -> Self {
        Self {
            pitch: dto.pitch,
            yaw: dto.yaw,
            roll: dto.roll,
        }
    }
}

impl From<Rotation> for RotationDto {
    fn from(r: Rotation) -> Self {
        Self {
            pitch: r.pitch,
            yaw: r.yaw,
            roll: r.roll,
        }
    }
}

/// Ownership on the wire, tagged so clients match it exhaustively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OwnerDto {
    Player { id: u64 },
    HeldBy { id: u64 },
    Unowned,
}

impl From<Owner> for OwnerDto {
    fn from(owner: Owner) -> Self {
        match owner {
            Owner::Player(id) => OwnerDto::Player { id },
            Owner::HeldBy(id) => OwnerDto::HeldBy { id },
            Owner::Unowned => OwnerDto::Unowned,
        }
    }
}

/// Public camera state for wire transmission. Internal fields (resolution,
/// creation time) are deliberately absent.
#[derive(Debug, Clone, Serialize)]
pub struct CameraDto {
    pub id: String,
    #[serde(rename = "type")]
    pub camera_type: CameraTypeDto,
    pub owner: OwnerDto,
    pub position: Vec3Dto,
    pub rotation: RotationDto,
}

impl From<&CameraSnapshot> for CameraDto {
    fn from(camera: &CameraSnapshot) -> Self {
        Self {
            id: camera.id.clone(),
            camera_type: camera.camera_type.into(),
            owner: camera.owner.into(),
            position: camera.position.into(),
            rotation: camera.rotation.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotDto {
    pub revision: u64,
    pub cameras: Vec<CameraDto>,
}

impl From<SurveillanceUpdate> for SnapshotDto {
    fn from(update: SurveillanceUpdate) -> Self {
        Self {
            revision: update.revision,
            cameras: update.cameras.iter().map(CameraDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TypeStatsDto {
    pub count: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatsDto {
    pub security: TypeStatsDto,
    pub stream: TypeStatsDto,
}

impl From<RegistryStats> for StatsDto {
    fn from(stats: RegistryStats) -> Self {
        Self {
            security: TypeStatsDto {
                count: stats.security.count,
                limit: stats.security.limit,
            },
            stream: TypeStatsDto {
                count: stats.stream.count,
                limit: stats.stream.limit,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LimitsDto {
    pub security: u32,
    pub stream: u32,
}

impl From<Limits> for LimitsDto {
    fn from(limits: Limits) -> Self {
        Self {
            security: limits.security,
            stream: limits.stream,
        }
    }
}
