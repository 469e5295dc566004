// Domain-level camera entities and value types.

use std::time::{SystemTime, UNIX_EPOCH};

/// The two camera classes participants can place in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraType {
    /// Wall-mounted, placed via surface raycast.
    Security,
    /// Freely held camera manipulated by grab gestures; always horizon-level.
    Stream,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Ownership of a camera entity, matched exhaustively instead of encoding
/// held state in the owner id string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    /// Placed and owned by a participant.
    Player(u64),
    /// Currently carried around by a participant.
    HeldBy(u64),
    Unowned,
}

impl Owner {
    /// Participant this camera belongs to for disconnect cleanup purposes.
    pub fn participant(&self) -> Option<u64> {
        match self {
            Owner::Player(id) | Owner::HeldBy(id) => Some(*id),
            Owner::Unowned => None,
        }
    }
}

pub struct Camera {
    pub id: String,
    pub camera_type: CameraType,
    pub owner: Owner,
    pub position: Vec3,
    pub rotation: Rotation,
    // Internal fields, never broadcast to clients.
    pub resolution: Resolution,
    pub created_at: u64,
}

/// Public projection of a camera, safe to broadcast.
#[derive(Debug, Clone)]
pub struct CameraSnapshot {
    pub id: String,
    pub camera_type: CameraType,
    pub owner: Owner,
    pub position: Vec3,
    pub rotation: Rotation,
}

impl From<&Camera> for CameraSnapshot {
    fn from(camera: &Camera) -> Self {
        Self {
            id: camera.id.clone(),
            camera_type: camera.camera_type,
            owner: camera.owner,
            position: camera.position,
            rotation: camera.rotation,
        }
    }
}

pub fn current_epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
