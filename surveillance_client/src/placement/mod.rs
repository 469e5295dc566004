// Placement controllers: interactive state machines that turn raw input
// into validated create/update requests for the server.

pub mod security;
pub mod stream;

use crate::protocol::{CameraType, ClientMessage, Rotation, Vec3};

/// A validated request produced by a placement gesture.
#[derive(Debug, Clone, PartialEq)]
pub enum PlacementRequest {
    Create {
        camera_type: CameraType,
        position: Vec3,
        rotation: Rotation,
        held: bool,
    },
    Move {
        camera_id: String,
        position: Vec3,
    },
    Rotate {
        camera_id: String,
        rotation: Rotation,
    },
}

impl From<PlacementRequest> for ClientMessage {
    fn from(request: PlacementRequest) -> Self {
        match request {
            PlacementRequest::Create {
                camera_type,
                position,
                rotation,
                held,
            } => ClientMessage::PlaceCamera {
                camera_type,
                position,
                rotation,
                held,
            },
            PlacementRequest::Move {
                camera_id,
                position,
            } => ClientMessage::MoveCamera {
                camera_id,
                position,
            },
            PlacementRequest::Rotate {
                camera_id,
                rotation,
            } => ClientMessage::RotateCamera {
                camera_id,
                rotation,
            },
        }
    }
}

pub use security::{SecurityPhase, SecurityPlacer, WallHit};
pub use stream::{StreamPhase, StreamPlacer};
