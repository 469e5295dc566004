// Wall-mount placement for security cameras.
//
// idle -> aiming -> valid-preview -> confirmed | cancelled. Only a confirm
// from a valid preview emits a create request; every other exit emits
// nothing and mutates no server state.

use super::PlacementRequest;
use crate::protocol::{CameraType, Rotation, Vec3};

/// Raycast result against static wall geometry.
#[derive(Debug, Clone, Copy)]
pub struct WallHit {
    pub point: Vec3,
    /// Unit surface normal at the hit point.
    pub normal: Vec3,
    pub distance: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct SecurityPlacementConfig {
    /// Hits beyond this distance are rejected.
    pub max_range: f32,
    /// Mount offset along the wall normal, keeps the body off the wall.
    pub mount_offset: f32,
    /// Maximum |normal.y| for a surface to count as a wall. Ceilings and
    /// floors have near-vertical normals and are rejected.
    pub max_normal_y: f32,
    /// Fixed downward tilt applied to wall-mounted cameras.
    pub mount_pitch: f32,
}

impl Default for SecurityPlacementConfig {
    fn default() -> Self {
        Self {
            max_range: 6.0,
            mount_offset: 0.08,
            max_normal_y: 0.35,
            mount_pitch: 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SecurityPhase {
    Idle,
    /// Raycasting, no acceptable surface under the cursor yet.
    Aiming,
    /// A wall hit passed validation; preview pose is ready to confirm.
    ValidPreview { position: Vec3, rotation: Rotation },
}

pub struct SecurityPlacer {
    config: SecurityPlacementConfig,
    phase: SecurityPhase,
}

impl SecurityPlacer {
    pub fn new(config: SecurityPlacementConfig) -> Self {
        Self {
            config,
            phase: SecurityPhase::Idle,
        }
    }

    pub fn phase(&self) -> &SecurityPhase {
        &self.phase
    }

    pub fn begin_aiming(&mut self) {
        if matches!(self.phase, SecurityPhase::Idle) {
            self.phase = SecurityPhase::Aiming;
        }
    }

    /// Feeds the current raycast result. A miss or invalid hit drops back to
    /// aiming; a valid wall hit computes the preview pose.
    pub fn update_aim(&mut self, hit: Option<WallHit>) {
        if matches!(self.phase, SecurityPhase::Idle) {
            return;
        }

        let Some(hit) = hit else {
            self.phase = SecurityPhase::Aiming;
            return;
        };

        if hit.distance > self.config.max_range || hit.normal.y.abs() > self.config.max_normal_y {
            self.phase = SecurityPhase::Aiming;
            return;
        }

        let position = hit.point.plus(hit.normal.scaled(self.config.mount_offset));
        // Face away from the wall: yaw opposite the surface normal.
        let yaw = (-hit.normal.x).atan2(-hit.normal.z);
        self.phase = SecurityPhase::ValidPreview {
            position,
            rotation: Rotation {
                pitch: self.config.mount_pitch,
                yaw,
                roll: 0.0,
            },
        };
    }

    /// Confirms the preview, emitting the create request. Confirming without
    /// a valid preview does nothing.
    pub fn confirm(&mut self) -> Option<PlacementRequest> {
        match self.phase {
            SecurityPhase::ValidPreview { position, rotation } => {
                self.phase = SecurityPhase::Idle;
                Some(PlacementRequest::Create {
                    camera_type: CameraType::Security,
                    position,
                    rotation,
                    held: false,
                })
            }
            _ => None,
        }
    }

    /// Aborts the gesture. No request is emitted, no state was committed.
    pub fn cancel(&mut self) {
        self.phase = SecurityPhase::Idle;
    }
}
