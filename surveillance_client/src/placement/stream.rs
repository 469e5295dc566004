// Free placement for stream cameras.
//
// idle -> grabbed (from the palette or an existing camera) -> dragging ->
// released. Dragging streams throttled move updates; release sends the final
// pose. A separate rotation sub-mode orbits the aim direction around the
// camera and always keeps roll at zero.

use std::time::{Duration, Instant};

use super::PlacementRequest;
use crate::protocol::{CameraType, Rotation, StatsPayload, Vec3};

// Minimum interval between streamed drag updates.
const DRAG_UPDATE_INTERVAL: Duration = Duration::from_millis(100);
// How long the snapshot cache should keep a locally-applied rotation after
// the gesture ends, covering the round trip before the server echoes it.
const ROTATION_HOLD: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, PartialEq)]
pub enum StreamPhase {
    Idle,
    /// A fresh camera grabbed off the palette, not yet created server-side.
    GrabbedNew { position: Vec3, rotation: Rotation },
    /// An existing camera being repositioned.
    GrabbedExisting { camera_id: String, position: Vec3 },
    /// Aiming an existing camera via its rotation handle.
    Rotating {
        camera_id: String,
        rotation: Rotation,
    },
}

pub struct StreamPlacer {
    phase: StreamPhase,
    last_update: Option<Instant>,
}

impl StreamPlacer {
    pub fn new() -> Self {
        Self {
            phase: StreamPhase::Idle,
            last_update: None,
        }
    }

    pub fn phase(&self) -> &StreamPhase {
        &self.phase
    }

    /// Grabs a new stream camera from the palette. Refused when the server's
    /// stats already show the stream limit reached, so the player learns
    /// before committing the gesture rather than on a rejected place.
    pub fn grab_from_palette(&mut self, stats: &StatsPayload, spawn_at: Vec3) -> bool {
        if !matches!(self.phase, StreamPhase::Idle) {
            return false;
        }
        if stats.stream.count >= stats.stream.limit {
            return false;
        }
        self.phase = StreamPhase::GrabbedNew {
            position: spawn_at,
            rotation: Rotation::LEVEL,
        };
        self.last_update = None;
        true
    }

    pub fn grab_existing(&mut self, camera_id: String, position: Vec3) -> bool {
        if !matches!(self.phase, StreamPhase::Idle) {
            return false;
        }
        self.phase = StreamPhase::GrabbedExisting {
            camera_id,
            position,
        };
        self.last_update = None;
        true
    }

    /// Tracks the drag point. Existing cameras stream throttled move
    /// updates so spectators see the camera travel; a fresh grab only
    /// updates locally until release creates it.
    pub fn drag(&mut self, point: Vec3, now: Instant) -> Option<PlacementRequest> {
        let throttled = !self.throttle_elapsed(now);
        match &mut self.phase {
            StreamPhase::GrabbedNew { position, .. } => {
                *position = point;
                None
            }
            StreamPhase::GrabbedExisting {
                camera_id,
                position,
            } => {
                *position = point;
                if throttled {
                    return None;
                }
                let request = PlacementRequest::Move {
                    camera_id: camera_id.clone(),
                    position: point,
                };
                self.last_update = Some(now);
                Some(request)
            }
            _ => None,
        }
    }

    /// Ends the drag, emitting the final request regardless of throttling.
    pub fn release(&mut self, now: Instant) -> Option<PlacementRequest> {
        let phase = std::mem::replace(&mut self.phase, StreamPhase::Idle);
        self.last_update = Some(now);
        match phase {
            StreamPhase::GrabbedNew { position, rotation } => Some(PlacementRequest::Create {
                camera_type: CameraType::Stream,
                position,
                rotation,
                held: false,
            }),
            StreamPhase::GrabbedExisting {
                camera_id,
                position,
            } => Some(PlacementRequest::Move {
                camera_id,
                position,
            }),
            _ => None,
        }
    }

    /// Enters the rotation sub-mode on an existing camera.
    pub fn grab_rotation_handle(&mut self, camera_id: String, current: Rotation) -> bool {
        if !matches!(self.phase, StreamPhase::Idle) {
            return false;
        }
        self.phase = StreamPhase::Rotating {
            camera_id,
            rotation: current,
        };
        self.last_update = None;
        true
    }

    /// Aims the camera along `dir` (from the camera toward the handle).
    /// Yaw and pitch follow the direction; roll is pinned to zero.
    pub fn rotate_drag(&mut self, dir: Vec3, now: Instant) -> Option<PlacementRequest> {
        let StreamPhase::Rotating {
            camera_id,
            rotation,
        } = &mut self.phase
        else {
            return None;
        };

        let len = dir.length();
        if len <= f32::EPSILON {
            return None;
        }
        rotation.yaw = dir.x.atan2(dir.z);
        rotation.pitch = -(dir.y / len).asin();
        rotation.roll = 0.0;

        let request = PlacementRequest::Rotate {
            camera_id: camera_id.clone(),
            rotation: *rotation,
        };
        if !self.throttle_elapsed(now) {
            return None;
        }
        self.last_update = Some(now);
        Some(request)
    }

    /// Ends the rotation gesture. Emits the final rotation and the instant
    /// until which the snapshot cache should keep showing it locally, so the
    /// camera does not snap back while the server echo is in flight.
    pub fn release_rotation(&mut self, now: Instant) -> Option<(PlacementRequest, Instant)> {
        let phase = std::mem::replace(&mut self.phase, StreamPhase::Idle);
        match phase {
            StreamPhase::Rotating {
                camera_id,
                rotation,
            } => Some((
                PlacementRequest::Rotate {
                    camera_id,
                    rotation,
                },
                now + ROTATION_HOLD,
            )),
            _ => None,
        }
    }

    /// Aborts whatever gesture is active without emitting anything.
    pub fn cancel(&mut self) {
        self.phase = StreamPhase::Idle;
    }

    fn throttle_elapsed(&self, now: Instant) -> bool {
        match self.last_update {
            Some(last) => now.duration_since(last) >= DRAG_UPDATE_INTERVAL,
            None => true,
        }
    }
}

impl Default for StreamPlacer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::TypeStatsPayload;

    fn stats(stream_count: u32, stream_limit: u32) -> StatsPayload {
        StatsPayload {
            security: TypeStatsPayload { count: 0, limit: 5 },
            stream: TypeStatsPayload {
                count: stream_count,
                limit: stream_limit,
            },
        }
    }

    fn v(x: f32, y: f32, z: f32) -> Vec3 {
        Vec3 { x, y, z }
    }

    #[test]
    fn when_the_stream_limit_is_reached_then_the_palette_grab_is_refused() {
        let mut placer = StreamPlacer::new();
        assert!(!placer.grab_from_palette(&stats(5, 5), Vec3::ZERO));
        assert_eq!(*placer.phase(), StreamPhase::Idle);
    }

    #[test]
    fn when_a_new_grab_is_released_then_a_create_with_level_rotation_is_emitted() {
        let mut placer = StreamPlacer::new();
        let now = Instant::now();
        assert!(placer.grab_from_palette(&stats(0, 5), Vec3::ZERO));
        placer.drag(v(1.0, 2.0, 3.0), now);

        match placer.release(now) {
            Some(PlacementRequest::Create {
                camera_type,
                position,
                rotation,
                held,
            }) => {
                assert_eq!(camera_type, CameraType::Stream);
                assert_eq!(position, v(1.0, 2.0, 3.0));
                assert_eq!(rotation, Rotation::LEVEL);
                assert!(!held);
            }
            other => panic!("expected create, got {other:?}"),
        }
    }

    #[test]
    fn when_dragging_a_new_grab_then_no_move_updates_are_streamed() {
        let mut placer = StreamPlacer::new();
        let now = Instant::now();
        placer.grab_from_palette(&stats(0, 5), Vec3::ZERO);
        assert!(placer.drag(v(1.0, 0.0, 0.0), now).is_none());
        assert!(placer.drag(v(2.0, 0.0, 0.0), now + Duration::from_secs(1)).is_none());
    }

    #[test]
    fn when_dragging_an_existing_camera_then_updates_are_throttled() {
        let mut placer = StreamPlacer::new();
        let t0 = Instant::now();
        placer.grab_existing("cam_3".to_string(), Vec3::ZERO);

        // First update goes straight out.
        assert!(placer.drag(v(1.0, 0.0, 0.0), t0).is_some());
        // 40ms later: suppressed.
        assert!(placer.drag(v(2.0, 0.0, 0.0), t0 + Duration::from_millis(40)).is_none());
        // 120ms later: allowed again.
        let update = placer.drag(v(3.0, 0.0, 0.0), t0 + Duration::from_millis(120));
        match update {
            Some(PlacementRequest::Move {
                camera_id,
                position,
            }) => {
                assert_eq!(camera_id, "cam_3");
                assert_eq!(position, v(3.0, 0.0, 0.0));
            }
            other => panic!("expected move, got {other:?}"),
        }
    }

    #[test]
    fn when_releasing_mid_throttle_then_the_final_position_still_goes_out() {
        let mut placer = StreamPlacer::new();
        let t0 = Instant::now();
        placer.grab_existing("cam_3".to_string(), Vec3::ZERO);
        placer.drag(v(1.0, 0.0, 0.0), t0);
        // Throttled drag updates the local position anyway.
        placer.drag(v(5.0, 0.0, 0.0), t0 + Duration::from_millis(10));

        match placer.release(t0 + Duration::from_millis(20)) {
            Some(PlacementRequest::Move { position, .. }) => {
                assert_eq!(position, v(5.0, 0.0, 0.0));
            }
            other => panic!("expected move, got {other:?}"),
        }
    }

    #[test]
    fn when_rotating_then_yaw_and_pitch_follow_the_aim_and_roll_stays_zero() {
        let mut placer = StreamPlacer::new();
        let now = Instant::now();
        placer.grab_rotation_handle("cam_1".to_string(), Rotation::LEVEL);

        // Aim 45 degrees up along +z.
        let update = placer.rotate_drag(v(0.0, 1.0, 1.0), now);
        match update {
            Some(PlacementRequest::Rotate { rotation, .. }) => {
                assert!((rotation.yaw - 0.0).abs() < 1e-5);
                assert!((rotation.pitch + std::f32::consts::FRAC_PI_4).abs() < 1e-5);
                assert_eq!(rotation.roll, 0.0);
            }
            other => panic!("expected rotate, got {other:?}"),
        }
    }

    #[test]
    fn when_the_rotation_is_released_then_a_hold_deadline_accompanies_it() {
        let mut placer = StreamPlacer::new();
        let now = Instant::now();
        placer.grab_rotation_handle("cam_1".to_string(), Rotation::LEVEL);
        placer.rotate_drag(v(1.0, 0.0, 0.0), now);

        let (request, hold_until) = placer
            .release_rotation(now)
            .expect("release should emit the final rotation");
        match request {
            PlacementRequest::Rotate { camera_id, .. } => assert_eq!(camera_id, "cam_1"),
            other => panic!("expected rotate, got {other:?}"),
        }
        assert_eq!(hold_until, now + ROTATION_HOLD);
    }

    #[test]
    fn when_a_gesture_is_cancelled_then_nothing_is_emitted() {
        let mut placer = StreamPlacer::new();
        placer.grab_existing("cam_2".to_string(), Vec3::ZERO);
        placer.cancel();
        assert_eq!(*placer.phase(), StreamPhase::Idle);
        assert!(placer.release(Instant::now()).is_none());
    }

    #[test]
    fn when_a_degenerate_aim_direction_is_fed_then_it_is_ignored() {
        let mut placer = StreamPlacer::new();
        placer.grab_rotation_handle("cam_1".to_string(), Rotation::LEVEL);
        assert!(placer.rotate_drag(Vec3::ZERO, Instant::now()).is_none());
    }
}
