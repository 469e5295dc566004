// Read-only projection of the server's camera set.
//
// Snapshots apply wholesale, except for rotation holds: a camera whose local
// rotate gesture just finished keeps its locally applied rotation until the
// cooldown elapses, so an authoritative snapshot that has not yet caught up
// with the sent update cannot cause a visible snap-back.

use crate::protocol::{CameraState, SnapshotPayload};
use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, Default)]
pub struct AppliedSnapshot {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

pub struct SnapshotCache {
    cameras: HashMap<String, CameraState>,
    revision: u64,
    // Camera id -> hold expiry for the rotation snap-back cooldown.
    rotation_holds: HashMap<String, Instant>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self {
            cameras: HashMap::new(),
            revision: 0,
            rotation_holds: HashMap::new(),
        }
    }

    /// Applies an authoritative snapshot and reports which cameras appeared
    /// or disappeared so feeds can be created and torn down in the same step.
    pub fn apply(&mut self, snapshot: SnapshotPayload, now: Instant) -> AppliedSnapshot {
        // Stale broadcasts can arrive after a reconnect; never go backwards.
        if snapshot.revision <= self.revision && self.revision != 0 {
            return AppliedSnapshot::default();
        }
        self.revision = snapshot.revision;

        self.rotation_holds.retain(|_, until| *until > now);

        let mut applied = AppliedSnapshot::default();
        let mut incoming: HashMap<String, CameraState> = snapshot
            .cameras
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();

        self.cameras.retain(|id, _| {
            if incoming.contains_key(id) {
                true
            } else {
                applied.removed.push(id.clone());
                false
            }
        });

        for (id, mut camera) in incoming.drain() {
            match self.cameras.get_mut(&id) {
                Some(existing) => {
                    if self.rotation_holds.contains_key(&id) {
                        // Keep the locally applied rotation during the hold.
                        camera.rotation = existing.rotation;
                    }
                    *existing = camera;
                }
                None => {
                    applied.added.push(id.clone());
                    self.cameras.insert(id, camera);
                }
            }
        }
        applied
    }

    /// Suppresses authoritative rotation for a camera until `until`.
    pub fn hold_rotation(&mut self, camera_id: &str, until: Instant) {
        self.rotation_holds.insert(camera_id.to_string(), until);
    }

    /// Locally applies a just-sent rotation so the gesture looks immediate.
    pub fn apply_local_rotation(&mut self, camera_id: &str, rotation: crate::protocol::Rotation) {
        if let Some(camera) = self.cameras.get_mut(camera_id) {
            camera.rotation = rotation;
        }
    }

    pub fn get(&self, camera_id: &str) -> Option<&CameraState> {
        self.cameras.get(camera_id)
    }

    pub fn contains(&self, camera_id: &str) -> bool {
        self.cameras.contains_key(camera_id)
    }

    pub fn cameras(&self) -> impl Iterator<Item = &CameraState> {
        self.cameras.values()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{CameraType, Owner, Rotation, Vec3};
    use std::time::Duration;

    fn camera(id: &str, yaw: f32) -> CameraState {
        CameraState {
            id: id.to_string(),
            camera_type: CameraType::Stream,
            owner: Owner::Player { id: 1 },
            position: Vec3::ZERO,
            rotation: Rotation {
                pitch: 0.0,
                yaw,
                roll: 0.0,
            },
        }
    }

    fn snapshot(revision: u64, cameras: Vec<CameraState>) -> SnapshotPayload {
        SnapshotPayload { revision, cameras }
    }

    #[test]
    fn when_cameras_appear_and_disappear_then_apply_reports_both() {
        let mut cache = SnapshotCache::new();
        let now = Instant::now();

        let first = cache.apply(snapshot(1, vec![camera("cam_1", 0.0)]), now);
        assert_eq!(first.added, vec!["cam_1".to_string()]);
        assert!(first.removed.is_empty());

        let second = cache.apply(snapshot(2, vec![camera("cam_2", 0.0)]), now);
        assert_eq!(second.added, vec!["cam_2".to_string()]);
        assert_eq!(second.removed, vec!["cam_1".to_string()]);
        assert!(!cache.contains("cam_1"));
        assert!(cache.contains("cam_2"));
    }

    #[test]
    fn when_a_stale_snapshot_arrives_then_it_is_ignored() {
        let mut cache = SnapshotCache::new();
        let now = Instant::now();
        cache.apply(snapshot(5, vec![camera("cam_1", 1.0)]), now);

        let stale = cache.apply(snapshot(4, vec![]), now);
        assert!(stale.removed.is_empty());
        assert!(cache.contains("cam_1"));
        assert_eq!(cache.revision(), 5);
    }

    #[test]
    fn when_a_rotation_hold_is_active_then_authoritative_rotation_is_suppressed() {
        let mut cache = SnapshotCache::new();
        let now = Instant::now();
        cache.apply(snapshot(1, vec![camera("cam_1", 0.0)]), now);

        // Gesture ends: rotation applied locally, hold started.
        cache.apply_local_rotation(
            "cam_1",
            Rotation {
                pitch: 0.0,
                yaw: 2.0,
                roll: 0.0,
            },
        );
        cache.hold_rotation("cam_1", now + Duration::from_millis(500));

        // A snapshot that predates the sent update must not snap back.
        cache.apply(snapshot(2, vec![camera("cam_1", 0.0)]), now);
        assert_eq!(cache.get("cam_1").expect("camera").rotation.yaw, 2.0);

        // After the hold expires the authoritative value wins again.
        let later = now + Duration::from_secs(1);
        cache.apply(snapshot(3, vec![camera("cam_1", 2.0)]), later);
        assert_eq!(cache.get("cam_1").expect("camera").rotation.yaw, 2.0);
        let final_state = cache.apply(snapshot(4, vec![camera("cam_1", 0.5)]), later);
        assert!(final_state.added.is_empty());
        assert_eq!(cache.get("cam_1").expect("camera").rotation.yaw, 0.5);
    }

    #[test]
    fn when_position_changes_during_a_rotation_hold_then_position_still_applies() {
        let mut cache = SnapshotCache::new();
        let now = Instant::now();
        cache.apply(snapshot(1, vec![camera("cam_1", 0.0)]), now);
        cache.apply_local_rotation(
            "cam_1",
            Rotation {
                pitch: 0.0,
                yaw: 2.0,
                roll: 0.0,
            },
        );
        cache.hold_rotation("cam_1", now + Duration::from_millis(500));

        let mut moved = camera("cam_1", 0.0);
        moved.position = Vec3 {
            x: 3.0,
            y: 0.0,
            z: 0.0,
        };
        cache.apply(snapshot(2, vec![moved]), now);

        let state = cache.get("cam_1").expect("camera");
        assert_eq!(state.position.x, 3.0);
        assert_eq!(state.rotation.yaw, 2.0);
    }
}
