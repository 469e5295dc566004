// Camera registry: owns camera entities and enforces per-type count limits.

use super::camera::{
    Camera, CameraSnapshot, CameraType, Owner, Resolution, Rotation, Vec3, current_epoch_seconds,
};

// Limits are clamped into this range regardless of what callers request.
const MIN_LIMIT: u32 = 1;
const MAX_LIMIT: u32 = 20;
pub const DEFAULT_LIMIT: u32 = 5;

// Default intrinsic resolutions per camera class (internal only).
const SECURITY_RESOLUTION: Resolution = Resolution {
    width: 640,
    height: 480,
};
const STREAM_RESOLUTION: Resolution = Resolution {
    width: 1280,
    height: 720,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub security: u32,
    pub stream: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeStats {
    pub count: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub security: TypeStats,
    pub stream: TypeStats,
}

pub struct CameraRegistry {
    cameras: Vec<Camera>,
    limits: Limits,
    // Next numeric id; ids are never reused, even after removal.
    next_id: u64,
}

impl CameraRegistry {
    pub fn new() -> Self {
        Self {
            cameras: Vec::new(),
            limits: Limits {
                security: DEFAULT_LIMIT,
                stream: DEFAULT_LIMIT,
            },
            next_id: 1,
        }
    }

    /// Creates a camera if the per-type limit allows it.
    ///
    /// Stream cameras are stored with roll forced to zero so the invariant
    /// never depends on caller discipline.
    pub fn create(
        &mut self,
        camera_type: CameraType,
        position: Vec3,
        mut rotation: Rotation,
        owner: Owner,
    ) -> Option<CameraSnapshot> {
        if self.count(camera_type) >= self.limit(camera_type) {
            return None;
        }

        if camera_type == CameraType::Stream {
            rotation.roll = 0.0;
        }

        let id = format!("cam_{}", self.next_id);
        self.next_id += 1;

        let resolution = match camera_type {
            CameraType::Security => SECURITY_RESOLUTION,
            CameraType::Stream => STREAM_RESOLUTION,
        };

        let camera = Camera {
            id,
            camera_type,
            owner,
            position,
            rotation,
            resolution,
            created_at: current_epoch_seconds(),
        };
        let snapshot = CameraSnapshot::from(&camera);
        self.cameras.push(camera);
        Some(snapshot)
    }

    /// Removes a camera. Unknown ids are a no-op because removal races with
    /// disconnect cleanup are expected.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.cameras.len();
        self.cameras.retain(|c| c.id != id);
        self.cameras.len() != before
    }

    pub fn update_position(&mut self, id: &str, position: Vec3) -> bool {
        match self.cameras.iter_mut().find(|c| c.id == id) {
            Some(camera) => {
                camera.position = position;
                true
            }
            None => false,
        }
    }

    pub fn update_rotation(&mut self, id: &str, mut rotation: Rotation) -> bool {
        match self.cameras.iter_mut().find(|c| c.id == id) {
            Some(camera) => {
                if camera.camera_type == CameraType::Stream {
                    rotation.roll = 0.0;
                }
                camera.rotation = rotation;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Camera> {
        self.cameras.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn by_type(&self, camera_type: CameraType) -> Vec<CameraSnapshot> {
        self.cameras
            .iter()
            .filter(|c| c.camera_type == camera_type)
            .map(CameraSnapshot::from)
            .collect()
    }

    pub fn all(&self) -> Vec<CameraSnapshot> {
        self.cameras.iter().map(CameraSnapshot::from).collect()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            security: TypeStats {
                count: self.count(CameraType::Security),
                limit: self.limits.security,
            },
            stream: TypeStats {
                count: self.count(CameraType::Stream),
                limit: self.limits.stream,
            },
        }
    }

    /// Clamps each limit into the allowed range before storing it.
    pub fn set_limits(&mut self, security: u32, stream: u32) -> Limits {
        self.limits = Limits {
            security: security.clamp(MIN_LIMIT, MAX_LIMIT),
            stream: stream.clamp(MIN_LIMIT, MAX_LIMIT),
        };
        self.limits
    }

    pub fn get_limits(&self) -> Limits {
        self.limits
    }

    /// Removes every camera owned or held by the participant and returns the
    /// removed ids. Idempotent: a second call finds nothing.
    pub fn cleanup_for_owner(&mut self, participant: u64) -> Vec<String> {
        let mut removed = Vec::new();
        self.cameras.retain(|c| {
            if c.owner.participant() == Some(participant) {
                removed.push(c.id.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    fn count(&self, camera_type: CameraType) -> u32 {
        self.cameras
            .iter()
            .filter(|c| c.camera_type == camera_type)
            .count() as u32
    }

    fn limit(&self, camera_type: CameraType) -> u32 {
        match camera_type {
            CameraType::Security => self.limits.security,
            CameraType::Stream => self.limits.stream,
        }
    }
}

impl Default for CameraRegistry {
    fn default() -> Self {
        Self::new()
    }
}
