// Domain layer: camera entities, locks, and viewer routing rules.

pub mod camera;
pub mod locks;
pub mod registry;
pub mod viewers;

pub use camera::{Camera, CameraSnapshot, CameraType, Owner, Resolution, Rotation, Vec3};
pub use locks::AdjustmentLocks;
pub use registry::{CameraRegistry, Limits, RegistryStats, TypeStats};
pub use viewers::ViewerRouter;
