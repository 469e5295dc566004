// Use cases layer: application workflows for the surveillance server.

pub mod surveillance;
pub mod types;

pub use surveillance::{SurveillanceWorld, surveillance_task};
pub use types::{CameraCommand, SurveillanceUpdate};
