// Per-camera render-to-texture pipeline: quality presets, targets, the
// scene seam, and the throttled renderer.

pub mod quality;
pub mod renderer;
pub mod scene;
pub mod target;

pub use quality::QualityPreset;
pub use renderer::{FeedRenderer, FeedStats};
pub use scene::{FeedView, Scene, SceneEntity, VisibilityScope};
pub use target::RenderTarget;
