// Scene seam for feed rendering, plus the scoped visibility override.
//
// The renderer never toggles visibility flags directly: every hide goes
// through a `VisibilityScope` that restores the flags when it drops, so no
// exit path (including an early return mid-pass) can leak a hidden entity
// into the next camera's picture.

use super::target::RenderTarget;
use crate::protocol::{Rotation, Vec3};

/// Entities the feed renderer may need to hide for a single render pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SceneEntity {
    /// A camera's own visual representation.
    CameraBody(String),
    /// A carrier's avatar body.
    ParticipantBody(u64),
    /// The item the carrier is holding (the camera itself, usually).
    HeldItem(u64),
    /// The carrier's floating name label.
    NameLabel(u64),
}

/// Virtual-camera parameters for one feed render pass.
#[derive(Debug, Clone)]
pub struct FeedView {
    pub camera_id: String,
    pub position: Vec3,
    pub rotation: Rotation,
    pub fov_y: f32,
    pub aspect: f32,
}

/// What the renderer needs from the world: visibility toggles and the actual
/// draw. Implementations decide what rendering means (GPU, software, tests).
pub trait Scene {
    /// Sets an entity's visibility. Returns false when the entity does not
    /// exist; the caller skips that hide/restore step and continues.
    fn set_visible(&mut self, entity: &SceneEntity, visible: bool) -> bool;

    /// Renders the scene through the given view into the target.
    fn render(&mut self, view: &FeedView, target: &mut RenderTarget);
}

/// Stack-scoped visibility override. Hides entities on request and restores
/// every successfully hidden one, in reverse order, when dropped.
pub struct VisibilityScope<'a> {
    scene: &'a mut dyn Scene,
    hidden: Vec<SceneEntity>,
}

impl<'a> VisibilityScope<'a> {
    pub fn new(scene: &'a mut dyn Scene) -> Self {
        Self {
            scene,
            hidden: Vec::new(),
        }
    }

    /// Hides an entity for the lifetime of the scope. A missing entity is
    /// not an error; it is simply skipped.
    pub fn hide(&mut self, entity: SceneEntity) -> bool {
        if self.scene.set_visible(&entity, false) {
            self.hidden.push(entity);
            true
        } else {
            false
        }
    }

    /// Renders through the underlying scene while the overrides are active.
    pub fn render(&mut self, view: &FeedView, target: &mut RenderTarget) {
        self.scene.render(view, target);
    }
}

impl Drop for VisibilityScope<'_> {
    fn drop(&mut self) {
        while let Some(entity) = self.hidden.pop() {
            self.scene.set_visible(&entity, true);
        }
    }
}
