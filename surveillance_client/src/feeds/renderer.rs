// Feed renderer: one render target + virtual camera per live camera entity,
// driven by a throttled loop decoupled from the main frame rate.

use super::quality::QualityPreset;
use super::scene::{FeedView, Scene, SceneEntity, VisibilityScope};
use super::target::RenderTarget;
use crate::protocol::{CameraState, CameraType, Owner, Rotation, Vec3};
use crate::snapshot::SnapshotCache;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, warn};

// Vertical field of view per camera class, radians.
const SECURITY_FOV_Y: f32 = 1.2;
const STREAM_FOV_Y: f32 = 0.9;

struct Feed {
    camera_id: String,
    position: Vec3,
    rotation: Rotation,
    fov_y: f32,
    aspect: f32,
    target: RenderTarget,
}

/// Counters exposed for diagnostics and resource-discipline assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeedStats {
    pub live_feeds: usize,
    pub targets_allocated: u64,
    pub targets_disposed: u64,
    pub render_passes: u64,
}

pub struct FeedRenderer {
    // BTreeMap keeps pass order deterministic across runs.
    feeds: BTreeMap<String, Feed>,
    quality: QualityPreset,
    last_pass: Option<Instant>,
    targets_allocated: u64,
    targets_disposed: u64,
    render_passes: u64,
}

impl FeedRenderer {
    pub fn new(quality: QualityPreset) -> Self {
        Self {
            feeds: BTreeMap::new(),
            quality,
            last_pass: None,
            targets_allocated: 0,
            targets_disposed: 0,
            render_passes: 0,
        }
    }

    /// Creates the feed for a camera, or repositions it if one already
    /// exists. Never reallocates on repeat calls.
    pub fn ensure_feed(&mut self, camera: &CameraState) {
        if let Some(feed) = self.feeds.get_mut(&camera.id) {
            feed.position = camera.position;
            feed.rotation = camera.rotation;
            return;
        }

        let (fov_y, aspect) = intrinsics_for(camera.camera_type);
        let (width, height) = target_size(self.quality, aspect);
        self.targets_allocated += 1;
        debug!(camera_id = %camera.id, width, height, "feed created");
        self.feeds.insert(
            camera.id.clone(),
            Feed {
                camera_id: camera.id.clone(),
                position: camera.position,
                rotation: camera.rotation,
                fov_y,
                aspect,
                target: RenderTarget::new(width, height),
            },
        );
    }

    /// Renders every live feed, at most once per quality interval unless
    /// forced. Returns the number of passes actually rendered.
    ///
    /// Per camera: hide its own body, hide the carrier (if held), render,
    /// restore. The restore is scope-bound so a skipped or failed step can
    /// never bleed hidden entities into the next feed's picture.
    pub fn render_all(
        &mut self,
        scene: &mut dyn Scene,
        cache: &SnapshotCache,
        now: Instant,
        force: bool,
    ) -> u32 {
        if !force {
            if let Some(last) = self.last_pass {
                if now.duration_since(last) < self.quality.frame_interval() {
                    return 0;
                }
            }
        }
        self.last_pass = Some(now);

        let mut passes = 0;
        for feed in self.feeds.values_mut() {
            // A feed whose entity vanished mid-step renders nothing; teardown
            // happens in the same snapshot-apply step that removed it.
            let Some(camera) = cache.get(&feed.camera_id) else {
                continue;
            };
            feed.position = camera.position;
            feed.rotation = camera.rotation;

            let mut scope = VisibilityScope::new(scene);
            // A camera must never see itself.
            if !scope.hide(SceneEntity::CameraBody(feed.camera_id.clone())) {
                warn!(camera_id = %feed.camera_id, "camera body missing from scene");
            }
            if let Owner::HeldBy { id: carrier } = camera.owner {
                // Carrier pieces may already be gone; skip what is missing
                // and keep rendering.
                scope.hide(SceneEntity::ParticipantBody(carrier));
                scope.hide(SceneEntity::HeldItem(carrier));
                scope.hide(SceneEntity::NameLabel(carrier));
            }

            let view = FeedView {
                camera_id: feed.camera_id.clone(),
                position: feed.position,
                rotation: feed.rotation,
                fov_y: feed.fov_y,
                aspect: feed.aspect,
            };
            scope.render(&view, &mut feed.target);
            passes += 1;
        }
        self.render_passes += passes as u64;
        passes
    }

    pub fn texture_of(&self, camera_id: &str) -> Option<&RenderTarget> {
        self.feeds
            .get(camera_id)
            .map(|feed| &feed.target)
            .filter(|target| !target.is_disposed())
    }

    /// Switches quality: every live target is released exactly once and
    /// reallocated at the new resolution, preserving each feed's aspect.
    pub fn set_quality(&mut self, quality: QualityPreset) {
        if quality == self.quality {
            return;
        }
        self.quality = quality;
        for feed in self.feeds.values_mut() {
            if feed.target.dispose() {
                self.targets_disposed += 1;
            }
            let (width, height) = target_size(quality, feed.aspect);
            feed.target = RenderTarget::new(width, height);
            self.targets_allocated += 1;
        }
        // Render promptly at the new resolution.
        self.last_pass = None;
    }

    /// Tears down one feed, releasing its target in the same step.
    pub fn dispose_feed(&mut self, camera_id: &str) -> bool {
        match self.feeds.remove(camera_id) {
            Some(mut feed) => {
                if feed.target.dispose() {
                    self.targets_disposed += 1;
                }
                debug!(camera_id, "feed disposed");
                true
            }
            None => false,
        }
    }

    pub fn dispose_all(&mut self) {
        let ids: Vec<String> = self.feeds.keys().cloned().collect();
        for id in ids {
            self.dispose_feed(&id);
        }
    }

    pub fn quality(&self) -> QualityPreset {
        self.quality
    }

    pub fn stats(&self) -> FeedStats {
        FeedStats {
            live_feeds: self.feeds.len(),
            targets_allocated: self.targets_allocated,
            targets_disposed: self.targets_disposed,
            render_passes: self.render_passes,
        }
    }
}

fn intrinsics_for(camera_type: CameraType) -> (f32, f32) {
    match camera_type {
        CameraType::Security => (SECURITY_FOV_Y, 4.0 / 3.0),
        CameraType::Stream => (STREAM_FOV_Y, 16.0 / 9.0),
    }
}

/// Target size for a preset, width corrected to the feed's aspect.
fn target_size(quality: QualityPreset, aspect: f32) -> (u32, u32) {
    let (_, height) = quality.resolution();
    let width = (height as f32 * aspect).round() as u32;
    (width.max(1), height.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SnapshotPayload;
    use std::collections::HashMap;
    use std::time::Duration;

    struct TestScene {
        visible: HashMap<SceneEntity, bool>,
        // Entities hidden at the moment of each render call, per pass.
        hidden_per_pass: Vec<Vec<SceneEntity>>,
    }

    impl TestScene {
        fn new(entities: Vec<SceneEntity>) -> Self {
            Self {
                visible: entities.into_iter().map(|e| (e, true)).collect(),
                hidden_per_pass: Vec::new(),
            }
        }

        fn all_visible(&self) -> bool {
            self.visible.values().all(|v| *v)
        }
    }

    impl Scene for TestScene {
        fn set_visible(&mut self, entity: &SceneEntity, visible: bool) -> bool {
            match self.visible.get_mut(entity) {
                Some(flag) => {
                    *flag = visible;
                    true
                }
                None => false,
            }
        }

        fn render(&mut self, _view: &FeedView, target: &mut RenderTarget) {
            assert!(!target.is_disposed(), "render into disposed target");
            let hidden = self
                .visible
                .iter()
                .filter(|(_, v)| !**v)
                .map(|(e, _)| e.clone())
                .collect();
            self.hidden_per_pass.push(hidden);
        }
    }

    fn camera(id: &str, owner: Owner) -> CameraState {
        CameraState {
            id: id.to_string(),
            camera_type: CameraType::Stream,
            owner,
            position: Vec3::ZERO,
            rotation: Rotation::LEVEL,
        }
    }

    fn cache_with(cameras: Vec<CameraState>) -> SnapshotCache {
        let mut cache = SnapshotCache::new();
        cache.apply(
            SnapshotPayload {
                revision: 1,
                cameras,
            },
            Instant::now(),
        );
        cache
    }

    #[test]
    fn when_ensure_feed_is_called_twice_then_no_second_target_is_allocated() {
        let mut renderer = FeedRenderer::new(QualityPreset::Medium);
        let cam = camera("cam_1", Owner::Player { id: 1 });
        renderer.ensure_feed(&cam);
        renderer.ensure_feed(&cam);
        assert_eq!(renderer.stats().targets_allocated, 1);
        assert_eq!(renderer.stats().live_feeds, 1);
    }

    #[test]
    fn when_rendering_then_each_camera_is_hidden_only_during_its_own_pass() {
        let cam_a = camera("cam_a", Owner::Player { id: 1 });
        let cam_b = camera("cam_b", Owner::Player { id: 1 });
        let mut scene = TestScene::new(vec![
            SceneEntity::CameraBody("cam_a".to_string()),
            SceneEntity::CameraBody("cam_b".to_string()),
        ]);
        let cache = cache_with(vec![cam_a.clone(), cam_b.clone()]);

        let mut renderer = FeedRenderer::new(QualityPreset::Medium);
        renderer.ensure_feed(&cam_a);
        renderer.ensure_feed(&cam_b);

        let passes = renderer.render_all(&mut scene, &cache, Instant::now(), true);
        assert_eq!(passes, 2);

        // Pass order is deterministic (sorted by id): cam_a then cam_b.
        assert_eq!(
            scene.hidden_per_pass[0],
            vec![SceneEntity::CameraBody("cam_a".to_string())]
        );
        assert_eq!(
            scene.hidden_per_pass[1],
            vec![SceneEntity::CameraBody("cam_b".to_string())]
        );
        assert!(scene.all_visible(), "flags must be restored after the pass");
    }

    #[test]
    fn when_a_camera_is_held_then_its_carrier_is_hidden_for_that_pass() {
        let held = camera("cam_1", Owner::HeldBy { id: 7 });
        let mut scene = TestScene::new(vec![
            SceneEntity::CameraBody("cam_1".to_string()),
            SceneEntity::ParticipantBody(7),
            SceneEntity::HeldItem(7),
            SceneEntity::NameLabel(7),
        ]);
        let cache = cache_with(vec![held.clone()]);

        let mut renderer = FeedRenderer::new(QualityPreset::Medium);
        renderer.ensure_feed(&held);
        renderer.render_all(&mut scene, &cache, Instant::now(), true);

        let hidden = &scene.hidden_per_pass[0];
        assert!(hidden.contains(&SceneEntity::ParticipantBody(7)));
        assert!(hidden.contains(&SceneEntity::HeldItem(7)));
        assert!(hidden.contains(&SceneEntity::NameLabel(7)));
        assert!(scene.all_visible());
    }

    #[test]
    fn when_the_carrier_is_missing_then_the_pass_still_renders() {
        let held = camera("cam_1", Owner::HeldBy { id: 7 });
        // Scene knows the camera body but none of the carrier entities.
        let mut scene = TestScene::new(vec![SceneEntity::CameraBody("cam_1".to_string())]);
        let cache = cache_with(vec![held.clone()]);

        let mut renderer = FeedRenderer::new(QualityPreset::Medium);
        renderer.ensure_feed(&held);
        let passes = renderer.render_all(&mut scene, &cache, Instant::now(), true);

        assert_eq!(passes, 1);
        assert!(scene.all_visible());
    }

    #[test]
    fn when_called_within_the_throttle_window_then_only_one_pass_renders() {
        let cam = camera("cam_1", Owner::Player { id: 1 });
        let mut scene = TestScene::new(vec![SceneEntity::CameraBody("cam_1".to_string())]);
        let cache = cache_with(vec![cam.clone()]);

        let mut renderer = FeedRenderer::new(QualityPreset::Medium);
        renderer.ensure_feed(&cam);

        let start = Instant::now();
        assert_eq!(renderer.render_all(&mut scene, &cache, start, false), 1);
        // 40ms later is inside the 15fps interval.
        let soon = start + Duration::from_millis(40);
        assert_eq!(renderer.render_all(&mut scene, &cache, soon, false), 0);
        // Forcing always renders.
        assert_eq!(renderer.render_all(&mut scene, &cache, soon, true), 1);
    }

    #[test]
    fn when_quality_changes_then_targets_are_released_once_and_resized() {
        let cam = camera("cam_1", Owner::Player { id: 1 });
        let mut renderer = FeedRenderer::new(QualityPreset::Medium);
        renderer.ensure_feed(&cam);

        let before = renderer
            .texture_of("cam_1")
            .expect("texture should exist")
            .height();
        assert_eq!(before, 360);

        renderer.set_quality(QualityPreset::High);
        let stats = renderer.stats();
        assert_eq!(stats.targets_disposed, 1);
        assert_eq!(stats.targets_allocated, 2);

        let target = renderer.texture_of("cam_1").expect("texture should exist");
        assert_eq!(target.height(), 540);
        // 16:9 aspect preserved.
        assert_eq!(target.width(), 960);
    }

    #[test]
    fn when_setting_the_same_quality_then_nothing_is_reallocated() {
        let cam = camera("cam_1", Owner::Player { id: 1 });
        let mut renderer = FeedRenderer::new(QualityPreset::Low);
        renderer.ensure_feed(&cam);
        renderer.set_quality(QualityPreset::Low);
        assert_eq!(renderer.stats().targets_disposed, 0);
        assert_eq!(renderer.stats().targets_allocated, 1);
    }

    #[test]
    fn when_a_feed_is_disposed_then_its_texture_is_gone() {
        let cam = camera("cam_1", Owner::Player { id: 1 });
        let mut renderer = FeedRenderer::new(QualityPreset::Medium);
        renderer.ensure_feed(&cam);

        assert!(renderer.dispose_feed("cam_1"));
        assert!(renderer.texture_of("cam_1").is_none());
        assert_eq!(renderer.stats().targets_disposed, 1);
        // Disposing again is a no-op.
        assert!(!renderer.dispose_feed("cam_1"));
        assert_eq!(renderer.stats().targets_disposed, 1);
    }

    #[test]
    fn when_security_and_stream_feeds_exist_then_aspects_differ() {
        let mut security = camera("cam_1", Owner::Player { id: 1 });
        security.camera_type = CameraType::Security;
        let stream = camera("cam_2", Owner::Player { id: 1 });

        let mut renderer = FeedRenderer::new(QualityPreset::Medium);
        renderer.ensure_feed(&security);
        renderer.ensure_feed(&stream);

        let sec = renderer.texture_of("cam_1").expect("security texture");
        let str_ = renderer.texture_of("cam_2").expect("stream texture");
        assert_eq!(sec.width(), 480); // 360 * 4/3
        assert_eq!(str_.width(), 640); // 360 * 16/9
    }
}
