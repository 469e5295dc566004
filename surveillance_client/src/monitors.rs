// Monitor surfaces: display bindings from cameras to in-world screens.
//
// Monitor ids are derived from the room cell and slot index, so a binding
// issued by the server keeps pointing at the same physical screen even after
// the client rebuilds the scene for unrelated world changes.

use crate::feeds::{FeedRenderer, RenderTarget};
use crate::protocol::{Rotation, Vec3};
use tracing::debug;

// Physical spacing between adjacent screens, world units.
const MONITOR_SPACING: f32 = 0.62;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorLayout {
    /// Single horizontal row.
    Row,
    /// Wrapping grid with a fixed column count.
    Grid { columns: u32 },
}

/// What a monitor currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorImage {
    /// Live texture of the named camera's feed.
    Feed { camera_id: String },
    /// Procedural static noise; shown when nothing usable is bound.
    NoSignal,
}

#[derive(Debug, Clone)]
pub struct Monitor {
    pub id: String,
    pub position: Vec3,
    pub rotation: Rotation,
    pub bound_camera: Option<String>,
    pub image: MonitorImage,
}

pub struct MonitorBank {
    monitors: Vec<Monitor>,
    no_signal: RenderTarget,
}

impl MonitorBank {
    pub fn new() -> Self {
        Self {
            monitors: Vec::new(),
            no_signal: noise_texture(160, 90),
        }
    }

    /// Creates `count` monitors anchored at `position`. Ids are
    /// `monitor_<cellX>_<cellZ>_<index>`; re-creating for the same cell
    /// yields identical ids and preserves existing bindings.
    pub fn create_monitors(
        &mut self,
        position: Vec3,
        rotation: Rotation,
        count: u32,
        layout: MonitorLayout,
        room_cell: (i32, i32),
    ) {
        let (cell_x, cell_z) = room_cell;
        for index in 0..count {
            let id = format!("monitor_{cell_x}_{cell_z}_{index}");
            if self.monitors.iter().any(|m| m.id == id) {
                // Scene rebuild: the monitor already exists, keep its binding.
                continue;
            }

            let (col, row) = match layout {
                MonitorLayout::Row => (index, 0),
                MonitorLayout::Grid { columns } => {
                    let columns = columns.max(1);
                    (index % columns, index / columns)
                }
            };
            let offset = Vec3 {
                x: col as f32 * MONITOR_SPACING,
                y: row as f32 * MONITOR_SPACING,
                z: 0.0,
            };

            debug!(monitor_id = %id, "monitor created");
            self.monitors.push(Monitor {
                id,
                position: position.plus(offset),
                rotation,
                bound_camera: None,
                image: MonitorImage::NoSignal,
            });
        }
    }

    /// Binds a camera (or clears the binding with None) and swaps the
    /// displayed image in the same call. An unavailable feed shows static
    /// noise rather than a stale frame.
    pub fn bind(&mut self, monitor_id: &str, camera_id: Option<String>, feeds: &FeedRenderer) -> bool {
        match self.monitors.iter_mut().find(|m| m.id == monitor_id) {
            Some(monitor) => {
                monitor.image = resolve_image(camera_id.as_deref(), feeds);
                monitor.bound_camera = camera_id;
                true
            }
            None => false,
        }
    }

    /// Re-pulls every monitor's texture from current feed state. A feed that
    /// was briefly unavailable heals back to live automatically.
    pub fn refresh_all(&mut self, feeds: &FeedRenderer) {
        for monitor in &mut self.monitors {
            monitor.image = resolve_image(monitor.bound_camera.as_deref(), feeds);
        }
    }

    pub fn image_of(&self, monitor_id: &str) -> Option<&MonitorImage> {
        self.monitors
            .iter()
            .find(|m| m.id == monitor_id)
            .map(|m| &m.image)
    }

    pub fn monitors(&self) -> &[Monitor] {
        &self.monitors
    }

    pub fn no_signal_texture(&self) -> &RenderTarget {
        &self.no_signal
    }
}

impl Default for MonitorBank {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_image(camera_id: Option<&str>, feeds: &FeedRenderer) -> MonitorImage {
    match camera_id {
        Some(id) if feeds.texture_of(id).is_some() => MonitorImage::Feed {
            camera_id: id.to_string(),
        },
        _ => MonitorImage::NoSignal,
    }
}

/// Deterministic static-noise texture. Same seed, same picture, every run.
fn noise_texture(width: u32, height: u32) -> RenderTarget {
    let mut target = RenderTarget::new(width, height);
    let mut state: u64 = 0x5eed_cafe_f00d_beef;
    for pixel in target.pixels_mut().chunks_exact_mut(4) {
        // xorshift64
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let level = (state >> 56) as u8;
        pixel[0] = level;
        pixel[1] = level;
        pixel[2] = level;
        pixel[3] = 0xff;
    }
    target
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::QualityPreset;
    use crate::protocol::{CameraState, CameraType, Owner};

    fn bank_with_row(count: u32) -> MonitorBank {
        let mut bank = MonitorBank::new();
        bank.create_monitors(
            Vec3::ZERO,
            Rotation::LEVEL,
            count,
            MonitorLayout::Row,
            (3, -2),
        );
        bank
    }

    #[test]
    fn when_creating_monitors_then_ids_encode_cell_and_index() {
        let bank = bank_with_row(3);
        let ids: Vec<&str> = bank.monitors().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["monitor_3_-2_0", "monitor_3_-2_1", "monitor_3_-2_2"]);
    }

    #[test]
    fn when_the_scene_rebuilds_then_ids_and_bindings_survive() {
        let mut bank = bank_with_row(2);
        let feeds = FeedRenderer::new(QualityPreset::Low);
        assert!(bank.bind("monitor_3_-2_1", Some("cam_5".to_string()), &feeds));

        // Same cell re-created, e.g. after an unrelated world change.
        bank.create_monitors(
            Vec3::ZERO,
            Rotation::LEVEL,
            2,
            MonitorLayout::Row,
            (3, -2),
        );

        assert_eq!(bank.monitors().len(), 2);
        let rebound = bank
            .monitors()
            .iter()
            .find(|m| m.id == "monitor_3_-2_1")
            .expect("monitor should survive rebuild");
        assert_eq!(rebound.bound_camera.as_deref(), Some("cam_5"));
    }

    #[test]
    fn when_binding_an_unknown_monitor_then_bind_reports_failure() {
        let mut bank = bank_with_row(1);
        let feeds = FeedRenderer::new(QualityPreset::Low);
        assert!(!bank.bind("monitor_9_9_0", Some("cam_1".to_string()), &feeds));
    }

    #[test]
    fn when_binding_a_live_feed_then_the_image_swaps_immediately() {
        let mut bank = bank_with_row(1);
        let mut feeds = FeedRenderer::new(QualityPreset::Low);
        feeds.ensure_feed(&CameraState {
            id: "cam_1".to_string(),
            camera_type: CameraType::Security,
            owner: Owner::Player { id: 1 },
            position: Vec3::ZERO,
            rotation: Rotation::LEVEL,
        });

        // No refresh needed: bind itself resolves the texture.
        assert!(bank.bind("monitor_3_-2_0", Some("cam_1".to_string()), &feeds));
        assert_eq!(
            bank.image_of("monitor_3_-2_0"),
            Some(&MonitorImage::Feed {
                camera_id: "cam_1".to_string()
            })
        );

        // Clearing the binding swaps back to noise immediately too.
        assert!(bank.bind("monitor_3_-2_0", None, &feeds));
        assert_eq!(
            bank.image_of("monitor_3_-2_0"),
            Some(&MonitorImage::NoSignal)
        );
    }

    #[test]
    fn when_no_feed_is_available_then_the_monitor_falls_back_to_noise() {
        let mut bank = bank_with_row(1);
        let feeds = FeedRenderer::new(QualityPreset::Low);

        bank.bind("monitor_3_-2_0", Some("cam_1".to_string()), &feeds);
        assert_eq!(
            bank.image_of("monitor_3_-2_0"),
            Some(&MonitorImage::NoSignal)
        );
    }

    #[test]
    fn when_the_feed_becomes_live_then_refresh_heals_the_monitor() {
        let mut bank = bank_with_row(1);
        let mut feeds = FeedRenderer::new(QualityPreset::Low);

        bank.bind("monitor_3_-2_0", Some("cam_1".to_string()), &feeds);
        assert_eq!(
            bank.image_of("monitor_3_-2_0"),
            Some(&MonitorImage::NoSignal)
        );

        feeds.ensure_feed(&CameraState {
            id: "cam_1".to_string(),
            camera_type: CameraType::Security,
            owner: Owner::Player { id: 1 },
            position: Vec3::ZERO,
            rotation: Rotation::LEVEL,
        });
        bank.refresh_all(&feeds);
        assert_eq!(
            bank.image_of("monitor_3_-2_0"),
            Some(&MonitorImage::Feed {
                camera_id: "cam_1".to_string()
            })
        );
    }

    #[test]
    fn when_generating_the_noise_texture_then_it_is_deterministic_and_opaque() {
        let a = noise_texture(8, 8);
        let b = noise_texture(8, 8);
        assert_eq!(a.pixels(), b.pixels());
        assert!(a.pixels().chunks_exact(4).all(|p| p[3] == 0xff));
        // Actual noise, not a flat fill.
        let first = a.pixels()[0];
        assert!(a.pixels().chunks_exact(4).any(|p| p[0] != first));
    }

    #[test]
    fn when_using_a_grid_layout_then_rows_wrap_at_the_column_count() {
        let mut bank = MonitorBank::new();
        bank.create_monitors(
            Vec3::ZERO,
            Rotation::LEVEL,
            4,
            MonitorLayout::Grid { columns: 2 },
            (0, 0),
        );
        let monitors = bank.monitors();
        assert_eq!(monitors[2].position.y, MONITOR_SPACING);
        assert_eq!(monitors[2].position.x, 0.0);
        assert_eq!(monitors[3].position.x, MONITOR_SPACING);
    }
}
