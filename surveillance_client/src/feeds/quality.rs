// Feed quality presets: render resolution plus the feed loop frame rate.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityPreset {
    Low,
    Medium,
    High,
}

impl QualityPreset {
    /// Base render-target size before per-camera aspect correction.
    pub fn resolution(self) -> (u32, u32) {
        match self {
            QualityPreset::Low => (320, 180),
            QualityPreset::Medium => (640, 360),
            QualityPreset::High => (960, 540),
        }
    }

    pub fn fps(self) -> u32 {
        match self {
            QualityPreset::Low => 10,
            QualityPreset::Medium => 15,
            QualityPreset::High => 30,
        }
    }

    /// Minimum interval between feed render passes.
    pub fn frame_interval(self) -> Duration {
        Duration::from_millis(1000 / self.fps() as u64)
    }

    pub fn parse(value: &str) -> Option<QualityPreset> {
        match value {
            "low" => Some(QualityPreset::Low),
            "medium" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }
}
