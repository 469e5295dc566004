use crate::feeds::QualityPreset;

/// WebSocket endpoint of the surveillance server.
pub fn server_url() -> String {
    std::env::var("SURVEILLANCE_SERVER_URL")
        .unwrap_or_else(|_| "ws://127.0.0.1:3005/ws".to_string())
}

/// Initial feed quality preset; falls back to medium on unknown values.
pub fn feed_quality() -> QualityPreset {
    std::env::var("SURVEILLANCE_FEED_QUALITY")
        .ok()
        .and_then(|raw| QualityPreset::parse(&raw))
        .unwrap_or(QualityPreset::Medium)
}
