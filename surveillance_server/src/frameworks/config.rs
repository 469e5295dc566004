use std::env;

// Runtime/server constants (not simulation tuning).

pub fn http_port() -> u16 {
    env::var("SURVEILLANCE_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3005)
}

pub const COMMAND_CHANNEL_CAPACITY: usize = 1024;
pub const SNAPSHOT_BROADCAST_CAPACITY: usize = 128;
