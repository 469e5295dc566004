pub mod config;
pub mod feeds;
pub mod monitors;
pub mod placement;
pub mod protocol;
pub mod session;
pub mod snapshot;
