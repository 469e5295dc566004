// Network adapter for external client sockets.

pub mod client;

pub use client::{snapshot_serializer, ws_handler};
