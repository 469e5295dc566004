// Interface adapters: protocol translation and network handling.

pub mod http;
pub mod net;
pub mod protocol;
pub mod state;
pub mod utils;
