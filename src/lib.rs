//! Library entry point for the framefeed crate.
//! Re-exports the shared pointer aliases used across the actors.

pub mod api;
pub mod app;
pub mod env;
pub mod fs;
pub mod log;
pub mod net;
pub mod utils;

pub use utils::*;

/// Capacity of the channels between actor handles and their cores.
pub const BUFFER_SIZE: usize = 128;
