//! Local music library: turns a directory tree into queueable `Track`s.

mod model;
mod scan;

pub use model::Track;
pub use scan::{scan, sort_tracks};
