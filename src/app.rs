//! Application module: the presentation model used by the TUI and runtime.
//!
//! The `App` model lives in `app::model` and holds the library listing, the
//! queue view, cursors, and what the top bar and log pane show.

mod model;

pub use model::*;
