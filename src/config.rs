//! Configuration loader and schema types.
//!
//! Settings come from an optional TOML file and `TREMOLO__*` environment
//! variables; see [`Settings`] for precedence.

mod load;
mod schema;

pub use schema::*;
