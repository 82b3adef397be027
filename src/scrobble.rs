//! Scrobble pipeline: "now playing" notices and delayed "played" submissions.
//!
//! The decision logic lives in [`ScrobbleMachine`], which has no threads or
//! clocks. [`spawn_scrobbler`] drives it from a dedicated thread so catalog
//! latency never reaches the playback path.

mod machine;
mod worker;

pub use machine::{PlayingPlan, ScrobbleMachine, ScrobbleState, submission_delay};
pub use worker::{NowPlayingSource, ScrobbleHandle, spawn_scrobbler};

#[cfg(test)]
mod tests;
