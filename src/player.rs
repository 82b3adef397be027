//! Playback orchestration: the play queue, the command surface that drives
//! the engine, translation of raw engine events into domain events, and the
//! fan-out of those events to subscribers.
//!
//! Threads involved:
//! - the engine's own thread produces raw [`EngineEvent`](crate::engine::EngineEvent)s;
//! - the translator thread ([`EventTranslator`]) turns them into [`DomainEvent`]s;
//! - the UI loop and remote-control integrations call [`Controller`] methods.
//!
//! All queue and status state sits behind one mutex inside the controller.
//! Events are dispatched only after that mutex is released.

mod controller;
mod error;
mod notify;
mod queue;
mod translator;
mod types;

pub use controller::Controller;
pub use error::PlayerError;
pub use notify::Notifier;
pub use queue::Queue;
pub use translator::{EventTranslator, Flow};
pub use types::*;

pub use crate::library::Track;

#[cfg(test)]
mod tests;
