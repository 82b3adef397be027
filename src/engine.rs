//! Embedded playback engine boundary.
//!
//! The rest of the crate talks to audio output only through the [`Engine`]
//! trait and the closed [`EngineEvent`] stream. [`RodioEngine`] is the real
//! implementation; tests substitute a recording fake.

#[cfg(test)]
pub(crate) mod fake;
mod rodio_engine;
mod source;
mod types;

pub use rodio_engine::RodioEngine;
pub use types::*;

/// Commands accepted by an embedded playback engine.
///
/// Every call is expected to be fast and local: implementations queue work
/// for their own thread and report results through the event stream.
pub trait Engine: Send + Sync {
    /// Replace whatever is loaded with `uri` and start it (honoring the pause flag).
    fn load(&self, uri: &str) -> Result<(), EngineError>;
    fn stop(&self) -> Result<(), EngineError>;
    fn toggle_pause(&self) -> Result<(), EngineError>;
    fn seek(&self, seek: Seek) -> Result<(), EngineError>;
    fn set_property(&self, property: Property, value: PropertyValue) -> Result<(), EngineError>;
    fn get_property(&self, property: Property) -> Result<PropertyValue, EngineError>;

    fn get_flag(&self, property: Property) -> Result<bool, EngineError> {
        self.get_property(property)?.as_flag(property)
    }

    fn get_int(&self, property: Property) -> Result<i64, EngineError> {
        self.get_property(property)?.as_int(property)
    }

    /// Whether a file is currently loaded (the engine is not idle).
    fn is_loaded(&self) -> Result<bool, EngineError> {
        Ok(!self.get_flag(Property::IdleActive)?)
    }

    fn is_paused(&self) -> Result<bool, EngineError> {
        self.get_flag(Property::Pause)
    }
}
