//! Recording engine used by unit tests.

use std::sync::Mutex;

use super::types::{EngineError, Property, PropertyValue, Seek};
use super::Engine;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Load(String),
    Stop,
    TogglePause,
    Seek(Seek),
    Set(Property, PropertyValue),
}

#[derive(Debug)]
struct FakeState {
    calls: Vec<Call>,
    idle: bool,
    paused: bool,
    volume: i64,
    position: f64,
    duration: i64,
    fail_commands: bool,
    fail_reads: bool,
}

/// Mimics an mpv-like engine's flags without producing audio or events.
#[derive(Debug)]
pub(crate) struct FakeEngine {
    state: Mutex<FakeState>,
}

impl FakeEngine {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                calls: Vec::new(),
                idle: true,
                paused: false,
                volume: 50,
                position: 0.0,
                duration: 0,
                fail_commands: false,
                fail_reads: false,
            }),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub(crate) fn set_idle(&self, idle: bool) {
        self.state.lock().unwrap().idle = idle;
    }

    pub(crate) fn set_paused(&self, paused: bool) {
        self.state.lock().unwrap().paused = paused;
    }

    pub(crate) fn set_position(&self, position: f64) {
        self.state.lock().unwrap().position = position;
    }

    pub(crate) fn set_duration(&self, duration: i64) {
        self.state.lock().unwrap().duration = duration;
    }

    pub(crate) fn fail_commands(&self, fail: bool) {
        self.state.lock().unwrap().fail_commands = fail;
    }

    pub(crate) fn fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }

    fn command(&self, call: Call, apply: impl FnOnce(&mut FakeState)) -> Result<(), EngineError> {
        let mut s = self.state.lock().unwrap();
        if s.fail_commands {
            return Err(EngineError::Disconnected);
        }
        apply(&mut s);
        s.calls.push(call);
        Ok(())
    }
}

impl Engine for FakeEngine {
    fn load(&self, uri: &str) -> Result<(), EngineError> {
        self.command(Call::Load(uri.to_string()), |s| s.idle = false)
    }

    fn stop(&self) -> Result<(), EngineError> {
        self.command(Call::Stop, |s| s.idle = true)
    }

    fn toggle_pause(&self) -> Result<(), EngineError> {
        self.command(Call::TogglePause, |s| s.paused = !s.paused)
    }

    fn seek(&self, seek: Seek) -> Result<(), EngineError> {
        self.command(Call::Seek(seek), |_| {})
    }

    fn set_property(&self, property: Property, value: PropertyValue) -> Result<(), EngineError> {
        self.command(Call::Set(property, value), |s| match (property, value) {
            (Property::Volume, PropertyValue::Int(v)) => s.volume = v,
            (Property::Pause, PropertyValue::Flag(p)) => s.paused = p,
            _ => {}
        })
    }

    fn get_property(&self, property: Property) -> Result<PropertyValue, EngineError> {
        let s = self.state.lock().unwrap();
        if s.fail_reads {
            return Err(EngineError::Unavailable(property));
        }
        Ok(match property {
            Property::Position => PropertyValue::Float(s.position),
            Property::Duration => PropertyValue::Int(s.duration),
            Property::Volume => PropertyValue::Int(s.volume),
            Property::IdleActive => PropertyValue::Flag(s.idle),
            Property::Pause => PropertyValue::Flag(s.paused),
        })
    }
}
