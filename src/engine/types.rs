//! Engine vocabulary: properties, values, commands, raw events and errors.

use std::fmt;

use thiserror::Error;

/// Engine properties that can be observed or read.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Property {
    /// Playback position in seconds.
    Position,
    /// Length of the loaded file in seconds (0 = unknown).
    Duration,
    /// Output volume in percent.
    Volume,
    /// True when nothing is loaded.
    IdleActive,
    Pause,
}

impl Property {
    pub fn name(self) -> &'static str {
        match self {
            Property::Position => "playback-time",
            Property::Duration => "duration",
            Property::Volume => "volume",
            Property::IdleActive => "idle-active",
            Property::Pause => "pause",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PropertyValue {
    Int(i64),
    Float(f64),
    Flag(bool),
}

impl PropertyValue {
    pub fn as_int(self, property: Property) -> Result<i64, EngineError> {
        match self {
            PropertyValue::Int(v) => Ok(v),
            PropertyValue::Float(v) => Ok(v as i64),
            PropertyValue::Flag(_) => Err(EngineError::TypeMismatch {
                property,
                expected: "integer",
            }),
        }
    }

    pub fn as_float(self, property: Property) -> Result<f64, EngineError> {
        match self {
            PropertyValue::Int(v) => Ok(v as f64),
            PropertyValue::Float(v) => Ok(v),
            PropertyValue::Flag(_) => Err(EngineError::TypeMismatch {
                property,
                expected: "number",
            }),
        }
    }

    pub fn as_flag(self, property: Property) -> Result<bool, EngineError> {
        match self {
            PropertyValue::Flag(v) => Ok(v),
            _ => Err(EngineError::TypeMismatch {
                property,
                expected: "flag",
            }),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Seek {
    /// Seconds relative to the current position (may be negative).
    Relative(i64),
    /// Seconds from the start of the file.
    Absolute(u64),
}

/// Why a file stopped playing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EndReason {
    /// Reached the end of the data.
    Eof,
    /// An explicit stop command.
    Stopped,
    /// Another file was loaded over it.
    Replaced,
    /// The file could not be opened or decoded.
    Error,
}

/// The closed set of raw events an engine emits.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    PropertyChanged { property: Property },
    StartOfFile,
    EndOfFile { reason: EndReason },
    Idle,
    Unhandled { raw: String },
    /// Sentinel: no more events will follow.
    Shutdown,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine thread is gone")]
    Disconnected,
    #[error("property {0} is unavailable")]
    Unavailable(Property),
    #[error("property {property} is not a {expected}")]
    TypeMismatch {
        property: Property,
        expected: &'static str,
    },
    #[error("property {0} is read-only")]
    ReadOnly(Property),
    #[error("audio output unavailable: {0}")]
    Output(String),
    #[error("stream client unavailable: {0}")]
    Client(String),
}
