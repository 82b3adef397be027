use thiserror::Error;

use crate::engine::{EngineError, Property};

#[derive(Debug, Error)]
pub enum PlayerError {
    /// The engine rejected a command; the operation was aborted.
    #[error("engine command failed: {0}")]
    EngineCommandFailed(#[source] EngineError),

    #[error("cannot read {property}: {source}")]
    PropertyUnavailable {
        property: Property,
        #[source]
        source: EngineError,
    },

    #[error("queue index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("queue is empty")]
    EmptyQueue,

    #[error("not playing")]
    NotPlaying,
}

impl PlayerError {
    pub(super) fn command(source: EngineError) -> Self {
        PlayerError::EngineCommandFailed(source)
    }

    pub(super) fn read(property: Property) -> impl FnOnce(EngineError) -> Self {
        move |source| PlayerError::PropertyUnavailable { property, source }
    }
}

pub type Result<T> = std::result::Result<T, PlayerError>;
