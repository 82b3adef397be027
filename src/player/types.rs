use crate::library::Track;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum PlaybackStatus {
    /// Initial state; also entered on explicit stop or queue exhaustion.
    #[default]
    Stopped,
    /// A load was requested and the engine has not confirmed it yet.
    Loading,
    Playing,
    Paused,
}

/// What the translator and controller announce to the rest of the program.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// A new file started playing.
    Playing(Option<Track>),
    /// Playback resumed on the current file.
    Unpaused(Option<Track>),
    Paused(Option<Track>),
    Stopped,
    /// Position, duration or volume changed; see [`RemoteSnapshot`].
    Status,
}

impl DomainEvent {
    pub fn track(&self) -> Option<&Track> {
        match self {
            DomainEvent::Playing(t) | DomainEvent::Unpaused(t) | DomainEvent::Paused(t) => {
                t.as_ref()
            }
            DomainEvent::Stopped | DomainEvent::Status => None,
        }
    }
}

/// Derived playback figures for status displays and remote control.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct RemoteSnapshot {
    /// 0..=100
    pub volume: u8,
    /// Whole seconds.
    pub position: u64,
    /// Whole seconds, 0 when unknown.
    pub duration: u64,
    /// Fine-grained position for remote-control reporting.
    pub time_pos: f64,
}
