use std::time::Duration;

use tracing::debug;

use crate::library::Track;
use crate::player::PlayerError;

/// Tracks at or below this length are never submitted as played.
const MIN_SCROBBLE_SECS: u32 = 30;
/// Upper bound on the wait before a submission.
const MAX_DELAY_SECS: u32 = 240;

/// How long a track must keep playing before it counts as played.
pub fn submission_delay(duration_secs: u32) -> Option<Duration> {
    if duration_secs <= MIN_SCROBBLE_SECS {
        return None;
    }
    let secs = (duration_secs / 2).min(MAX_DELAY_SECS);
    Some(Duration::from_secs(u64::from(secs)))
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ScrobbleState {
    #[default]
    Idle,
    NowPlayingPending,
    NowPlayingSubmitted,
    SubmissionArmed,
    SubmissionSent,
}

/// What to do after a track starts playing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayingPlan {
    pub now_playing: String,
    /// `Some` when a submission timer should be (re)armed; any previous
    /// timer is superseded either way.
    pub submit_after: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct ScrobbleMachine {
    state: ScrobbleState,
    delay: fn(u32) -> Option<Duration>,
}

impl Default for ScrobbleMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrobbleMachine {
    pub fn new() -> Self {
        Self::with_delay(submission_delay)
    }

    /// Use a custom delay policy instead of [`submission_delay`].
    pub fn with_delay(delay: fn(u32) -> Option<Duration>) -> Self {
        Self {
            state: ScrobbleState::Idle,
            delay,
        }
    }

    pub fn state(&self) -> ScrobbleState {
        self.state
    }

    pub fn on_playing(&mut self, track: &Track) -> PlayingPlan {
        self.state = ScrobbleState::NowPlayingPending;
        PlayingPlan {
            now_playing: track.id.clone(),
            submit_after: (self.delay)(track.duration_secs),
        }
    }

    /// The now-playing notice went out (or failed; it is never retried).
    pub fn now_playing_sent(&mut self) {
        self.state = ScrobbleState::NowPlayingSubmitted;
    }

    /// Returns the timer to arm, replacing any pending one.
    pub fn arm(&mut self, plan: &PlayingPlan) -> Option<Duration> {
        self.state = match plan.submit_after {
            Some(_) => ScrobbleState::SubmissionArmed,
            None => ScrobbleState::Idle,
        };
        plan.submit_after
    }

    /// The submission timer fired. Returns the id to submit, if the player is
    /// still playing something.
    pub fn on_timer(&mut self, current: Result<Track, PlayerError>) -> Option<String> {
        if self.state != ScrobbleState::SubmissionArmed {
            debug!("scrobble timer fired in state {:?}, ignored", self.state);
            return None;
        }
        match current {
            Ok(track) => {
                self.state = ScrobbleState::SubmissionSent;
                Some(track.id)
            }
            Err(e) => {
                debug!("skipping scrobble: {e}");
                self.state = ScrobbleState::Idle;
                None
            }
        }
    }

    pub fn submitted(&mut self) {
        self.state = ScrobbleState::Idle;
    }
}
