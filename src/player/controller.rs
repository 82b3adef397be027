//! The playback command surface.
//!
//! Lock discipline: every method takes the state mutex once, issues its
//! engine commands while holding it, commits queue/status changes only after
//! those commands succeed, and releases it before dispatching any events.
//! Engine commands are local channel sends; no network I/O happens under the lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use crate::engine::{Engine, Property, PropertyValue, Seek};
use crate::library::Track;

use super::error::{PlayerError, Result};
use super::notify::Notifier;
use super::queue::Queue;
use super::types::{DomainEvent, PlaybackStatus, RemoteSnapshot};

#[derive(Debug, Default)]
pub(super) struct PlayerState {
    pub(super) queue: Queue,
    pub(super) status: PlaybackStatus,
    /// Set when the controller asked the engine to swap files; cleared when the
    /// engine reports the new file started.
    pub(super) replace_in_progress: bool,
}

/// Who asked to move to the next track.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(super) enum Advance {
    User,
    EndOfFile,
}

struct Inner {
    engine: Arc<dyn Engine>,
    state: Mutex<PlayerState>,
    snapshot: Mutex<RemoteSnapshot>,
    notifier: Arc<Notifier>,
}

/// Cheap to clone; all clones drive the same queue and engine.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<Inner>,
}

impl Controller {
    pub fn new(engine: Arc<dyn Engine>, notifier: Arc<Notifier>) -> Self {
        Self {
            inner: Arc::new(Inner {
                engine,
                state: Mutex::new(PlayerState::default()),
                snapshot: Mutex::new(RemoteSnapshot::default()),
                notifier,
            }),
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    pub(super) fn engine(&self) -> &dyn Engine {
        self.inner.engine.as_ref()
    }

    pub(super) fn lock_state(&self) -> MutexGuard<'_, PlayerState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn update_snapshot(&self, f: impl FnOnce(&mut RemoteSnapshot)) {
        let mut snap = self
            .inner
            .snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut snap);
    }

    pub(super) fn dispatch_all(&self, events: Vec<DomainEvent>) {
        for event in events {
            self.inner.notifier.dispatch(event);
        }
    }

    /// Run `f` under the state lock, then dispatch whatever events it queued.
    fn transact<T>(
        &self,
        f: impl FnOnce(&Self, &mut PlayerState, &mut Vec<DomainEvent>) -> Result<T>,
    ) -> Result<T> {
        let mut events = Vec::new();
        let result = {
            let mut st = self.lock_state();
            f(self, &mut st, &mut events)
        };
        self.dispatch_all(events);
        result
    }

    /// Replace the whole queue with `track` and start it.
    pub fn play_track(&self, track: Track) -> Result<()> {
        self.transact(|this, st, _| {
            let engine = this.engine();
            // Start the new file from a known (unpaused) state.
            if matches!(engine.is_paused(), Ok(true)) {
                engine.toggle_pause().map_err(PlayerError::command)?;
            }
            engine.load(&track.uri).map_err(PlayerError::command)?;

            info!("playing {}", track.display());
            st.queue.replace_with(track);
            st.replace_in_progress = true;
            st.status = PlaybackStatus::Loading;
            Ok(())
        })
    }

    /// Drop the head of the queue and move on to the new head.
    ///
    /// The new head is only loaded when something is currently loaded in the
    /// engine; an exhausted queue stops playback.
    pub fn advance_to_next(&self) -> Result<()> {
        self.transact(|this, st, events| this.advance_locked(st, Advance::User, events))
    }

    pub(super) fn advance_locked(
        &self,
        st: &mut PlayerState,
        trigger: Advance,
        events: &mut Vec<DomainEvent>,
    ) -> Result<()> {
        if st.queue.len() <= 1 {
            match trigger {
                Advance::User => self.stop_locked(st)?,
                Advance::EndOfFile => {
                    // The engine is already idle; nothing will echo a stop back.
                    info!("queue exhausted, stopping");
                    st.status = PlaybackStatus::Stopped;
                    st.replace_in_progress = false;
                    events.push(DomainEvent::Stopped);
                }
            }
            st.queue.pop_front();
            return Ok(());
        }

        let load = match trigger {
            Advance::EndOfFile => true,
            Advance::User => match self.engine().is_loaded() {
                Ok(loaded) => loaded,
                Err(e) => {
                    warn!("advance: cannot tell whether a track is loaded: {e}");
                    false
                }
            },
        };

        if load {
            let next = st.queue.get(1).ok_or(PlayerError::EmptyQueue)?;
            self.engine()
                .load(&next.uri)
                .map_err(PlayerError::command)?;
            info!("advancing to {}", next.display());
            st.replace_in_progress = true;
            st.status = PlaybackStatus::Loading;
        }
        st.queue.pop_front();
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        self.transact(|this, st, _| this.stop_locked(st))
    }

    /// A no-op when already stopped, so repeated stops yield one Stopped event
    /// (the engine's end-of-file feedback for the first one).
    pub(super) fn stop_locked(&self, st: &mut PlayerState) -> Result<()> {
        if st.status == PlaybackStatus::Stopped {
            debug!("stop: already stopped");
            return Ok(());
        }
        info!("stopping (user)");
        self.engine().stop().map_err(PlayerError::command)?;
        st.status = PlaybackStatus::Stopped;
        st.replace_in_progress = false;
        Ok(())
    }

    /// Pause, resume, or (when stopped) start the head of the queue.
    pub fn toggle_pause(&self) -> Result<()> {
        self.transact(|this, st, events| this.toggle_pause_locked(st, events))
    }

    fn toggle_pause_locked(
        &self,
        st: &mut PlayerState,
        events: &mut Vec<DomainEvent>,
    ) -> Result<()> {
        let engine = self.engine();
        let loaded = engine
            .is_loaded()
            .map_err(PlayerError::read(Property::IdleActive))?;

        if loaded && st.status != PlaybackStatus::Stopped {
            let paused = engine
                .is_paused()
                .map_err(PlayerError::read(Property::Pause))?;
            engine.toggle_pause().map_err(PlayerError::command)?;

            let head = st.queue.peek().ok().cloned();
            if paused {
                st.status = PlaybackStatus::Playing;
                events.push(DomainEvent::Unpaused(head));
            } else {
                st.status = PlaybackStatus::Paused;
                events.push(DomainEvent::Paused(head));
            }
            return Ok(());
        }

        let Ok(head) = st.queue.peek() else {
            st.status = PlaybackStatus::Stopped;
            events.push(DomainEvent::Stopped);
            return Ok(());
        };
        let head = head.clone();

        engine.load(&head.uri).map_err(PlayerError::command)?;
        // Cleared by the start-of-file event of the new load.
        st.replace_in_progress = true;
        if st.status == PlaybackStatus::Stopped {
            if let Err(e) = engine.set_property(Property::Pause, PropertyValue::Flag(false)) {
                error!("unpause after load: {e}");
            }
            // The engine's start-of-file event announces Playing.
            st.status = PlaybackStatus::Loading;
        } else {
            events.push(DomainEvent::Unpaused(Some(head)));
        }
        Ok(())
    }

    /// Resume or start playback unless already playing.
    pub fn play(&self) -> Result<()> {
        match self.status() {
            PlaybackStatus::Playing | PlaybackStatus::Loading => Ok(()),
            PlaybackStatus::Paused | PlaybackStatus::Stopped => self.toggle_pause(),
        }
    }

    /// Pause if playing; otherwise nothing.
    pub fn pause(&self) -> Result<()> {
        match self.status() {
            PlaybackStatus::Playing => self.toggle_pause(),
            _ => Ok(()),
        }
    }

    pub fn next(&self) -> Result<()> {
        self.advance_to_next()
    }

    /// Restart the head track: stop, then start again.
    pub fn previous(&self) -> Result<()> {
        self.stop()?;
        self.toggle_pause()
    }

    /// Set the engine volume, clamped to 0..=100.
    pub fn set_volume(&self, percent: i64) -> Result<()> {
        let percent = percent.clamp(0, 100);
        self.engine()
            .set_property(Property::Volume, PropertyValue::Int(percent))
            .map_err(|e| {
                error!("set volume to {percent}: {e}");
                PlayerError::command(e)
            })
    }

    pub fn adjust_volume(&self, delta: i64) -> Result<()> {
        let current = self
            .engine()
            .get_int(Property::Volume)
            .map_err(PlayerError::read(Property::Volume))?;
        self.set_volume(current.saturating_add(delta))
    }

    pub fn seek_relative(&self, seconds: i64) -> Result<()> {
        self.engine()
            .seek(Seek::Relative(seconds))
            .map_err(PlayerError::command)
    }

    pub fn seek_absolute(&self, seconds: u64) -> Result<()> {
        self.engine()
            .seek(Seek::Absolute(seconds))
            .map_err(PlayerError::command)
    }

    pub fn enqueue(&self, track: Track) {
        self.lock_state().queue.enqueue(track);
    }

    /// Remove one queue entry. Removing the head advances; removing the only
    /// entry stops and empties the queue.
    pub fn remove_at(&self, index: usize) -> Result<()> {
        self.transact(|this, st, events| {
            let len = st.queue.len();
            if index >= len {
                warn!("remove_at({index}): queue has {len} entries");
                return Err(PlayerError::IndexOutOfRange { index, len });
            }
            if len == 1 {
                this.stop_locked(st)?;
                st.queue.clear();
            } else if index == 0 {
                this.advance_locked(st, Advance::User, events)?;
            } else {
                st.queue.remove_at(index)?;
            }
            Ok(())
        })
    }

    pub fn move_up(&self, index: usize) -> bool {
        self.lock_state().queue.move_up(index)
    }

    pub fn move_down(&self, index: usize) -> bool {
        self.lock_state().queue.move_down(index)
    }

    pub fn shuffle(&self) {
        self.lock_state().queue.shuffle();
    }

    /// Stop playback and empty the queue.
    pub fn clear(&self) -> Result<()> {
        self.transact(|this, st, _| {
            this.stop_locked(st)?;
            st.queue.clear();
            Ok(())
        })
    }

    pub fn queue_snapshot(&self) -> Vec<Track> {
        self.lock_state().queue.to_vec()
    }

    /// The head track, if it is actively playing.
    pub fn currently_playing(&self) -> Result<Track> {
        let st = self.lock_state();
        let head = st.queue.peek()?;
        if st.status != PlaybackStatus::Playing {
            return Err(PlayerError::NotPlaying);
        }
        Ok(head.clone())
    }

    pub fn status(&self) -> PlaybackStatus {
        self.lock_state().status
    }

    pub fn snapshot(&self) -> RemoteSnapshot {
        *self
            .inner
            .snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
