//! Turns raw engine events into domain events and queue transitions.

use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;
use tracing::{debug, error, info, warn};

use crate::engine::{EndReason, EngineError, EngineEvent, Property};

use super::controller::{Advance, Controller};
use super::types::{DomainEvent, PlaybackStatus};

/// Whether the translator loop should keep going after an event.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

impl Controller {
    /// Apply one engine event. Never fails: problems are logged and the
    /// translator carries on with the next event.
    pub fn translate(&self, event: EngineEvent) -> Flow {
        match event {
            EngineEvent::PropertyChanged { property } => self.on_property(property),
            EngineEvent::EndOfFile { reason } => self.on_end_of_file(reason),
            EngineEvent::StartOfFile => self.on_start_of_file(),
            EngineEvent::Idle => debug!("engine idle"),
            EngineEvent::Unhandled { raw } => warn!("unhandled engine event: {raw}"),
            EngineEvent::Shutdown => {
                info!("engine shut down");
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    fn on_property(&self, property: Property) {
        let engine = self.engine();
        let read: Result<(), EngineError> = match property {
            Property::Position => engine
                .get_property(property)
                .and_then(|v| v.as_float(property))
                .map(|pos| {
                    self.update_snapshot(|s| {
                        s.time_pos = pos;
                        s.position = pos.max(0.0).floor() as u64;
                    })
                }),
            Property::Duration => engine.get_int(property).map(|d| {
                self.update_snapshot(|s| s.duration = d.max(0) as u64)
            }),
            Property::Volume => engine.get_int(property).map(|v| {
                self.update_snapshot(|s| s.volume = v.clamp(0, 100) as u8)
            }),
            Property::IdleActive | Property::Pause => {
                debug!("property {property} changed");
                return;
            }
        };
        if let Err(e) = read {
            warn!("reading {property} after change: {e}");
        }
        self.dispatch_all(vec![DomainEvent::Status]);
    }

    fn on_end_of_file(&self, reason: EndReason) {
        let mut events = Vec::new();
        {
            let mut st = self.lock_state();
            if st.replace_in_progress && reason != EndReason::Error {
                debug!("end of file ({reason:?}) during replace, ignored");
            } else if st.status == PlaybackStatus::Stopped {
                events.push(DomainEvent::Stopped);
            } else if reason == EndReason::Stopped {
                // A stop the controller already accounted for; only natural
                // ends and failures move the queue.
                debug!("end of file (stopped) while {:?}, ignored", st.status);
            } else {
                if reason == EndReason::Error {
                    warn!("current track failed to play, skipping");
                    st.replace_in_progress = false;
                }
                if let Err(e) = self.advance_locked(&mut st, Advance::EndOfFile, &mut events) {
                    error!("advance after end of file: {e}");
                }
            }
        }
        self.dispatch_all(events);
    }

    fn on_start_of_file(&self) {
        let mut events = Vec::new();
        {
            let mut st = self.lock_state();
            if st.status == PlaybackStatus::Stopped {
                debug!("start of file while stopped, ignored");
                return;
            }
            st.replace_in_progress = false;

            match self.engine().is_paused() {
                Err(e) => error!("reading pause state on start of file: {e}"),
                Ok(paused) => {
                    let head = st.queue.peek().ok().cloned();
                    if paused {
                        st.status = PlaybackStatus::Paused;
                        events.push(DomainEvent::Paused(head));
                    } else {
                        st.status = PlaybackStatus::Playing;
                        events.push(DomainEvent::Playing(head));
                    }
                }
            }
        }
        self.dispatch_all(events);
    }
}

/// Owns the receiving end of the engine's event stream.
pub struct EventTranslator {
    controller: Controller,
    events: Receiver<EngineEvent>,
}

impl EventTranslator {
    pub fn new(controller: Controller, events: Receiver<EngineEvent>) -> Self {
        Self { controller, events }
    }

    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("translator".into())
            .spawn(move || self.run())
    }

    /// Process events until the engine shuts down or its channel closes.
    pub fn run(self) {
        for event in self.events.iter() {
            if self.controller.translate(event) == Flow::Exit {
                return;
            }
        }
        debug!("engine event channel closed");
    }
}
