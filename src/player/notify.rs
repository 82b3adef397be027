//! Fan-out of domain events.
//!
//! Every event goes first to the UI loop over a bounded channel (dropped when
//! the channel is full), then to the registered callbacks of its kind, in registration order, on the calling
//! thread. Callbacks may call back into the [`Controller`](super::Controller)
//! (the queue lock is not held while they run), but they can observe the queue
//! mid-transition and must not register further callbacks.

use std::sync::{PoisonError, RwLock};

use crossbeam_channel::{Sender, TrySendError};
use tracing::{debug, trace, warn};

use crate::library::Track;

use super::types::DomainEvent;

type Callback = Box<dyn Fn() + Send + Sync>;
type TrackCallback = Box<dyn Fn(&Track) + Send + Sync>;

#[derive(Default)]
struct Registry {
    paused: Vec<Callback>,
    stopped: Vec<Callback>,
    playing: Vec<Callback>,
    seek: Vec<Callback>,
    song_changed: Vec<TrackCallback>,
}

fn run(callbacks: &[Callback]) {
    callbacks.iter().for_each(|cb| cb());
}

pub struct Notifier {
    registry: RwLock<Registry>,
    ui: Sender<DomainEvent>,
}

impl Notifier {
    pub fn new(ui: Sender<DomainEvent>) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            ui,
        }
    }

    fn register(&self, f: impl FnOnce(&mut Registry)) {
        let mut reg = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut reg);
    }

    pub fn on_paused(&self, cb: impl Fn() + Send + Sync + 'static) {
        self.register(|r| r.paused.push(Box::new(cb)));
    }

    pub fn on_stopped(&self, cb: impl Fn() + Send + Sync + 'static) {
        self.register(|r| r.stopped.push(Box::new(cb)));
    }

    pub fn on_playing(&self, cb: impl Fn() + Send + Sync + 'static) {
        self.register(|r| r.playing.push(Box::new(cb)));
    }

    pub fn on_seek(&self, cb: impl Fn() + Send + Sync + 'static) {
        self.register(|r| r.seek.push(Box::new(cb)));
    }

    pub fn on_song_change(&self, cb: impl Fn(&Track) + Send + Sync + 'static) {
        self.register(|r| r.song_changed.push(Box::new(cb)));
    }

    /// Deliver `event` once to the UI loop and to its callbacks.
    pub fn dispatch(&self, event: DomainEvent) {
        self.forward(&event);

        let reg = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        match &event {
            DomainEvent::Stopped => run(&reg.stopped),
            DomainEvent::Status => run(&reg.seek),
            DomainEvent::Playing(track) | DomainEvent::Unpaused(track) => {
                if let Some(t) = track {
                    reg.song_changed.iter().for_each(|cb| cb(t));
                }
                run(&reg.playing);
            }
            DomainEvent::Paused(track) => {
                if let Some(t) = track {
                    reg.song_changed.iter().for_each(|cb| cb(t));
                }
                run(&reg.paused);
            }
        }
    }

    /// Hand `event` to the UI loop without ever blocking. The UI loop also
    /// polls the controller on every tick, so a dropped event only delays
    /// the screen.
    fn forward(&self, event: &DomainEvent) {
        match self.ui.try_send(event.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) if *event == DomainEvent::Status => {
                trace!("status event dropped, UI queue full")
            }
            Err(TrySendError::Full(e)) => warn!("UI queue full, {e:?} dropped"),
            Err(TrySendError::Disconnected(e)) => debug!("{e:?} not forwarded: UI loop gone"),
        }
    }
}
