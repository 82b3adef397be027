use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError, after, bounded, never, select};
use tracing::{debug, info, warn};

use crate::catalog::Scrobbler;
use crate::library::Track;
use crate::player::{Controller, PlayerError};

use super::machine::ScrobbleMachine;

/// Answers "what is playing right now" when a submission timer fires.
pub trait NowPlayingSource: Send + Sync {
    fn currently_playing(&self) -> Result<Track, PlayerError>;
}

impl NowPlayingSource for Controller {
    fn currently_playing(&self) -> Result<Track, PlayerError> {
        Controller::currently_playing(self)
    }
}

pub struct ScrobbleHandle {
    tx: Option<Sender<Track>>,
    join: Option<JoinHandle<()>>,
}

impl ScrobbleHandle {
    /// Report that `track` started playing. Never blocks.
    pub fn playing(&self, track: Track) {
        let Some(tx) = &self.tx else { return };
        match tx.try_send(track) {
            Ok(()) => {}
            Err(TrySendError::Full(t)) => warn!("scrobble queue full, dropping {}", t.id),
            Err(TrySendError::Disconnected(_)) => debug!("scrobbler already stopped"),
        }
    }

    /// Close the request queue and wait for the worker to finish.
    pub fn shutdown(mut self) {
        self.tx.take();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

pub fn spawn_scrobbler(
    scrobbler: Arc<dyn Scrobbler>,
    source: Arc<dyn NowPlayingSource>,
    capacity: usize,
) -> std::io::Result<ScrobbleHandle> {
    spawn_with(ScrobbleMachine::new(), scrobbler, source, capacity)
}

pub(super) fn spawn_with(
    machine: ScrobbleMachine,
    scrobbler: Arc<dyn Scrobbler>,
    source: Arc<dyn NowPlayingSource>,
    capacity: usize,
) -> std::io::Result<ScrobbleHandle> {
    let (tx, rx) = bounded(capacity.max(1));
    let join = thread::Builder::new()
        .name("scrobbler".into())
        .spawn(move || run(machine, rx, scrobbler.as_ref(), source.as_ref()))?;
    Ok(ScrobbleHandle {
        tx: Some(tx),
        join: Some(join),
    })
}

fn run(
    mut machine: ScrobbleMachine,
    requests: Receiver<Track>,
    scrobbler: &dyn Scrobbler,
    source: &dyn NowPlayingSource,
) {
    // At most one pending submission: re-arming replaces the receiver.
    let mut timer = never();
    loop {
        select! {
            recv(requests) -> msg => {
                let Ok(track) = msg else {
                    debug!("scrobbler stopped");
                    return;
                };
                let plan = machine.on_playing(&track);
                if let Err(e) = scrobbler.submit_now_playing(&plan.now_playing) {
                    warn!("now playing for {}: {e}", plan.now_playing);
                }
                machine.now_playing_sent();
                timer = match machine.arm(&plan) {
                    Some(delay) => {
                        debug!("scrobble for {} armed in {delay:?}", plan.now_playing);
                        after(delay)
                    }
                    None => never(),
                };
            }
            recv(timer) -> _ => {
                timer = never();
                if let Some(id) = machine.on_timer(source.currently_playing()) {
                    match scrobbler.submit_played(&id) {
                        Ok(()) => info!("scrobbled {id}"),
                        Err(e) => warn!("scrobble for {id}: {e}"),
                    }
                    machine.submitted();
                }
            }
        }
    }
}
