//! MPRIS2 remote control on the session bus.
//!
//! Player methods call the [`Controller`] directly. The exposed playback
//! status and metadata are fed by notifier callbacks; position and volume are
//! read from the controller's snapshot on demand.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_io::block_on;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use tracing::{debug, error, info, warn};
use zbus::{Connection, interface};
use zvariant::{ObjectPath, OwnedValue, Value};

use crate::library::Track;
use crate::player::{Controller, Notifier, PlaybackStatus, PlayerError};

const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";
const BUS_NAME: &str = "org.mpris.MediaPlayer2.tremolo";
const NO_TRACK: &str = "/org/mpris/MediaPlayer2/TrackList/NoTrack";

/// Which group of properties a change notification refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Change {
    Playback,
    Metadata,
    Volume,
}

#[derive(Debug, Default)]
struct SharedState {
    status: PlaybackStatus,
    track: Option<Track>,
    volume: Option<u8>,
}

#[derive(Clone)]
pub struct MprisHandle {
    state: Arc<Mutex<SharedState>>,
    changes: Sender<Change>,
}

impl MprisHandle {
    fn lock(&self) -> std::sync::MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, change: Change) {
        match self.changes.try_send(change) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => debug!("MPRIS change queue full"),
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    pub fn set_status(&self, status: PlaybackStatus) {
        let changed = {
            let mut s = self.lock();
            let changed = s.status != status;
            s.status = status;
            if status == PlaybackStatus::Stopped {
                s.track = None;
            }
            changed
        };
        if changed {
            self.notify(Change::Playback);
            if status == PlaybackStatus::Stopped {
                self.notify(Change::Metadata);
            }
        }
    }

    pub fn set_track(&self, track: Option<&Track>) {
        let changed = {
            let mut s = self.lock();
            let changed = s.track.as_ref() != track;
            s.track = track.cloned();
            changed
        };
        if changed {
            self.notify(Change::Metadata);
        }
    }

    /// Record the latest volume; only differences are signalled.
    pub fn note_volume(&self, volume: u8) {
        let changed = {
            let mut s = self.lock();
            let changed = s.volume != Some(volume);
            s.volume = Some(volume);
            changed
        };
        if changed {
            self.notify(Change::Volume);
        }
    }

    /// Keep the exported state in step with domain events.
    pub fn subscribe(&self, notifier: &Notifier, controller: &Controller) {
        let h = self.clone();
        notifier.on_song_change(move |t| h.set_track(Some(t)));
        let h = self.clone();
        notifier.on_playing(move || h.set_status(PlaybackStatus::Playing));
        let h = self.clone();
        notifier.on_paused(move || h.set_status(PlaybackStatus::Paused));
        let h = self.clone();
        notifier.on_stopped(move || h.set_status(PlaybackStatus::Stopped));
        let h = self.clone();
        let c = controller.clone();
        notifier.on_seek(move || h.note_volume(c.snapshot().volume));
    }
}

/// `mpris:trackid` for a track. Catalog ids are hex-encoded to stay within
/// the object path alphabet.
pub(crate) fn track_object_path(track: &Track) -> String {
    format!("/org/tremolo/track/t{}", hex::encode(&track.id))
}

fn owned(value: Value<'_>) -> Option<OwnedValue> {
    OwnedValue::try_from(value).ok()
}

pub(crate) fn metadata_map(track: Option<&Track>) -> HashMap<String, OwnedValue> {
    let mut map = HashMap::new();
    let Some(track) = track else {
        if let Some(v) = ObjectPath::try_from(NO_TRACK).ok().and_then(|p| owned(Value::from(p))) {
            map.insert("mpris:trackid".to_string(), v);
        }
        return map;
    };

    let mut insert = |key: &str, value: Value<'_>| {
        if let Some(v) = owned(value) {
            map.insert(key.to_string(), v);
        }
    };

    if let Ok(path) = ObjectPath::try_from(track_object_path(track)) {
        insert("mpris:trackid", Value::from(path));
    }
    insert("xesam:title", Value::from(track.title.clone()));
    if !track.artist.is_empty() {
        insert("xesam:artist", Value::from(vec![track.artist.clone()]));
    }
    if !track.album.is_empty() {
        insert("xesam:album", Value::from(track.album.clone()));
    }
    if track.duration_secs > 0 {
        insert(
            "mpris:length",
            Value::from(i64::from(track.duration_secs) * 1_000_000),
        );
    }
    if track.track_number > 0 {
        insert("xesam:trackNumber", Value::from(track.track_number as i32));
    }
    insert("xesam:url", Value::from(track.uri.clone()));
    map
}

pub(crate) fn status_str(status: PlaybackStatus) -> &'static str {
    match status {
        PlaybackStatus::Playing => "Playing",
        PlaybackStatus::Paused => "Paused",
        // Loading has not produced sound yet.
        PlaybackStatus::Stopped | PlaybackStatus::Loading => "Stopped",
    }
}

struct RootIface {
    quit: Sender<()>,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {
        // No-op for TUI.
    }

    fn quit(&self) {
        let _ = self.quit.try_send(());
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> &str {
        "tremolo"
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec!["file".to_string(), "http".to_string(), "https".to_string()]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![]
    }
}

struct PlayerIface {
    controller: Controller,
    state: Arc<Mutex<SharedState>>,
}

impl PlayerIface {
    fn log(result: Result<(), PlayerError>, what: &str) {
        if let Err(e) = result {
            warn!("MPRIS {what}: {e}");
        }
    }
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        Self::log(self.controller.next(), "next");
    }

    fn previous(&self) {
        Self::log(self.controller.previous(), "previous");
    }

    fn play(&self) {
        Self::log(self.controller.play(), "play");
    }

    fn pause(&self) {
        Self::log(self.controller.pause(), "pause");
    }

    fn play_pause(&self) {
        Self::log(self.controller.toggle_pause(), "play/pause");
    }

    fn stop(&self) {
        Self::log(self.controller.stop(), "stop");
    }

    /// Offset in microseconds.
    fn seek(&self, offset: i64) {
        Self::log(self.controller.seek_relative(offset / 1_000_000), "seek");
    }

    fn set_position(&self, _track_id: ObjectPath<'_>, position: i64) {
        if position < 0 {
            return;
        }
        Self::log(
            self.controller.seek_absolute((position / 1_000_000) as u64),
            "set position",
        );
    }

    #[zbus(property)]
    fn playback_status(&self) -> &str {
        let s = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        status_str(s.status)
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        let s = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        metadata_map(s.track.as_ref())
    }

    #[zbus(property)]
    fn position(&self) -> i64 {
        (self.controller.snapshot().time_pos * 1_000_000.0) as i64
    }

    #[zbus(property)]
    fn volume(&self) -> f64 {
        f64::from(self.controller.snapshot().volume) / 100.0
    }

    #[zbus(property)]
    fn set_volume(&mut self, value: f64) {
        let percent = (value.clamp(0.0, 1.0) * 100.0).round() as i64;
        Self::log(self.controller.set_volume(percent), "set volume");
    }

    #[zbus(property)]
    fn rate(&self) -> f64 {
        1.0
    }

    #[zbus(property)]
    fn minimum_rate(&self) -> f64 {
        1.0
    }

    #[zbus(property)]
    fn maximum_rate(&self) -> f64 {
        1.0
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        true
    }
}

/// Start the MPRIS service thread. Bus failures are logged and leave the
/// program running without remote control.
pub fn spawn_mpris(controller: Controller, quit: Sender<()>) -> MprisHandle {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (changes_tx, changes_rx) = bounded(64);

    let state_for_thread = state.clone();
    let spawned = std::thread::Builder::new()
        .name("mpris".into())
        .spawn(move || serve(controller, quit, state_for_thread, changes_rx));
    if let Err(e) = spawned {
        error!("MPRIS: failed to start thread: {e}");
    }

    MprisHandle {
        state,
        changes: changes_tx,
    }
}

fn serve(
    controller: Controller,
    quit: Sender<()>,
    state: Arc<Mutex<SharedState>>,
    changes: Receiver<Change>,
) {
    let connection = match block_on(register(controller, quit, state)) {
        Ok(c) => c,
        Err(e) => {
            warn!("MPRIS unavailable: {e}");
            return;
        }
    };
    info!("MPRIS registered as {BUS_NAME}");

    for change in changes.iter() {
        if let Err(e) = block_on(emit(&connection, change)) {
            debug!("MPRIS: {change:?} signal failed: {e}");
        }
    }
}

async fn register(
    controller: Controller,
    quit: Sender<()>,
    state: Arc<Mutex<SharedState>>,
) -> zbus::Result<Connection> {
    let connection = Connection::session().await?;
    connection.request_name(BUS_NAME).await?;

    let object_server = connection.object_server();
    object_server.at(OBJECT_PATH, RootIface { quit }).await?;
    object_server
        .at(OBJECT_PATH, PlayerIface { controller, state })
        .await?;
    Ok(connection)
}

async fn emit(connection: &Connection, change: Change) -> zbus::Result<()> {
    let iface_ref = connection
        .object_server()
        .interface::<_, PlayerIface>(OBJECT_PATH)
        .await?;
    let emitter = iface_ref.signal_emitter();
    let iface = iface_ref.get().await;
    match change {
        Change::Playback => iface.playback_status_changed(emitter).await,
        Change::Metadata => iface.metadata_changed(emitter).await,
        Change::Volume => iface.volume_changed(emitter).await,
    }
}
