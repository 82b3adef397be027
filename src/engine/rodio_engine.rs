use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use rodio::{OutputStream, OutputStreamBuilder, Sink};
use tracing::{debug, error, warn};

use super::source::{Media, create_sink_at, http_client, open_media};
use super::types::{EndReason, EngineError, EngineEvent, Property, PropertyValue, Seek};
use super::Engine;

const TICK: Duration = Duration::from_millis(200);

#[derive(Debug)]
enum EngineCmd {
    Load(String),
    Stop,
    TogglePause,
    SetPause(bool),
    Seek(Seek),
    SetVolume(i64),
    Quit,
}

/// Property values published by the engine thread.
#[derive(Debug, Clone)]
struct EngineProps {
    idle: bool,
    paused: bool,
    volume: i64,
    position: f64,
    duration: i64,
}

/// Embedded playback engine backed by a rodio `Sink` on its own thread.
pub struct RodioEngine {
    tx: Sender<EngineCmd>,
    props: Arc<Mutex<EngineProps>>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl RodioEngine {
    /// Open the default output device and start the engine thread.
    ///
    /// Returns the engine together with its raw event stream.
    pub fn spawn(
        initial_volume: u8,
        event_capacity: usize,
        stream_timeout: Duration,
    ) -> Result<(Self, Receiver<EngineEvent>), EngineError> {
        let http = http_client(stream_timeout).map_err(|e| EngineError::Client(e.to_string()))?;
        let (tx, rx) = unbounded::<EngineCmd>();
        let (events_tx, events_rx) = bounded::<EngineEvent>(event_capacity);
        let (ready_tx, ready_rx) = bounded::<Result<(), String>>(1);

        let props = Arc::new(Mutex::new(EngineProps {
            idle: true,
            paused: false,
            volume: i64::from(initial_volume.min(100)),
            position: 0.0,
            duration: 0,
        }));

        let props_for_thread = props.clone();
        let join = thread::Builder::new()
            .name("engine".into())
            .spawn(move || {
                let mut stream = match OutputStreamBuilder::open_default_stream() {
                    Ok(s) => s,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                // rodio logs to stderr when OutputStream is dropped. That's useful in debugging,
                // but noisy for a TUI app.
                stream.log_on_drop(false);
                let _ = ready_tx.send(Ok(()));

                let mut worker = Worker::new(stream, http, props_for_thread, events_tx);
                worker.run(rx);
            })
            .map_err(|e| EngineError::Output(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(msg)) => return Err(EngineError::Output(msg)),
            Err(_) => return Err(EngineError::Disconnected),
        }

        Ok((
            Self {
                tx,
                props,
                join: Mutex::new(Some(join)),
            },
            events_rx,
        ))
    }

    fn send(&self, cmd: EngineCmd) -> Result<(), EngineError> {
        self.tx.send(cmd).map_err(|_| EngineError::Disconnected)
    }

    /// Stop playback, emit the shutdown sentinel and wait for the engine thread.
    pub fn shutdown(&self) {
        let _ = self.send(EngineCmd::Quit);
        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}

impl Engine for RodioEngine {
    fn load(&self, uri: &str) -> Result<(), EngineError> {
        self.send(EngineCmd::Load(uri.to_string()))
    }

    fn stop(&self) -> Result<(), EngineError> {
        self.send(EngineCmd::Stop)
    }

    fn toggle_pause(&self) -> Result<(), EngineError> {
        self.send(EngineCmd::TogglePause)
    }

    fn seek(&self, seek: Seek) -> Result<(), EngineError> {
        self.send(EngineCmd::Seek(seek))
    }

    fn set_property(&self, property: Property, value: PropertyValue) -> Result<(), EngineError> {
        match property {
            Property::Volume => self.send(EngineCmd::SetVolume(value.as_int(property)?)),
            Property::Pause => self.send(EngineCmd::SetPause(value.as_flag(property)?)),
            Property::Position => {
                let secs = value.as_float(property)?.max(0.0) as u64;
                self.send(EngineCmd::Seek(Seek::Absolute(secs)))
            }
            Property::Duration | Property::IdleActive => Err(EngineError::ReadOnly(property)),
        }
    }

    fn get_property(&self, property: Property) -> Result<PropertyValue, EngineError> {
        let props = self
            .props
            .lock()
            .map_err(|_| EngineError::Unavailable(property))?;
        Ok(match property {
            Property::Position => PropertyValue::Float(props.position),
            Property::Duration => PropertyValue::Int(props.duration),
            Property::Volume => PropertyValue::Int(props.volume),
            Property::IdleActive => PropertyValue::Flag(props.idle),
            Property::Pause => PropertyValue::Flag(props.paused),
        })
    }
}

/// State owned by the engine thread.
struct Worker {
    stream: OutputStream,
    http: reqwest::blocking::Client,
    props: Arc<Mutex<EngineProps>>,
    events: Sender<EngineEvent>,

    sink: Option<Sink>,
    media: Option<Media>,
    // Track start time and accumulated elapsed when paused.
    started_at: Option<Instant>,
    accumulated: Duration,
    duration: Option<Duration>,
    paused: bool,
    volume: i64,
    last_reported_secs: Option<u64>,
}

impl Worker {
    fn new(
        stream: OutputStream,
        http: reqwest::blocking::Client,
        props: Arc<Mutex<EngineProps>>,
        events: Sender<EngineEvent>,
    ) -> Self {
        let volume = props.lock().map(|p| p.volume).unwrap_or(100);
        Self {
            stream,
            http,
            props,
            events,
            sink: None,
            media: None,
            started_at: None,
            accumulated: Duration::ZERO,
            duration: None,
            paused: false,
            volume,
            last_reported_secs: None,
        }
    }

    fn run(&mut self, rx: Receiver<EngineCmd>) {
        loop {
            match rx.recv_timeout(TICK) {
                Ok(EngineCmd::Load(uri)) => self.load(&uri),
                Ok(EngineCmd::Stop) => self.stop(EndReason::Stopped),
                Ok(EngineCmd::TogglePause) => self.toggle_pause(),
                Ok(EngineCmd::SetPause(p)) => {
                    if p != self.paused {
                        self.toggle_pause();
                    }
                }
                Ok(EngineCmd::Seek(seek)) => self.seek(seek),
                Ok(EngineCmd::SetVolume(v)) => self.set_volume(v),
                Ok(EngineCmd::Quit) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => self.tick(),
            }
        }

        if let Some(s) = self.sink.take() {
            s.stop();
        }
        let _ = self.events.send(EngineEvent::Shutdown);
        debug!("engine thread exiting");
    }

    fn emit(&self, event: EngineEvent) {
        if self.events.send(event).is_err() {
            debug!("engine event dropped: no translator");
        }
    }

    /// Property changes are informational; drop them rather than block playback.
    fn emit_property(&self, property: Property) {
        let _ = self
            .events
            .try_send(EngineEvent::PropertyChanged { property });
    }

    fn publish(&self, f: impl FnOnce(&mut EngineProps)) {
        if let Ok(mut p) = self.props.lock() {
            f(&mut p);
        }
    }

    fn elapsed(&self) -> Duration {
        self.accumulated + self.started_at.map_or(Duration::ZERO, |st| st.elapsed())
    }

    fn unload(&mut self) {
        if let Some(s) = self.sink.take() {
            s.stop();
        }
        self.media = None;
        self.started_at = None;
        self.accumulated = Duration::ZERO;
        self.duration = None;
        self.last_reported_secs = None;
        self.publish(|p| {
            p.idle = true;
            p.position = 0.0;
            p.duration = 0;
        });
    }

    fn load(&mut self, uri: &str) {
        if self.sink.is_some() {
            self.unload();
            self.emit(EngineEvent::EndOfFile {
                reason: EndReason::Replaced,
            });
        }

        self.publish(|p| p.idle = false);
        self.emit(EngineEvent::StartOfFile);

        let opened = open_media(uri, &self.http).and_then(|media| {
            let (sink, total) = create_sink_at(&self.stream, &media, Duration::ZERO)?;
            Ok((media, sink, total))
        });
        let (media, sink, total) = match opened {
            Ok(v) => v,
            Err(e) => {
                warn!("engine: cannot play {uri}: {e}");
                self.unload();
                self.emit(EngineEvent::EndOfFile {
                    reason: EndReason::Error,
                });
                return;
            }
        };

        sink.set_volume(self.volume as f32 / 100.0);
        if !self.paused {
            sink.play();
            self.started_at = Some(Instant::now());
        }
        self.sink = Some(sink);
        self.media = Some(media);
        self.accumulated = Duration::ZERO;
        self.duration = total;
        self.last_reported_secs = Some(0);

        let duration_secs = total.map_or(0, |d| d.as_secs() as i64);
        self.publish(|p| {
            p.position = 0.0;
            p.duration = duration_secs;
        });
        self.emit_property(Property::Duration);
        self.emit_property(Property::Position);
    }

    fn stop(&mut self, reason: EndReason) {
        if self.sink.is_none() {
            return;
        }
        self.unload();
        self.emit(EngineEvent::EndOfFile { reason });
    }

    fn toggle_pause(&mut self) {
        if let Some(ref s) = self.sink {
            if self.paused {
                s.play();
                self.started_at = Some(Instant::now());
            } else {
                s.pause();
                if let Some(st) = self.started_at.take() {
                    self.accumulated += st.elapsed();
                }
            }
        }
        self.paused = !self.paused;
        let paused = self.paused;
        self.publish(|p| p.paused = paused);
    }

    fn seek(&mut self, seek: Seek) {
        // Scrubbing: rebuild the current sink and skip into the media.
        let Some(media) = self.media.clone() else {
            debug!("engine: seek ignored, nothing loaded");
            return;
        };

        let current = self.elapsed().as_secs() as i64;
        let mut target = match seek {
            Seek::Relative(delta) => current.saturating_add(delta).max(0) as u64,
            Seek::Absolute(secs) => secs,
        };
        if let Some(total) = self.duration {
            target = target.min(total.as_secs());
        }
        let start_at = Duration::from_secs(target);

        let (sink, _) = match create_sink_at(&self.stream, &media, start_at) {
            Ok(v) => v,
            Err(e) => {
                error!("engine: seek failed: {e}");
                return;
            }
        };
        if let Some(old) = self.sink.take() {
            old.stop();
        }
        sink.set_volume(self.volume as f32 / 100.0);
        if !self.paused {
            sink.play();
            self.started_at = Some(Instant::now());
        } else {
            self.started_at = None;
        }
        self.sink = Some(sink);
        self.accumulated = start_at;
        self.last_reported_secs = Some(target);

        self.publish(|p| p.position = target as f64);
        self.emit_property(Property::Position);
    }

    fn set_volume(&mut self, volume: i64) {
        self.volume = volume.clamp(0, 100);
        if let Some(ref s) = self.sink {
            s.set_volume(self.volume as f32 / 100.0);
        }
        let v = self.volume;
        self.publish(|p| p.volume = v);
        self.emit_property(Property::Volume);
    }

    fn tick(&mut self) {
        let Some(ref sink) = self.sink else {
            return;
        };

        if !self.paused && sink.empty() {
            self.stop(EndReason::Eof);
            return;
        }

        let elapsed = self.elapsed();
        let secs = elapsed.as_secs();
        if self.last_reported_secs != Some(secs) {
            self.last_reported_secs = Some(secs);
            self.publish(|p| p.position = elapsed.as_secs_f64());
            self.emit_property(Property::Position);
        }
    }
}
