use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};

use super::worker::spawn_with;
use super::*;
use crate::catalog::{CatalogError, Scrobbler};
use crate::library::Track;
use crate::player::PlayerError;

fn track(id: &str, secs: u32) -> Track {
    Track {
        id: id.to_string(),
        duration_secs: secs,
        ..Track::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Submission {
    NowPlaying(String),
    Played(String),
}

struct RecordingScrobbler {
    tx: Sender<Submission>,
}

impl Scrobbler for RecordingScrobbler {
    fn submit_now_playing(&self, id: &str) -> Result<(), CatalogError> {
        let _ = self.tx.send(Submission::NowPlaying(id.to_string()));
        Ok(())
    }

    fn submit_played(&self, id: &str) -> Result<(), CatalogError> {
        let _ = self.tx.send(Submission::Played(id.to_string()));
        Err(CatalogError::NotConfigured)
    }
}

#[derive(Default)]
struct FixedSource(Mutex<Option<Track>>);

impl FixedSource {
    fn set(&self, track: Option<Track>) {
        *self.0.lock().unwrap() = track;
    }
}

impl NowPlayingSource for FixedSource {
    fn currently_playing(&self) -> Result<Track, PlayerError> {
        self.0.lock().unwrap().clone().ok_or(PlayerError::NotPlaying)
    }
}

fn spawn_fast(source: Arc<FixedSource>) -> (ScrobbleHandle, Receiver<Submission>) {
    let (tx, rx) = unbounded();
    let machine = ScrobbleMachine::with_delay(|secs| {
        (secs > 30).then(|| Duration::from_millis(u64::from(secs)))
    });
    let handle = spawn_with(machine, Arc::new(RecordingScrobbler { tx }), source, 8).unwrap();
    (handle, rx)
}

#[test]
fn delay_is_half_the_track_capped_at_four_minutes() {
    assert_eq!(submission_delay(20), None);
    assert_eq!(submission_delay(30), None);
    assert_eq!(submission_delay(31), Some(Duration::from_secs(15)));
    assert_eq!(submission_delay(200), Some(Duration::from_secs(100)));
    assert_eq!(submission_delay(500), Some(Duration::from_secs(240)));
}

#[test]
fn short_track_gets_now_playing_but_no_timer() {
    let mut m = ScrobbleMachine::new();
    let plan = m.on_playing(&track("t1", 20));
    assert_eq!(plan.now_playing, "t1");
    assert_eq!(m.state(), ScrobbleState::NowPlayingPending);

    m.now_playing_sent();
    assert_eq!(m.arm(&plan), None);
    assert_eq!(m.state(), ScrobbleState::Idle);
    assert_eq!(m.on_timer(Ok(track("t1", 20))), None);
}

#[test]
fn track_change_rearms_and_submits_only_the_new_track() {
    let mut m = ScrobbleMachine::new();
    let first = m.on_playing(&track("t1", 200));
    m.now_playing_sent();
    assert_eq!(m.arm(&first), Some(Duration::from_secs(100)));

    let second = m.on_playing(&track("t2", 500));
    m.now_playing_sent();
    assert_eq!(m.arm(&second), Some(Duration::from_secs(240)));
    assert_eq!(m.state(), ScrobbleState::SubmissionArmed);

    assert_eq!(m.on_timer(Ok(track("t2", 500))), Some("t2".to_string()));
    assert_eq!(m.state(), ScrobbleState::SubmissionSent);
    m.submitted();
    assert_eq!(m.state(), ScrobbleState::Idle);
}

#[test]
fn timer_while_not_playing_skips_submission() {
    let mut m = ScrobbleMachine::new();
    let plan = m.on_playing(&track("t1", 200));
    m.now_playing_sent();
    m.arm(&plan);

    assert_eq!(m.on_timer(Err(PlayerError::NotPlaying)), None);
    assert_eq!(m.state(), ScrobbleState::Idle);
}

#[test]
fn worker_submits_after_delay() {
    let source = Arc::new(FixedSource::default());
    source.set(Some(track("t1", 40)));
    let (handle, rx) = spawn_fast(source);

    handle.playing(track("t1", 40));
    let wait = Duration::from_secs(2);
    assert_eq!(
        rx.recv_timeout(wait).unwrap(),
        Submission::NowPlaying("t1".into())
    );
    // A failed submission is logged, not retried.
    assert_eq!(rx.recv_timeout(wait).unwrap(), Submission::Played("t1".into()));
    handle.shutdown();
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}

#[test]
fn worker_superseded_timer_never_fires() {
    let source = Arc::new(FixedSource::default());
    let (handle, rx) = spawn_fast(source.clone());

    source.set(Some(track("t2", 60)));
    handle.playing(track("t1", 400));
    handle.playing(track("t2", 60));

    let wait = Duration::from_secs(2);
    assert_eq!(
        rx.recv_timeout(wait).unwrap(),
        Submission::NowPlaying("t1".into())
    );
    assert_eq!(
        rx.recv_timeout(wait).unwrap(),
        Submission::NowPlaying("t2".into())
    );
    assert_eq!(rx.recv_timeout(wait).unwrap(), Submission::Played("t2".into()));
    // t1's 400ms timer was replaced.
    assert!(rx.recv_timeout(Duration::from_millis(600)).is_err());
    handle.shutdown();
}

#[test]
fn worker_skips_when_nothing_is_playing() {
    let source = Arc::new(FixedSource::default());
    let (handle, rx) = spawn_fast(source);

    handle.playing(track("t1", 40));
    assert_eq!(
        rx.recv_timeout(Duration::from_secs(2)).unwrap(),
        Submission::NowPlaying("t1".into())
    );
    assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    handle.shutdown();
}
