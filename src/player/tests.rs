use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, bounded};
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::*;
use crate::engine::fake::{Call, FakeEngine};
use crate::engine::{EndReason, Engine, EngineEvent, Property, PropertyValue};

fn track(id: &str, secs: u32) -> Track {
    Track {
        id: id.to_string(),
        uri: format!("/music/{id}.flac"),
        title: id.to_string(),
        duration_secs: secs,
        ..Track::default()
    }
}

struct Harness {
    engine: Arc<FakeEngine>,
    controller: Controller,
    events: Receiver<DomainEvent>,
}

impl Harness {
    fn new() -> Self {
        let engine = Arc::new(FakeEngine::new());
        let (tx, rx) = bounded(64);
        let notifier = Arc::new(Notifier::new(tx));
        let controller = Controller::new(engine.clone() as Arc<dyn Engine>, notifier);
        Self {
            engine,
            controller,
            events: rx,
        }
    }

    fn with_queue(tracks: &[Track]) -> Self {
        let h = Self::new();
        for t in tracks {
            h.controller.enqueue(t.clone());
        }
        h
    }

    fn drain(&self) -> Vec<DomainEvent> {
        self.events.try_iter().collect()
    }

    fn ids(&self) -> Vec<String> {
        self.controller
            .queue_snapshot()
            .into_iter()
            .map(|t| t.id)
            .collect()
    }

    /// Bring the controller to Playing with the head loaded.
    fn start(&self) {
        self.controller.toggle_pause().unwrap();
        self.controller.translate(EngineEvent::StartOfFile);
        self.drain();
        self.engine.clear_calls();
    }
}

#[test]
fn toggle_twice_from_stopped_loads_then_plays_then_pauses() {
    let t1 = track("t1", 20);
    let h = Harness::with_queue(&[t1.clone()]);

    h.controller.toggle_pause().unwrap();
    assert_eq!(
        h.engine.calls(),
        vec![
            Call::Load(t1.uri.clone()),
            Call::Set(Property::Pause, PropertyValue::Flag(false)),
        ]
    );
    assert_eq!(h.controller.status(), PlaybackStatus::Loading);
    assert!(h.drain().is_empty());

    h.controller.translate(EngineEvent::StartOfFile);
    assert_eq!(h.drain(), vec![DomainEvent::Playing(Some(t1.clone()))]);

    h.controller.toggle_pause().unwrap();
    assert_eq!(h.drain(), vec![DomainEvent::Paused(Some(t1))]);
    assert_eq!(h.controller.status(), PlaybackStatus::Paused);
}

#[test]
fn end_of_file_during_replace_is_ignored() {
    let h = Harness::with_queue(&[track("a", 100), track("b", 100)]);
    h.start();

    h.controller.play_track(track("c", 100)).unwrap();
    h.drain();
    h.controller.translate(EngineEvent::EndOfFile {
        reason: EndReason::Replaced,
    });

    assert!(h.drain().is_empty());
    assert_eq!(h.ids(), vec!["c"]);
    assert_eq!(h.controller.status(), PlaybackStatus::Loading);
}

#[test]
fn remove_out_of_range_leaves_queue_alone() {
    let h = Harness::with_queue(&[track("a", 1), track("b", 1), track("c", 1)]);
    let err = h.controller.remove_at(5).unwrap_err();
    assert!(matches!(
        err,
        PlayerError::IndexOutOfRange { index: 5, len: 3 }
    ));
    assert_eq!(h.ids(), vec!["a", "b", "c"]);
}

#[test]
fn currently_playing_requires_a_playing_head() {
    let h = Harness::new();
    assert!(matches!(
        h.controller.currently_playing(),
        Err(PlayerError::EmptyQueue)
    ));

    h.controller.enqueue(track("a", 60));
    h.start();
    assert_eq!(h.controller.currently_playing().unwrap().id, "a");

    h.controller.toggle_pause().unwrap();
    assert!(matches!(
        h.controller.currently_playing(),
        Err(PlayerError::NotPlaying)
    ));
}

#[test]
fn stop_twice_issues_one_engine_stop() {
    let h = Harness::with_queue(&[track("a", 60)]);
    h.start();

    h.controller.stop().unwrap();
    h.controller.stop().unwrap();
    assert_eq!(h.engine.calls(), vec![Call::Stop]);

    h.controller.translate(EngineEvent::EndOfFile {
        reason: EndReason::Stopped,
    });
    assert_eq!(h.drain(), vec![DomainEvent::Stopped]);
    assert_eq!(h.controller.status(), PlaybackStatus::Stopped);
}

#[test]
fn advance_loads_new_head_only_when_loaded() {
    let h = Harness::with_queue(&[track("a", 60), track("b", 60), track("c", 60)]);

    // Nothing loaded: just drop the head.
    h.controller.advance_to_next().unwrap();
    assert!(h.engine.calls().is_empty());
    assert_eq!(h.ids(), vec!["b", "c"]);

    h.start();
    h.controller.advance_to_next().unwrap();
    assert_eq!(h.engine.calls(), vec![Call::Load("/music/c.flac".into())]);
    assert_eq!(h.ids(), vec!["c"]);
    assert_eq!(h.controller.status(), PlaybackStatus::Loading);
}

#[test]
fn advance_on_last_track_stops_and_empties() {
    let h = Harness::with_queue(&[track("a", 60)]);
    h.start();

    h.controller.advance_to_next().unwrap();
    assert_eq!(h.engine.calls(), vec![Call::Stop]);
    assert!(h.ids().is_empty());
    assert_eq!(h.controller.status(), PlaybackStatus::Stopped);
}

#[test]
fn natural_end_advances_and_announces_next_track() {
    let a = track("a", 60);
    let b = track("b", 60);
    let h = Harness::with_queue(&[a, b.clone()]);
    h.start();
    // The engine went idle by itself.
    h.engine.set_idle(true);

    h.controller.translate(EngineEvent::EndOfFile {
        reason: EndReason::Eof,
    });
    assert_eq!(h.engine.calls(), vec![Call::Load(b.uri.clone())]);
    assert_eq!(h.ids(), vec!["b"]);

    h.controller.translate(EngineEvent::StartOfFile);
    assert_eq!(h.drain(), vec![DomainEvent::Playing(Some(b))]);
}

#[test]
fn natural_end_of_last_track_stops() {
    let h = Harness::with_queue(&[track("a", 60)]);
    h.start();
    h.engine.set_idle(true);

    h.controller.translate(EngineEvent::EndOfFile {
        reason: EndReason::Eof,
    });
    assert_eq!(h.drain(), vec![DomainEvent::Stopped]);
    assert!(h.ids().is_empty());
    assert_eq!(h.controller.status(), PlaybackStatus::Stopped);
}

#[test]
fn failed_engine_command_leaves_state_unchanged() {
    let h = Harness::with_queue(&[track("a", 60), track("b", 60)]);
    h.start();
    h.engine.fail_commands(true);

    let err = h.controller.play_track(track("z", 60)).unwrap_err();
    assert!(matches!(err, PlayerError::EngineCommandFailed(_)));
    assert_eq!(h.ids(), vec!["a", "b"]);
    assert_eq!(h.controller.status(), PlaybackStatus::Playing);

    assert!(h.controller.advance_to_next().is_err());
    assert_eq!(h.ids(), vec!["a", "b"]);

    assert!(h.controller.stop().is_err());
    assert_eq!(h.controller.status(), PlaybackStatus::Playing);
    assert!(h.drain().is_empty());
}

#[test]
fn start_of_file_while_stopped_is_ignored() {
    let h = Harness::with_queue(&[track("a", 60)]);
    h.controller.translate(EngineEvent::StartOfFile);
    assert!(h.drain().is_empty());
    assert_eq!(h.controller.status(), PlaybackStatus::Stopped);
}

#[test]
fn start_of_file_with_unreadable_pause_emits_nothing() {
    let h = Harness::with_queue(&[track("a", 60)]);
    h.controller.toggle_pause().unwrap();
    h.engine.fail_reads(true);

    h.controller.translate(EngineEvent::StartOfFile);
    assert!(h.drain().is_empty());
    assert_eq!(h.controller.status(), PlaybackStatus::Loading);
}

#[test]
fn property_changes_update_snapshot_and_emit_status() {
    let h = Harness::new();
    h.engine.set_position(12.7);
    h.engine.set_duration(180);

    h.controller.translate(EngineEvent::PropertyChanged {
        property: Property::Position,
    });
    h.controller.translate(EngineEvent::PropertyChanged {
        property: Property::Duration,
    });
    h.controller.translate(EngineEvent::PropertyChanged {
        property: Property::Volume,
    });

    let snap = h.controller.snapshot();
    assert_eq!(snap.position, 12);
    assert_eq!(snap.time_pos, 12.7);
    assert_eq!(snap.duration, 180);
    assert_eq!(snap.volume, 50);
    assert_eq!(h.drain(), vec![DomainEvent::Status; 3]);
}

#[test]
fn unreadable_property_keeps_stale_value() {
    let h = Harness::new();
    h.engine.set_duration(90);
    h.controller.translate(EngineEvent::PropertyChanged {
        property: Property::Duration,
    });
    h.engine.set_duration(300);
    h.engine.fail_reads(true);
    h.controller.translate(EngineEvent::PropertyChanged {
        property: Property::Duration,
    });

    assert_eq!(h.controller.snapshot().duration, 90);
    assert_eq!(h.drain(), vec![DomainEvent::Status, DomainEvent::Status]);
}

#[test]
fn pause_and_idle_changes_do_not_emit_status() {
    let h = Harness::new();
    h.controller.translate(EngineEvent::PropertyChanged {
        property: Property::Pause,
    });
    h.controller.translate(EngineEvent::Idle);
    assert!(h.drain().is_empty());
}

#[test]
fn shutdown_ends_translation() {
    let h = Harness::new();
    assert_eq!(h.controller.translate(EngineEvent::Shutdown), Flow::Exit);
    assert_eq!(
        h.controller.translate(EngineEvent::Unhandled {
            raw: "client-message".into()
        }),
        Flow::Continue
    );
}

#[test]
fn song_change_callbacks_run_before_playing_callbacks() {
    let h = Harness::with_queue(&[track("a", 60)]);
    let log = Arc::new(Mutex::new(Vec::new()));

    let l = log.clone();
    h.controller
        .notifier()
        .on_playing(move || l.lock().unwrap().push("playing".to_string()));
    let l = log.clone();
    h.controller
        .notifier()
        .on_song_change(move |t| l.lock().unwrap().push(format!("song {}", t.id)));

    h.start();
    assert_eq!(*log.lock().unwrap(), vec!["song a", "playing"]);
}

#[test]
fn previous_restarts_the_head() {
    let a = track("a", 60);
    let h = Harness::with_queue(&[a.clone(), track("b", 60)]);
    h.start();

    h.controller.previous().unwrap();
    assert_eq!(
        h.engine.calls(),
        vec![
            Call::Stop,
            Call::Load(a.uri.clone()),
            Call::Set(Property::Pause, PropertyValue::Flag(false)),
        ]
    );
    assert_eq!(h.ids(), vec!["a", "b"]);

    // The engine reports the stop, then the restart.
    h.controller.translate(EngineEvent::EndOfFile {
        reason: EndReason::Stopped,
    });
    h.controller.translate(EngineEvent::StartOfFile);
    assert_eq!(h.ids(), vec!["a", "b"]);
    assert_eq!(h.drain(), vec![DomainEvent::Playing(Some(a.clone()))]);
    assert_eq!(h.controller.status(), PlaybackStatus::Playing);
    assert_eq!(h.engine.calls().len(), 3);
}

#[test]
fn previous_on_single_track_survives_the_stop_event() {
    let a = track("a", 60);
    let h = Harness::with_queue(&[a.clone()]);
    h.start();

    h.controller.previous().unwrap();
    h.controller.translate(EngineEvent::EndOfFile {
        reason: EndReason::Stopped,
    });
    h.controller.translate(EngineEvent::StartOfFile);

    assert_eq!(h.ids(), vec!["a"]);
    assert_eq!(h.drain(), vec![DomainEvent::Playing(Some(a))]);
    assert_eq!(h.controller.status(), PlaybackStatus::Playing);
}

#[test]
fn late_stop_event_after_restart_does_not_advance() {
    let a = track("a", 60);
    let h = Harness::with_queue(&[a.clone(), track("b", 60)]);
    h.start();

    h.controller.previous().unwrap();
    h.controller.translate(EngineEvent::StartOfFile);
    h.controller.translate(EngineEvent::EndOfFile {
        reason: EndReason::Stopped,
    });

    assert_eq!(h.ids(), vec!["a", "b"]);
    assert_eq!(h.drain(), vec![DomainEvent::Playing(Some(a))]);
    assert_eq!(h.controller.status(), PlaybackStatus::Playing);
}

#[test]
fn broken_track_is_skipped() {
    let c = track("c", 60);
    let h = Harness::with_queue(&[track("a", 60), track("b", 60), c.clone()]);
    h.start();

    h.controller.next().unwrap();
    h.engine.clear_calls();
    // b fails before it ever starts.
    h.controller.translate(EngineEvent::EndOfFile {
        reason: EndReason::Error,
    });
    assert_eq!(h.ids(), vec!["c"]);
    assert_eq!(h.engine.calls(), vec![Call::Load(c.uri.clone())]);
    assert_eq!(h.controller.status(), PlaybackStatus::Loading);

    h.controller.translate(EngineEvent::StartOfFile);
    assert_eq!(h.drain(), vec![DomainEvent::Playing(Some(c))]);
}

#[test]
fn broken_last_track_stops() {
    let h = Harness::with_queue(&[track("a", 60)]);
    h.start();

    h.controller.translate(EngineEvent::EndOfFile {
        reason: EndReason::Error,
    });
    assert!(h.ids().is_empty());
    assert_eq!(h.controller.status(), PlaybackStatus::Stopped);
    assert_eq!(h.drain(), vec![DomainEvent::Stopped]);
}

#[test]
fn play_track_unpauses_before_loading() {
    let h = Harness::with_queue(&[track("a", 60)]);
    h.start();
    h.controller.toggle_pause().unwrap();
    h.engine.clear_calls();

    let z = track("z", 60);
    h.controller.play_track(z.clone()).unwrap();
    assert_eq!(h.engine.calls(), vec![Call::TogglePause, Call::Load(z.uri)]);
    assert_eq!(h.ids(), vec!["z"]);
}

#[test]
fn toggle_on_empty_queue_reports_stopped() {
    let h = Harness::new();
    h.controller.toggle_pause().unwrap();
    assert_eq!(h.drain(), vec![DomainEvent::Stopped]);
    assert!(h.engine.calls().is_empty());
}

#[test]
fn remove_head_advances_and_remove_only_entry_clears() {
    let h = Harness::with_queue(&[track("a", 60), track("b", 60), track("c", 60)]);
    h.start();

    h.controller.remove_at(2).unwrap();
    assert_eq!(h.ids(), vec!["a", "b"]);
    assert!(h.engine.calls().is_empty());

    h.controller.remove_at(0).unwrap();
    assert_eq!(h.ids(), vec!["b"]);
    assert_eq!(h.engine.calls(), vec![Call::Load("/music/b.flac".into())]);

    h.controller.translate(EngineEvent::StartOfFile);
    h.engine.clear_calls();
    h.controller.remove_at(0).unwrap();
    assert!(h.ids().is_empty());
    assert_eq!(h.engine.calls(), vec![Call::Stop]);
}

#[test]
fn remove_head_then_engine_events_play_the_new_head() {
    let b = track("b", 60);
    let h = Harness::with_queue(&[track("a", 60), b.clone(), track("c", 60)]);
    h.start();

    h.controller.remove_at(0).unwrap();
    h.controller.translate(EngineEvent::EndOfFile {
        reason: EndReason::Replaced,
    });
    h.controller.translate(EngineEvent::StartOfFile);

    assert_eq!(h.ids(), vec!["b", "c"]);
    assert_eq!(h.drain(), vec![DomainEvent::Playing(Some(b))]);
}

#[test]
fn remove_only_entry_then_stop_event_reports_stopped() {
    let h = Harness::with_queue(&[track("a", 60)]);
    h.start();

    h.controller.remove_at(0).unwrap();
    h.controller.translate(EngineEvent::EndOfFile {
        reason: EndReason::Stopped,
    });

    assert!(h.ids().is_empty());
    assert_eq!(h.controller.status(), PlaybackStatus::Stopped);
    assert_eq!(h.drain(), vec![DomainEvent::Stopped]);
}

#[test]
fn volume_is_clamped_and_adjusted_from_current() {
    let h = Harness::new();
    h.controller.set_volume(150).unwrap();
    h.controller.adjust_volume(-30).unwrap();
    assert_eq!(
        h.engine.calls(),
        vec![
            Call::Set(Property::Volume, PropertyValue::Int(100)),
            Call::Set(Property::Volume, PropertyValue::Int(70)),
        ]
    );
}

#[test]
fn clear_stops_and_empties() {
    let h = Harness::with_queue(&[track("a", 60), track("b", 60)]);
    h.start();
    h.controller.clear().unwrap();
    assert!(h.ids().is_empty());
    assert_eq!(h.controller.status(), PlaybackStatus::Stopped);
    assert_eq!(h.engine.calls(), vec![Call::Stop]);
}

#[test]
fn full_ui_queue_never_blocks_commands() {
    let engine = Arc::new(FakeEngine::new());
    let (tx, rx) = bounded(2);
    let notifier = Arc::new(Notifier::new(tx));
    let controller = Controller::new(engine.clone() as Arc<dyn Engine>, notifier);
    let paused = Arc::new(Mutex::new(0));
    let p = paused.clone();
    controller.notifier().on_paused(move || *p.lock().unwrap() += 1);

    controller.enqueue(track("a", 60));
    for _ in 0..2 {
        controller.translate(EngineEvent::PropertyChanged {
            property: Property::Position,
        });
    }

    // Same thread as the receiver: a blocking send would never return.
    controller.toggle_pause().unwrap();
    controller.translate(EngineEvent::StartOfFile);
    controller.toggle_pause().unwrap();

    assert_eq!(controller.status(), PlaybackStatus::Paused);
    assert_eq!(*paused.lock().unwrap(), 1);
    assert_eq!(
        rx.try_iter().collect::<Vec<_>>(),
        vec![DomainEvent::Status; 2]
    );
}

fn queue_of(n: usize) -> Queue {
    let mut q = Queue::new();
    for i in 0..n {
        q.enqueue(track(&format!("t{i}"), 60));
    }
    q
}

fn queue_ids(q: &Queue) -> Vec<String> {
    q.iter().map(|t| t.id.clone()).collect()
}

#[test]
fn enqueue_appends_without_dedup() {
    let mut q = Queue::new();
    q.enqueue(track("a", 1));
    q.enqueue(track("a", 1));
    assert_eq!(queue_ids(&q), vec!["a", "a"]);
}

#[test]
fn queue_remove_out_of_range_leaves_queue_unchanged() {
    let mut q = queue_of(3);
    let before = q.clone();
    let err = q.remove_at(5).unwrap_err();
    assert!(matches!(err, PlayerError::IndexOutOfRange { index: 5, len: 3 }));
    assert_eq!(q, before);
}

#[test]
fn pop_front_promotes_second_entry() {
    let mut q = queue_of(3);
    assert_eq!(q.pop_front().unwrap().id, "t0");
    assert_eq!(q.peek().unwrap().id, "t1");
    assert_eq!(q.len(), 2);
}

#[test]
fn moves_at_the_boundaries_are_noops() {
    let mut q = queue_of(3);
    let before = q.clone();
    assert!(!q.move_up(0));
    assert!(!q.move_down(2));
    assert!(!q.move_down(7));
    assert!(!q.move_up(usize::MAX));
    assert!(!q.move_down(usize::MAX));
    assert_eq!(q, before);

    let mut empty = Queue::new();
    assert!(!empty.move_down(0));
    assert!(!empty.move_down(usize::MAX));
}

#[test]
fn moves_swap_neighbours() {
    let mut q = queue_of(3);
    assert!(q.move_up(2));
    assert_eq!(queue_ids(&q), vec!["t0", "t2", "t1"]);
    assert!(q.move_down(0));
    assert_eq!(queue_ids(&q), vec!["t2", "t0", "t1"]);
}

#[test]
fn shuffle_preserves_the_multiset() {
    let mut rng = StdRng::seed_from_u64(7);
    for n in [0usize, 1, 2, 5, 40] {
        let mut q = queue_of(n);
        q.enqueue(track("t0", 60));
        let mut before = queue_ids(&q);
        q.shuffle_with(&mut rng);
        let mut after = queue_ids(&q);
        before.sort();
        after.sort();
        assert_eq!(before, after, "n = {n}");
    }
}

#[test]
fn peek_on_empty_queue_is_an_error() {
    assert!(matches!(Queue::new().peek(), Err(PlayerError::EmptyQueue)));
}
