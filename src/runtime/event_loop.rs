use std::time::Duration;

use crossbeam_channel::{Receiver, never, select, tick};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::warn;

use crate::app::{App, Focus};
use crate::config;
use crate::player::{Controller, DomainEvent, PlayerError};
use crate::scrobble::ScrobbleHandle;
use crate::ui;

/// Everything the loop waits on.
pub struct Inputs {
    pub events: Receiver<DomainEvent>,
    pub logs: Receiver<String>,
    pub keys: Receiver<KeyEvent>,
    pub quit: Receiver<()>,
}

/// State tracked by the runtime event loop across iterations.
#[derive(Default)]
pub struct EventLoopState {
    /// Internal two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
}

/// Main terminal event loop. Returns `Ok(())` when shutdown is requested.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App,
    controller: &Controller,
    scrobble: Option<&ScrobbleHandle>,
    inputs: Inputs,
) -> Result<(), Box<dyn std::error::Error>> {
    let Inputs {
        events,
        mut logs,
        mut keys,
        quit,
    } = inputs;
    let ticker = tick(Duration::from_millis(settings.ui.tick_ms));
    let mut state = EventLoopState::default();

    loop {
        terminal.draw(|f| ui::draw(f, app, &settings.ui, &settings.player))?;

        select! {
            recv(events) -> event => match event {
                Ok(event) => handle_domain_event(event, app, controller, scrobble),
                Err(_) => return Ok(()),
            },
            recv(logs) -> line => match line {
                Ok(line) => app.push_log(line),
                Err(_) => logs = never(),
            },
            recv(keys) -> key => match key {
                Ok(key) => {
                    if handle_key_event(key, settings, app, controller, &mut state) {
                        return Ok(());
                    }
                }
                Err(_) => keys = never(),
            },
            recv(quit) -> _ => return Ok(()),
            recv(ticker) -> _ => refresh(app, controller),
        }
    }
}

pub(super) fn handle_domain_event(
    event: DomainEvent,
    app: &mut App,
    controller: &Controller,
    scrobble: Option<&ScrobbleHandle>,
) {
    app.apply_event(&event);
    match event {
        DomainEvent::Status => app.snapshot = controller.snapshot(),
        DomainEvent::Stopped => app.set_queue(controller.queue_snapshot()),
        DomainEvent::Playing(track) => {
            app.set_queue(controller.queue_snapshot());
            if let (Some(handle), Some(track)) = (scrobble, track) {
                handle.playing(track);
            }
        }
        DomainEvent::Unpaused(_) | DomainEvent::Paused(_) => {}
    }
}

fn report(what: &str, result: Result<(), PlayerError>) {
    if let Err(e) = result {
        warn!("{what}: {e}");
    }
}

/// Apply one key press. Returns `true` when the user asked to quit.
pub(super) fn handle_key_event(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    controller: &Controller,
    state: &mut EventLoopState,
) -> bool {
    if app.filter_mode {
        state.pending_gg = false;
        handle_filter_key(key, app, controller);
        return false;
    }

    if key.code != KeyCode::Char('g') {
        state.pending_gg = false;
    }

    let player = &settings.player;
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Tab => app.toggle_focus(),
        KeyCode::Char('/') => app.enter_filter_mode(),
        KeyCode::Char('?') => app.toggle_logs(),
        KeyCode::Char('g') => {
            if state.pending_gg {
                state.pending_gg = false;
                app.jump_top();
            } else {
                state.pending_gg = true;
            }
        }
        KeyCode::Char('G') => app.jump_bottom(),
        KeyCode::Char('j') | KeyCode::Down => app.move_down(),
        KeyCode::Char('k') | KeyCode::Up => app.move_up(),
        KeyCode::Enter if app.focus == Focus::Library => {
            if let Some(track) = app.selected_track().cloned() {
                report("play", controller.play_track(track));
            }
        }
        KeyCode::Char('a') => {
            if let Some(track) = app.selected_track().cloned() {
                controller.enqueue(track);
            }
        }
        KeyCode::Char('A') => {
            for track in &app.library {
                controller.enqueue(track.clone());
            }
        }
        KeyCode::Char(' ') | KeyCode::Char('p') => {
            report("toggle pause", controller.toggle_pause())
        }
        KeyCode::Char('l') => report("next", controller.next()),
        KeyCode::Char('h') => report("previous", controller.previous()),
        KeyCode::Char('S') => report("stop", controller.stop()),
        KeyCode::Char('L') => {
            let secs = player.scrub_seconds.min(i64::MAX as u64) as i64;
            report("seek", controller.seek_relative(secs));
        }
        KeyCode::Char('H') => {
            let secs = player.scrub_seconds.min(i64::MAX as u64) as i64;
            report("seek", controller.seek_relative(-secs));
        }
        KeyCode::Char('+') | KeyCode::Char('=') => report(
            "volume",
            controller.adjust_volume(i64::from(player.volume_step)),
        ),
        KeyCode::Char('-') => report(
            "volume",
            controller.adjust_volume(-i64::from(player.volume_step)),
        ),
        _ if app.focus == Focus::Queue => handle_queue_key(key, app, controller),
        _ => {}
    }

    refresh(app, controller);
    false
}

fn handle_queue_key(key: KeyEvent, app: &mut App, controller: &Controller) {
    let at = app.queue_selected;
    match key.code {
        KeyCode::Char('d') => report("remove", controller.remove_at(at)),
        KeyCode::Char('J') => {
            if controller.move_down(at) {
                app.queue_selected = at + 1;
            }
        }
        KeyCode::Char('K') => {
            if controller.move_up(at) {
                app.queue_selected = at - 1;
            }
        }
        KeyCode::Char('s') => controller.shuffle(),
        KeyCode::Char('c') => report("clear", controller.clear()),
        _ => {}
    }
}

fn handle_filter_key(key: KeyEvent, app: &mut App, controller: &Controller) {
    match key.code {
        KeyCode::Esc => app.clear_filter(),
        KeyCode::Backspace => app.pop_filter_char(),
        KeyCode::Down => app.move_down(),
        KeyCode::Up => app.move_up(),
        KeyCode::Enter => {
            let Some(track) = app.selected_track().cloned() else {
                return;
            };
            app.exit_filter_mode();
            report("play", controller.play_track(track));
            refresh(app, controller);
        }
        KeyCode::Char(c) if !c.is_control() => app.push_filter_char(c),
        _ => {}
    }
}

pub(super) fn refresh(app: &mut App, controller: &Controller) {
    app.set_queue(controller.queue_snapshot());
    app.snapshot = controller.snapshot();
    app.sync_status(controller.status(), app.queue.first().cloned());
}
