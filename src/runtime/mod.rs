use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Sender, bounded};
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{error, info, warn};

use crate::app::App;
use crate::catalog::{CatalogError, SubsonicClient, find_playlist};
use crate::config::Settings;
use crate::engine::{Engine, RodioEngine};
use crate::library::{Track, scan};
use crate::player::{Controller, EventTranslator, Notifier};
use crate::scrobble::spawn_scrobbler;
use crate::{logging, mpris};

mod event_loop;
mod queue_sync;
mod settings;


pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, config_warning) = settings::load_settings();
    let log_lines = logging::init(&settings.logging, settings.ui.log_lines)?;
    if let Some(msg) = config_warning {
        warn!("{msg}");
    }

    let catalog = if settings.server.host.trim().is_empty() {
        None
    } else {
        Some(Arc::new(SubsonicClient::new(&settings.server)?))
    };

    let (tracks, source) = load_library(&settings, catalog.as_deref())?;
    info!("{} tracks from {source}", tracks.len());

    let (engine, engine_events) = RodioEngine::spawn(
        settings.player.initial_volume,
        settings.player.event_capacity,
        Duration::from_secs(settings.player.stream_timeout_secs),
    )?;
    let engine = Arc::new(engine);
    let (events_tx, events_rx) = bounded(settings.player.event_capacity);
    let notifier = Arc::new(Notifier::new(events_tx));
    let controller = Controller::new(engine.clone() as Arc<dyn Engine>, notifier);
    let translator = EventTranslator::new(controller.clone(), engine_events).spawn()?;

    let queue_store = catalog.as_ref().filter(|_| settings.server.sync_queue);
    if let Some(client) = queue_store {
        queue_sync::restore_queue(&**client, &controller);
    }

    let scrobble = if let Some(client) = catalog.clone().filter(|_| settings.server.scrobble) {
        if let Err(e) = client.ping() {
            warn!("catalog server not reachable, scrobbles may fail: {e}");
        }
        Some(spawn_scrobbler(
            client,
            Arc::new(controller.clone()),
            settings.player.event_capacity,
        )?)
    } else {
        None
    };

    let (quit_tx, quit_rx) = bounded::<()>(1);
    let _mpris = settings.remote.mpris.then(|| {
        let handle = mpris::spawn_mpris(controller.clone(), quit_tx.clone());
        handle.subscribe(controller.notifier(), &controller);
        handle
    });

    let (keys_tx, keys_rx) = bounded::<KeyEvent>(64);
    spawn_input_reader(keys_tx)?;

    let mut app = App::new(tracks, settings.ui.log_lines);
    app.set_source(source);
    app.set_queue(controller.queue_snapshot());
    app.snapshot = controller.snapshot();

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result = event_loop::run(
        &mut terminal,
        &settings,
        &mut app,
        &controller,
        scrobble.as_ref(),
        event_loop::Inputs {
            events: events_rx,
            logs: log_lines,
            keys: keys_rx,
            quit: quit_rx,
        },
    );

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Some(client) = queue_store {
        queue_sync::save_queue(&**client, &controller);
    }
    if let Err(e) = controller.stop() {
        warn!("stop on exit: {e}");
    }
    engine.shutdown();
    if translator.join().is_err() {
        error!("translator thread panicked");
    }
    if let Some(handle) = scrobble {
        handle.shutdown();
    }

    run_result
}

/// Tracks for the library pane plus a label describing where they came from.
fn load_library(
    settings: &Settings,
    catalog: Option<&SubsonicClient>,
) -> Result<(Vec<Track>, String), Box<dyn std::error::Error>> {
    if let Some(wanted) = &settings.server.playlist {
        let client = catalog.ok_or(CatalogError::NotConfigured)?;
        let playlists = client.get_playlists()?;
        let playlist = find_playlist(&playlists, wanted).inspect_err(|_| {
            let names: Vec<&str> = playlists.iter().map(|p| p.name.as_str()).collect();
            warn!("available playlists: {}", names.join(", "));
        })?;
        let tracks = client.get_playlist(&playlist.id)?;
        return Ok((tracks, format!("playlist {}", playlist.name)));
    }

    let dir = library_dir(env::args().nth(1));
    let tracks = scan(&dir, &settings.library);
    Ok((tracks, dir.display().to_string()))
}

fn library_dir(arg: Option<String>) -> PathBuf {
    arg.map(PathBuf::from)
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Forward key presses from the terminal to the event loop.
fn spawn_input_reader(keys: Sender<KeyEvent>) -> std::io::Result<()> {
    thread::Builder::new()
        .name("input".into())
        .spawn(move || {
            loop {
                match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                        if keys.send(key).is_err() {
                            return;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("terminal input: {e}");
                        return;
                    }
                }
            }
        })
        .map(|_| ())
}
