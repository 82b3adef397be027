//! UI rendering helpers for the terminal user interface.
//!
//! Pure functions of the `App` model; the runtime decides when to redraw.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Padding, Paragraph, Wrap},
};

use crate::app::{Activity, App, Focus, fuzzy_match_positions};
use crate::config::{PlayerSettings, UiSettings};

const CONTROLS: &[(&str, &str)] = &[
    ("tab", "library/queue"),
    ("j/k", "down/up"),
    ("gg/G", "top/bottom"),
    ("enter", "play"),
    ("a/A", "enqueue one/all"),
    ("space/p", "play/pause"),
    ("h/l", "restart/next"),
    ("S", "stop"),
    ("+/-", "volume"),
    ("/", "filter"),
    ("d J/K s c", "queue: remove, move, shuffle, clear"),
    ("?", "log"),
    ("q", "quit"),
];

fn controls_text(player: &PlayerSettings) -> String {
    let mut parts: Vec<String> = CONTROLS
        .iter()
        .map(|(k, v)| format!("[{k}] {v}"))
        .collect();
    // Scrub amount comes from config.
    parts.insert(7, format!("[H/L] scrub -/+{}s", player.scrub_seconds));
    parts.join(" | ")
}

/// Format seconds as `MM:SS`.
pub(crate) fn format_mmss(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

pub(crate) fn status_line(app: &App) -> String {
    let mut parts: Vec<String> = Vec::new();

    let activity = match app.activity {
        Activity::Stopped => "Stopped",
        Activity::Playing => "Playing",
        Activity::Paused => "Paused",
    };
    parts.push(activity.to_string());

    if let Some(track) = &app.now_playing {
        let snap = &app.snapshot;
        let total = if snap.duration > 0 {
            snap.duration
        } else {
            track.duration().as_secs()
        };
        parts.push(format!(
            "{} [{} / {}]",
            track.display(),
            format_mmss(snap.position),
            format_mmss(total)
        ));
    }

    parts.push(format!("Vol: {}%", app.snapshot.volume));

    let q = app.filter_query.trim();
    if app.filter_mode || !q.is_empty() {
        parts.push(format!("Filter: {q}"));
    }

    if let Some(source) = &app.source {
        parts.push(format!("From: {source}"));
    }

    parts.join(" • ")
}

/// Window of `total` rows of height `height` that keeps `selected` centered.
fn visible_window(total: usize, height: usize, selected: usize) -> (usize, usize) {
    if total <= height || height == 0 {
        return (0, total);
    }
    let half = height / 2;
    let mut start = selected.saturating_sub(half);
    if start + height > total {
        start = total - height;
    }
    (start, start + height)
}

/// Uppercase the matched characters so the filter hits stand out.
fn highlight_matches(text: &str, query: &str) -> String {
    let Some(positions) = fuzzy_match_positions(text, query) else {
        return text.to_string();
    };
    let mut out = String::with_capacity(text.len());
    let mut next = positions.into_iter().peekable();
    for (i, ch) in text.chars().enumerate() {
        if next.peek() == Some(&i) {
            out.extend(ch.to_uppercase());
            next.next();
        } else {
            out.push(ch);
        }
    }
    out
}

fn pane_block(title: &str, focused: bool) -> Block<'_> {
    let block = Block::default().borders(Borders::ALL).title(title);
    if focused {
        block.border_style(Style::default().add_modifier(Modifier::BOLD))
    } else {
        block
    }
}

fn draw_library(frame: &mut Frame, app: &App, area: Rect) {
    let view = app.visible_library();
    let sel_pos = view.iter().position(|&i| i == app.selected).unwrap_or(0);
    let height = area.height.saturating_sub(2) as usize;
    let (start, end) = visible_window(view.len(), height, sel_pos);
    let query = app.filter_query.trim();

    // Only build items for the visible window.
    let items: Vec<ListItem> = view[start..end]
        .iter()
        .map(|&i| {
            let text = app.library[i].display();
            if query.is_empty() {
                ListItem::new(text)
            } else {
                ListItem::new(highlight_matches(&text, query))
            }
        })
        .collect();

    let title = format!(" library ({}) ", view.len());
    let list = List::new(items)
        .block(pane_block(&title, app.focus == Focus::Library))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    if !view.is_empty() {
        state.select(Some(sel_pos - start));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_queue(frame: &mut Frame, app: &App, area: Rect) {
    let height = area.height.saturating_sub(2) as usize;
    let (start, end) = visible_window(app.queue.len(), height, app.queue_selected);

    let items: Vec<ListItem> = app.queue[start..end]
        .iter()
        .enumerate()
        .map(|(offset, track)| {
            let pos = start + offset;
            let marker = if pos == 0 && app.activity != Activity::Stopped {
                "♪ "
            } else {
                "  "
            };
            let line = Line::from(vec![
                Span::raw(marker),
                Span::raw(track.display()),
                Span::raw(format!("  {}", format_mmss(u64::from(track.duration_secs)))),
            ]);
            ListItem::new(line)
        })
        .collect();

    let title = format!(" queue ({}) ", app.queue.len());
    let list = List::new(items)
        .block(pane_block(&title, app.focus == Focus::Queue))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut state = ListState::default();
    if app.focus == Focus::Queue && !app.queue.is_empty() {
        state.select(Some(app.queue_selected - start));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_logs(frame: &mut Frame, app: &App, area: Rect) {
    let height = area.height.saturating_sub(2) as usize;
    let skip = app.logs.len().saturating_sub(height);
    let lines: Vec<Line> = app
        .logs
        .iter()
        .skip(skip)
        .map(|l| Line::from(l.as_str()))
        .collect();
    let logs = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" log "));
    frame.render_widget(logs, area);
}

/// Render the entire UI into the provided `frame`.
pub fn draw(frame: &mut Frame, app: &App, ui_settings: &UiSettings, player: &PlayerSettings) {
    let log_height = if app.show_logs { 10 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(log_height),
            Constraint::Length(4),
        ])
        .split(frame.area());

    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" tremolo ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    let status = Paragraph::new(status_line(app))
        .block(
            Block::bordered()
                .padding(Padding::left(1))
                .title(" status "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(status, chunks[1]);

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[2]);
    draw_library(frame, app, panes[0]);
    draw_queue(frame, app, panes[1]);

    if app.show_logs {
        draw_logs(frame, app, chunks[3]);
    }

    let footer = Paragraph::new(controls_text(player))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding::left(1)),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[4]);
}
