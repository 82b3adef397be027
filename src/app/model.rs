//! Presentation state: `App` and the small enums it is made of.
//!
//! Only the UI coordination loop mutates an `App`; everything here is plain
//! data plus cursor arithmetic.

use std::collections::VecDeque;

use crate::library::Track;
use crate::player::{DomainEvent, PlaybackStatus, RemoteSnapshot};

/// Which list receives navigation keys.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Library,
    Queue,
}

/// What the top bar reports.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Activity {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// The main application model.
pub struct App {
    pub library: Vec<Track>,
    /// Lowercased display strings, parallel to `library`, for filtering.
    lower_display: Vec<String>,
    /// Index into `library`.
    pub selected: usize,

    pub queue: Vec<Track>,
    pub queue_selected: usize,

    pub focus: Focus,
    pub activity: Activity,
    pub now_playing: Option<Track>,
    pub snapshot: RemoteSnapshot,

    pub filter_mode: bool,
    pub filter_query: String,

    pub logs: VecDeque<String>,
    log_capacity: usize,
    pub show_logs: bool,

    /// Where the library came from (directory or playlist), shown in the top bar.
    pub source: Option<String>,
}

impl App {
    pub fn new(library: Vec<Track>, log_capacity: usize) -> Self {
        let lower_display = library
            .iter()
            .map(|t| t.display().to_lowercase())
            .collect();
        Self {
            library,
            lower_display,
            selected: 0,
            queue: Vec::new(),
            queue_selected: 0,
            focus: Focus::Library,
            activity: Activity::Stopped,
            now_playing: None,
            snapshot: RemoteSnapshot::default(),
            filter_mode: false,
            filter_query: String::new(),
            logs: VecDeque::new(),
            log_capacity: log_capacity.max(1),
            show_logs: false,
            source: None,
        }
    }

    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = Some(source.into());
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Library => Focus::Queue,
            Focus::Queue => Focus::Library,
        };
    }

    pub fn toggle_logs(&mut self) {
        self.show_logs = !self.show_logs;
    }

    /// Append a log line, evicting the oldest beyond capacity.
    pub fn push_log(&mut self, line: String) {
        if self.logs.len() == self.log_capacity {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }

    /// Fold a domain event into the top bar state.
    pub fn apply_event(&mut self, event: &DomainEvent) {
        match event {
            DomainEvent::Playing(_) | DomainEvent::Unpaused(_) => {
                self.activity = Activity::Playing
            }
            DomainEvent::Paused(_) => self.activity = Activity::Paused,
            DomainEvent::Stopped => {
                self.activity = Activity::Stopped;
                self.now_playing = None;
            }
            DomainEvent::Status => {}
        }
        if let Some(track) = event.track() {
            self.now_playing = Some(track.clone());
        }
    }

    /// Reconcile the top bar with the controller's status, covering events
    /// the UI never received. `Loading` keeps whatever is shown.
    pub fn sync_status(&mut self, status: PlaybackStatus, head: Option<Track>) {
        match status {
            PlaybackStatus::Loading => return,
            PlaybackStatus::Stopped => {
                self.activity = Activity::Stopped;
                self.now_playing = None;
                return;
            }
            PlaybackStatus::Playing => self.activity = Activity::Playing,
            PlaybackStatus::Paused => self.activity = Activity::Paused,
        }
        if head.is_some() {
            self.now_playing = head;
        }
    }

    /// Replace the queue view, keeping the cursor in range.
    pub fn set_queue(&mut self, queue: Vec<Track>) {
        self.queue = queue;
        self.queue_selected = self.queue_selected.min(self.queue.len().saturating_sub(1));
    }

    /// Library indices that pass the current filter, in library order.
    pub fn visible_library(&self) -> Vec<usize> {
        let query = self.filter_query.trim().to_lowercase();
        if query.is_empty() {
            return (0..self.library.len()).collect();
        }
        (0..self.library.len())
            .filter(|&i| fuzzy_match_positions(&self.lower_display[i], &query).is_some())
            .collect()
    }

    pub fn selected_track(&self) -> Option<&Track> {
        self.visible_library()
            .contains(&self.selected)
            .then(|| self.library.get(self.selected))
            .flatten()
    }

    /// Move the cursor of the focused list down one row, wrapping.
    pub fn move_down(&mut self) {
        match self.focus {
            Focus::Library => {
                let view = self.visible_library();
                if view.is_empty() {
                    return;
                }
                let next = match view.iter().position(|&i| i == self.selected) {
                    Some(p) => view[(p + 1) % view.len()],
                    None => view[0],
                };
                self.selected = next;
            }
            Focus::Queue => {
                if !self.queue.is_empty() {
                    self.queue_selected = (self.queue_selected + 1) % self.queue.len();
                }
            }
        }
    }

    /// Move the cursor of the focused list up one row, wrapping.
    pub fn move_up(&mut self) {
        match self.focus {
            Focus::Library => {
                let view = self.visible_library();
                let Some(&last) = view.last() else { return };
                self.selected = match view.iter().position(|&i| i == self.selected) {
                    Some(0) | None => last,
                    Some(p) => view[p - 1],
                };
            }
            Focus::Queue => {
                if !self.queue.is_empty() {
                    self.queue_selected = self
                        .queue_selected
                        .checked_sub(1)
                        .unwrap_or(self.queue.len() - 1);
                }
            }
        }
    }

    pub fn jump_top(&mut self) {
        match self.focus {
            Focus::Library => {
                if let Some(&first) = self.visible_library().first() {
                    self.selected = first;
                }
            }
            Focus::Queue => self.queue_selected = 0,
        }
    }

    pub fn jump_bottom(&mut self) {
        match self.focus {
            Focus::Library => {
                if let Some(&last) = self.visible_library().last() {
                    self.selected = last;
                }
            }
            Focus::Queue => self.queue_selected = self.queue.len().saturating_sub(1),
        }
    }

    pub fn enter_filter_mode(&mut self) {
        self.filter_mode = true;
        self.focus = Focus::Library;
        self.ensure_selected_visible();
    }

    pub fn exit_filter_mode(&mut self) {
        self.filter_mode = false;
    }

    pub fn clear_filter(&mut self) {
        self.filter_query.clear();
        self.filter_mode = false;
        self.ensure_selected_visible();
    }

    pub fn push_filter_char(&mut self, c: char) {
        self.filter_query.push(c);
        self.ensure_selected_visible();
    }

    pub fn pop_filter_char(&mut self) {
        self.filter_query.pop();
        self.ensure_selected_visible();
    }

    fn ensure_selected_visible(&mut self) {
        let view = self.visible_library();
        match view.first() {
            None => self.selected = 0,
            Some(&first) if !view.contains(&self.selected) => self.selected = first,
            Some(_) => {}
        }
    }
}

/// Subsequence match: the char positions in `text` that match `query`, or
/// `None` when `query` is not a subsequence. Case-insensitive for ASCII.
pub fn fuzzy_match_positions(text: &str, query: &str) -> Option<Vec<usize>> {
    let mut positions = Vec::new();
    let mut chars = text.chars().enumerate();
    for qc in query.chars() {
        let qc = qc.to_ascii_lowercase();
        let (pos, _) = chars.find(|(_, tc)| tc.to_ascii_lowercase() == qc)?;
        positions.push(pos);
    }
    Some(positions)
}
