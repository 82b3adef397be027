use std::path::PathBuf;

use serde::Deserialize;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/tremolo/config.toml` or `~/.config/tremolo/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `TREMOLO__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub player: PlayerSettings,
    pub ui: UiSettings,
    pub library: LibrarySettings,
    pub remote: RemoteSettings,
    pub logging: LoggingSettings,
}

/// Subsonic-compatible catalog server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Base URL, e.g. `https://music.example.org`. Empty means local files only.
    pub host: String,
    pub username: String,
    pub password: String,
    /// Report now-playing and played tracks to the server.
    pub scrobble: bool,
    /// Playlist (id or name) to load into the library view instead of
    /// scanning a directory.
    pub playlist: Option<String>,
    /// Send the password (hex-encoded) instead of a salted token. Only for
    /// servers that cannot check tokens, e.g. LDAP-backed ones.
    pub plaintext_auth: bool,
    /// Restore the server-side play queue at startup and save it on exit.
    pub sync_queue: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Volume at startup, 0..=100.
    pub initial_volume: u8,
    /// Number of seconds to scrub when pressing `H` / `L`.
    pub scrub_seconds: u64,
    /// Volume change per `+` / `-` press.
    pub volume_step: u8,
    /// Capacity of the engine and domain event queues.
    pub event_capacity: usize,
    /// Upper bound on fetching one remote stream, in seconds.
    pub stream_timeout_secs: u64,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            initial_volume: 70,
            scrub_seconds: 5,
            volume_step: 5,
            event_capacity: 256,
            stream_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// The text rendered inside the top header box.
    pub header_text: String,
    /// How many log lines the log pane keeps.
    pub log_lines: usize,
    /// Redraw interval when nothing else happens (milliseconds).
    pub tick_ms: u64,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            header_text: " tremolo ".to_string(),
            log_lines: 200,
            tick_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            extensions: vec!["mp3".into(), "flac".into(), "wav".into(), "ogg".into()],
            follow_links: true,
            include_hidden: false,
            recursive: true,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// Expose playback over MPRIS2 on the session bus.
    pub mpris: bool,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self { mpris: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive, e.g. `info` or `tremolo::player=debug`. `RUST_LOG` wins.
    pub level: String,
    /// Also append log lines to this file.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}
