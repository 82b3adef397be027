use std::{env, path::PathBuf};

use super::schema::Settings;

/// Configuration loading helpers.
///
/// `Settings::load` reads an optional config file, then lets environment
/// variables (prefix `TREMOLO__`) override it, and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("TREMOLO")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Reject settings the rest of the program cannot work with.
    pub fn validate(&self) -> Result<(), String> {
        if self.player.initial_volume > 100 {
            return Err("player.initial_volume must be <= 100".to_string());
        }
        if self.player.volume_step == 0 || self.player.volume_step > 100 {
            return Err("player.volume_step must be within 1..=100".to_string());
        }
        if self.player.event_capacity == 0 {
            return Err("player.event_capacity must be >= 1".to_string());
        }
        if self.player.stream_timeout_secs == 0 {
            return Err("player.stream_timeout_secs must be >= 1".to_string());
        }
        if self.ui.log_lines == 0 {
            return Err("ui.log_lines must be >= 1".to_string());
        }
        if self.ui.tick_ms == 0 {
            return Err("ui.tick_ms must be >= 1".to_string());
        }
        if self.server.host.trim().is_empty() {
            if self.server.scrobble {
                return Err("server.scrobble needs server.host".to_string());
            }
            if self.server.playlist.is_some() {
                return Err("server.playlist needs server.host".to_string());
            }
            if self.server.sync_queue {
                return Err("server.sync_queue needs server.host".to_string());
            }
        }
        Ok(())
    }
}

/// Resolve the config path from `TREMOLO_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("TREMOLO_CONFIG_PATH") {
        return Some(PathBuf::from(p));
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/tremolo/config.toml`
/// or `~/.config/tremolo/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    };

    config_home.map(|d| d.join("tremolo").join("config.toml"))
}
