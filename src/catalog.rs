//! Remote catalog service (Subsonic API): playlists, stream URLs, the saved
//! play queue and scrobbles.

mod subsonic;

use thiserror::Error;

use crate::library::Track;

pub use subsonic::SubsonicClient;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered with HTTP {0}")]
    Status(u16),

    /// The server understood the request and refused it.
    #[error("server error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("invalid server URL: {0}")]
    InvalidUrl(String),

    #[error("no catalog server configured")]
    NotConfigured,

    #[error("no playlist named or numbered {0:?}")]
    UnknownPlaylist(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Listening reports sent to the catalog service.
pub trait Scrobbler: Send + Sync {
    /// Tell the server `id` started playing. Not counted as a play.
    fn submit_now_playing(&self, id: &str) -> Result<()>;
    /// Record a completed play of `id`.
    fn submit_played(&self, id: &str) -> Result<()>;
}

/// One row of the server's playlist listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub song_count: u32,
}

/// Pick the playlist `wanted` names: an exact id first, then a
/// case-insensitive name.
pub fn find_playlist<'a>(
    playlists: &'a [PlaylistSummary],
    wanted: &str,
) -> Result<&'a PlaylistSummary> {
    let wanted = wanted.trim();
    playlists
        .iter()
        .find(|p| p.id == wanted)
        .or_else(|| playlists.iter().find(|p| p.name.eq_ignore_ascii_case(wanted)))
        .ok_or_else(|| CatalogError::UnknownPlaylist(wanted.to_string()))
}

/// A play queue as stored on the server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavedQueue {
    pub tracks: Vec<Track>,
    /// Id of the track that was playing.
    pub current: Option<String>,
    pub position_ms: u64,
}

impl SavedQueue {
    /// The tracks from `current` on; everything before it was already heard.
    /// An unknown or missing `current` keeps the whole queue.
    pub fn remaining(self) -> Vec<Track> {
        let start = self
            .current
            .as_deref()
            .and_then(|c| self.tracks.iter().position(|t| t.id == c))
            .unwrap_or(0);
        self.tracks.into_iter().skip(start).collect()
    }
}

/// Server-side persistence of the play queue.
pub trait PlayQueueStore: Send + Sync {
    fn load_queue(&self) -> Result<SavedQueue>;
    fn save_queue(&self, ids: &[&str], current: Option<&str>, position_ms: u64) -> Result<()>;
}
