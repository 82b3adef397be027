use std::time::Duration;

/// A playable item, copied by value into the queue and into events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Track {
    /// Catalog id (or the file path for local tracks).
    pub id: String,
    /// What the engine loads: a stream URL or a local path.
    pub uri: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Length in whole seconds; 0 when unknown.
    pub duration_secs: u32,
    pub track_number: u32,
    pub disc_number: u32,
    pub cover_art: Option<String>,
}

impl Track {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.duration_secs))
    }

    /// Whether the track streams from a server rather than a local file.
    pub fn is_stream(&self) -> bool {
        self.uri.starts_with("http://") || self.uri.starts_with("https://")
    }

    /// "Artist - Title", or just the title when the artist is unknown.
    pub fn display(&self) -> String {
        let artist = self.artist.trim();
        if artist.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", artist, self.title)
        }
    }
}
