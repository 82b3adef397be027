use std::cmp::Ordering;
use std::path::Path;

use lofty::{AudioFile, ItemKey, TaggedFileExt};
use tracing::debug;
use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::model::Track;

pub(super) fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Parse "3/12" style tag values into the leading number.
fn leading_number(v: &str) -> u32 {
    v.split('/')
        .next()
        .and_then(|n| n.trim().parse().ok())
        .unwrap_or(0)
}

fn read_track(path: &Path) -> Track {
    let uri = path.display().to_string();
    let mut track = Track {
        id: uri.clone(),
        uri,
        title: path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("UNKNOWN")
            .to_string(),
        ..Track::default()
    };

    let tagged = match lofty::read_from_path(path) {
        Ok(t) => t,
        Err(e) => {
            debug!("no tags for {}: {e}", path.display());
            return track;
        }
    };

    track.duration_secs = tagged.properties().duration().as_secs().min(u64::from(u32::MAX)) as u32;

    if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
        let text = |key: &ItemKey| {
            tag.get_string(key)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        if let Some(v) = text(&ItemKey::TrackTitle) {
            track.title = v;
        }
        if let Some(v) = text(&ItemKey::TrackArtist) {
            track.artist = v;
        }
        if let Some(v) = text(&ItemKey::AlbumTitle) {
            track.album = v;
        }
        if let Some(v) = text(&ItemKey::TrackNumber) {
            track.track_number = leading_number(&v);
        }
        if let Some(v) = text(&ItemKey::DiscNumber) {
            track.disc_number = leading_number(&v);
        }
    }

    track
}

/// Album order: artist, album, disc, track number, then title (all case-insensitive).
pub fn sort_tracks(tracks: &mut [Track]) {
    tracks.sort_by(|a, b| {
        let key = |t: &Track| (t.artist.to_lowercase(), t.album.to_lowercase());
        key(a)
            .cmp(&key(b))
            .then(a.disc_number.cmp(&b.disc_number))
            .then(a.track_number.cmp(&b.track_number))
            .then_with(|| match a.title.to_lowercase().cmp(&b.title.to_lowercase()) {
                Ordering::Equal => a.uri.cmp(&b.uri),
                o => o,
            })
    });
}

pub fn scan(dir: &Path, settings: &LibrarySettings) -> Vec<Track> {
    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    let mut tracks: Vec<Track> = walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
        .filter(|entry| {
            let path = entry.path();
            path.is_file()
                && (settings.include_hidden || !is_hidden(path))
                && is_audio_file(path, settings)
        })
        .map(|entry| read_track(entry.path()))
        .collect();

    sort_tracks(&mut tracks);
    debug!("scanned {} tracks under {}", tracks.len(), dir.display());
    tracks
}
