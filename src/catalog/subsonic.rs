use std::time::Duration;

use md5::{Digest, Md5};
use reqwest::Url;
use reqwest::blocking::Client;
use serde::{Deserialize, Deserializer};
use tracing::{debug, trace};

use crate::config::ServerSettings;
use crate::library::Track;

use super::{CatalogError, PlayQueueStore, PlaylistSummary, Result, SavedQueue, Scrobbler};

const API_VERSION: &str = "1.15.0";
const CLIENT_NAME: &str = "tremolo";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// How requests prove who we are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    /// `t` = md5(password + salt), `s` = salt; a fresh salt per URL.
    Token,
    /// `p` = `enc:` + hex(password).
    Plaintext,
}

pub struct SubsonicClient {
    http: Client,
    base: Url,
    username: String,
    password: String,
    auth: Auth,
}

impl SubsonicClient {
    pub fn new(settings: &ServerSettings) -> Result<Self> {
        if settings.host.trim().is_empty() {
            return Err(CatalogError::NotConfigured);
        }
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Self::with_client(http, settings)
    }

    pub(super) fn with_client(http: Client, settings: &ServerSettings) -> Result<Self> {
        let host = settings.host.trim().trim_end_matches('/');
        let base = Url::parse(&format!("{host}/rest/"))
            .map_err(|e| CatalogError::InvalidUrl(format!("{host}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(CatalogError::InvalidUrl(host.to_string()));
        }
        let auth = if settings.plaintext_auth {
            Auth::Plaintext
        } else {
            Auth::Token
        };
        Ok(Self {
            http,
            base,
            username: settings.username.clone(),
            password: settings.password.clone(),
            auth,
        })
    }

    /// `<host>/rest/<method>?u=..&t=..&s=..&v=..&c=..&f=json&<params>`
    ///
    /// With plaintext auth `p=enc:..` replaces `t` and `s`. Repeated keys in
    /// `params` are kept in order.
    pub fn method_url(&self, method: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .base
            .join(method)
            .map_err(|e| CatalogError::InvalidUrl(format!("{method}: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("u", &self.username);
            match self.auth {
                Auth::Token => {
                    let salt = new_salt();
                    query
                        .append_pair("t", &auth_token(&self.password, &salt))
                        .append_pair("s", &salt);
                }
                Auth::Plaintext => {
                    query.append_pair("p", &format!("enc:{}", hex::encode(&self.password)));
                }
            }
            query
                .append_pair("v", API_VERSION)
                .append_pair("c", CLIENT_NAME)
                .append_pair("f", "json")
                .extend_pairs(params);
        }
        Ok(url)
    }

    /// Playable URI for a song id; no request is made.
    pub fn stream_url(&self, id: &str) -> Result<String> {
        Ok(self.method_url("stream", &[("id", id)])?.into())
    }

    fn call(&self, method: &str, params: &[(&str, &str)]) -> Result<ResponseBody> {
        let url = self.method_url(method, params)?;
        debug!("subsonic {method}");
        let resp = self.http.get(url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }
        let envelope: Envelope = resp.json()?;
        envelope.into_result()
    }

    pub fn ping(&self) -> Result<()> {
        let body = self.call("ping", &[])?;
        trace!("server speaks API {}", body.version);
        Ok(())
    }

    pub fn scrobble(&self, id: &str, submission: bool) -> Result<()> {
        let submission = if submission { "true" } else { "false" };
        self.call("scrobble", &[("id", id), ("submission", submission)])?;
        Ok(())
    }

    /// Every playlist visible to the user, without their songs.
    pub fn get_playlists(&self) -> Result<Vec<PlaylistSummary>> {
        let body = self.call("getPlaylists", &[])?;
        Ok(body
            .playlists
            .map(|p| p.playlist)
            .unwrap_or_default()
            .into_iter()
            .map(|p| PlaylistSummary {
                id: p.id,
                name: p.name,
                song_count: p.song_count,
            })
            .collect())
    }

    /// Songs of a playlist, in playlist order, with stream URLs as their URIs.
    pub fn get_playlist(&self, id: &str) -> Result<Vec<Track>> {
        let body = self.call("getPlaylist", &[("id", id)])?;
        let entries = body.playlist.map(|p| p.entry).unwrap_or_default();
        self.tracks(entries)
    }

    /// The queue saved by this user from any client.
    pub fn get_play_queue(&self) -> Result<SavedQueue> {
        let body = self.call("getPlayQueue", &[])?;
        let Some(queue) = body.play_queue else {
            return Ok(SavedQueue::default());
        };
        Ok(SavedQueue {
            tracks: self.tracks(queue.entry)?,
            current: Some(queue.current).filter(|c| !c.is_empty()),
            position_ms: queue.position,
        })
    }

    /// Replace the server-side queue with `ids`.
    pub fn save_play_queue(&self, ids: &[&str], current: Option<&str>, position_ms: u64) -> Result<()> {
        let position = position_ms.to_string();
        let mut params: Vec<(&str, &str)> = ids.iter().map(|id| ("id", *id)).collect();
        if let Some(current) = current {
            params.push(("current", current));
        }
        params.push(("position", position.as_str()));
        self.call("savePlayQueue", &params)?;
        Ok(())
    }

    fn tracks(&self, entries: Vec<Entry>) -> Result<Vec<Track>> {
        entries
            .into_iter()
            .filter(|e| !e.is_dir)
            .map(|e| {
                let uri = self.stream_url(&e.id)?;
                Ok(e.into_track(uri))
            })
            .collect()
    }
}

impl Scrobbler for SubsonicClient {
    fn submit_now_playing(&self, id: &str) -> Result<()> {
        self.scrobble(id, false)
    }

    fn submit_played(&self, id: &str) -> Result<()> {
        self.scrobble(id, true)
    }
}

impl PlayQueueStore for SubsonicClient {
    fn load_queue(&self) -> Result<SavedQueue> {
        self.get_play_queue()
    }

    fn save_queue(&self, ids: &[&str], current: Option<&str>, position_ms: u64) -> Result<()> {
        self.save_play_queue(ids, current, position_ms)
    }
}

fn new_salt() -> String {
    format!("{:016x}", rand::random::<u64>())
}

pub(super) fn auth_token(password: &str, salt: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

/// Ids are strings in the API, but some servers send numbers.
fn id_string<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }
    Ok(match RawId::deserialize(de)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

#[derive(Debug, Deserialize)]
pub(super) struct Envelope {
    #[serde(rename = "subsonic-response")]
    response: ResponseBody,
}

impl Envelope {
    pub(super) fn into_result(self) -> Result<ResponseBody> {
        let body = self.response;
        if body.status == "ok" {
            return Ok(body);
        }
        let (code, message) = match body.error {
            Some(e) => (e.code, e.message),
            None => (0, format!("status {}", body.status)),
        };
        Err(CatalogError::Api { code, message })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(super) struct ResponseBody {
    pub(super) status: String,
    pub(super) version: String,
    pub(super) error: Option<ApiError>,
    pub(super) playlist: Option<Playlist>,
    pub(super) playlists: Option<Playlists>,
    pub(super) play_queue: Option<PlayQueue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct ApiError {
    code: i64,
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct Playlist {
    pub(super) name: String,
    pub(super) entry: Vec<Entry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct Playlists {
    pub(super) playlist: Vec<PlaylistHeader>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(super) struct PlaylistHeader {
    #[serde(deserialize_with = "id_string")]
    pub(super) id: String,
    pub(super) name: String,
    pub(super) song_count: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PlayQueue {
    #[serde(deserialize_with = "id_string")]
    pub(super) current: String,
    /// Milliseconds into `current`.
    pub(super) position: u64,
    pub(super) entry: Vec<Entry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(super) struct Entry {
    #[serde(deserialize_with = "id_string")]
    id: String,
    is_dir: bool,
    title: String,
    artist: String,
    album: String,
    duration: u32,
    track: u32,
    disc_number: u32,
    path: String,
    cover_art: Option<String>,
}

impl Entry {
    pub(super) fn into_track(self, uri: String) -> Track {
        // Untitled songs fall back to the file name of their server path.
        let title = if self.title.is_empty() {
            self.path
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string()
        } else {
            self.title
        };
        Track {
            id: self.id,
            uri,
            title,
            artist: self.artist,
            album: self.album,
            duration_secs: self.duration,
            track_number: self.track,
            disc_number: self.disc_number,
            cover_art: self.cover_art,
        }
    }
}
