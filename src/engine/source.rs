//! Opening media for the rodio engine and preparing sinks from it.
//!
//! Remote streams are fetched whole into memory so that scrubbing can rebuild
//! the decoder without another request.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rodio::decoder::DecoderError;
use rodio::{Decoder, OutputStream, Sink, Source};
use thiserror::Error;

#[derive(Debug, Error)]
pub(super) enum SourceError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to fetch stream: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to decode: {0}")]
    Decode(#[from] DecoderError),
}

#[derive(Clone)]
pub(super) enum Media {
    File(PathBuf),
    Memory(Arc<[u8]>),
}

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for stream downloads. `timeout` bounds each whole request, so a
/// stalled server cannot hold the engine thread.
pub(super) fn http_client(timeout: Duration) -> reqwest::Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .timeout(timeout)
        .build()
}

fn is_remote(uri: &str) -> bool {
    uri.starts_with("http://") || uri.starts_with("https://")
}

/// Resolve `uri` into something the decoder can read repeatedly.
pub(super) fn open_media(
    uri: &str,
    http: &reqwest::blocking::Client,
) -> Result<Media, SourceError> {
    if is_remote(uri) {
        let bytes = http.get(uri).send()?.error_for_status()?.bytes()?;
        return Ok(Media::Memory(Arc::from(bytes.as_ref())));
    }

    let path = PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri));
    // Fail early, on the engine thread, rather than at decode time.
    File::open(&path).map_err(|source| SourceError::Open {
        path: path.clone(),
        source,
    })?;
    Ok(Media::File(path))
}

fn sink_from<R>(
    stream: &OutputStream,
    reader: R,
    start_at: Duration,
) -> Result<(Sink, Option<Duration>), SourceError>
where
    R: Read + Seek + Send + Sync + 'static,
{
    let decoder = Decoder::new(reader)?;
    let total = decoder.total_duration();
    // `skip_duration` is our seeking primitive; even Duration::ZERO is fine.
    let source = decoder.skip_duration(start_at);

    let sink = Sink::connect_new(stream.mixer());
    sink.append(source);
    sink.pause();
    Ok((sink, total))
}

/// Create a paused `Sink` for `media` positioned at `start_at`, along with the
/// decoder's idea of the total duration.
pub(super) fn create_sink_at(
    stream: &OutputStream,
    media: &Media,
    start_at: Duration,
) -> Result<(Sink, Option<Duration>), SourceError> {
    match media {
        Media::File(path) => {
            let file = File::open(path).map_err(|source| SourceError::Open {
                path: path.clone(),
                source,
            })?;
            sink_from(stream, BufReader::new(file), start_at)
        }
        Media::Memory(bytes) => sink_from(stream, Cursor::new(bytes.clone()), start_at),
    }
}
