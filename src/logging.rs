//! Tracing setup. Formatted lines go to the UI's log pane over a bounded
//! channel (dropped when it is full) and, optionally, to a file.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender, bounded};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Install the global subscriber and return the receiving end of the log pane feed.
pub fn init(settings: &LoggingSettings, capacity: usize) -> io::Result<Receiver<String>> {
    let (tx, rx) = bounded(capacity.max(1));
    let file = match &settings.file {
        Some(path) => Some(Arc::new(Mutex::new(
            OpenOptions::new().create(true).append(true).open(path)?,
        ))),
        None => None,
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .without_time()
        .with_writer(move || LineWriter::new(tx.clone(), file.clone()))
        .try_init();
    Ok(rx)
}

/// Collects one formatted event and ships it on drop.
pub(crate) struct LineWriter {
    lines: Sender<String>,
    file: Option<Arc<Mutex<File>>>,
    buf: Vec<u8>,
}

impl LineWriter {
    pub(crate) fn new(lines: Sender<String>, file: Option<Arc<Mutex<File>>>) -> Self {
        Self {
            lines,
            file,
            buf: Vec::new(),
        }
    }
}

impl Write for LineWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for LineWriter {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        if let Some(file) = &self.file {
            if let Ok(mut f) = file.lock() {
                let _ = f.write_all(&self.buf);
            }
        }
        let text = String::from_utf8_lossy(&self.buf);
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            // The UI only shows recent lines; never block the logging thread.
            let _ = self.lines.try_send(line.trim_end().to_string());
        }
    }
}
