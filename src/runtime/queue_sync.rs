//! Keeping the play queue in step with the server across restarts.

use tracing::{debug, info, warn};

use crate::catalog::PlayQueueStore;
use crate::player::{Controller, PlaybackStatus};

/// Append whatever the server remembers, starting at the track that was
/// playing.
pub(super) fn restore_queue(store: &dyn PlayQueueStore, controller: &Controller) {
    let saved = match store.load_queue() {
        Ok(saved) => saved,
        Err(e) => {
            warn!("could not restore the play queue: {e}");
            return;
        }
    };
    let tracks = saved.remaining();
    info!("restored {} queued tracks", tracks.len());
    for track in tracks {
        controller.enqueue(track);
    }
}

/// Store the streamable part of the queue. Local files mean nothing to the
/// server and are left out.
pub(super) fn save_queue(store: &dyn PlayQueueStore, controller: &Controller) {
    let queue = controller.queue_snapshot();
    let ids: Vec<&str> = queue
        .iter()
        .filter(|t| t.is_stream())
        .map(|t| t.id.as_str())
        .collect();
    let Some(&first) = ids.first() else {
        debug!("no server tracks queued, nothing to save");
        return;
    };

    let head_kept = queue.first().is_some_and(|t| t.is_stream());
    let position_ms = match controller.status() {
        PlaybackStatus::Playing | PlaybackStatus::Paused if head_kept => {
            (controller.snapshot().time_pos.max(0.0) * 1000.0) as u64
        }
        _ => 0,
    };
    match store.save_queue(&ids, Some(first), position_ms) {
        Ok(()) => info!("saved {} queued tracks", ids.len()),
        Err(e) => warn!("could not save the play queue: {e}"),
    }
}
