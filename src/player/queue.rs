//! The play queue.
//!
//! Index 0, when present, is the track loaded (or about to be loaded) into
//! the engine. Reordering never changes which tracks are present.

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::warn;

use crate::library::Track;

use super::error::{PlayerError, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Queue {
    items: Vec<Track>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn enqueue(&mut self, track: Track) {
        self.items.push(track);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Make `track` the only entry.
    pub fn replace_with(&mut self, track: Track) {
        self.items.clear();
        self.items.push(track);
    }

    pub fn remove_at(&mut self, index: usize) -> Result<Track> {
        if index >= self.items.len() {
            return Err(PlayerError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        Ok(self.items.remove(index))
    }

    /// Drop the head; the old second entry becomes the head.
    pub fn pop_front(&mut self) -> Option<Track> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.items.remove(0))
        }
    }

    /// Swap `index` with its predecessor. Returns whether anything moved.
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.items.len() {
            warn!("move_up({index}): nothing to swap with (len {})", self.items.len());
            return false;
        }
        self.items.swap(index - 1, index);
        true
    }

    /// Swap `index` with its successor. Returns whether anything moved.
    pub fn move_down(&mut self, index: usize) -> bool {
        if index >= self.items.len().saturating_sub(1) {
            warn!("move_down({index}): nothing to swap with (len {})", self.items.len());
            return false;
        }
        self.items.swap(index, index + 1);
        true
    }

    pub fn shuffle(&mut self) {
        self.shuffle_with(&mut rand::rng());
    }

    /// Fisher-Yates over the whole queue using `rng`.
    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.items.shuffle(rng);
    }

    pub fn peek(&self) -> Result<&Track> {
        self.items.first().ok_or(PlayerError::EmptyQueue)
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.items.iter()
    }

    pub fn to_vec(&self) -> Vec<Track> {
        self.items.clone()
    }
}
