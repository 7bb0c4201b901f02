//! In-memory playlist state: ordered entries, cursor, flags, favorites,
//! history, and the title cache.
//!
//! All invariants live here: entries are duplicate-free, the cursor is
//! `Some(i)` with `i < len` exactly when the playlist is non-empty, and the
//! history records each id at most once.

use std::collections::{HashMap, HashSet};

use rand::{rngs::StdRng, RngExt, SeedableRng};

use crate::protocol::{PlaylistSnapshot, TrackRow};
use crate::video_id::VideoId;

pub struct PlaylistState {
    entries: Vec<VideoId>,
    current: Option<usize>,
    repeat: bool,
    shuffle: bool,
    favorites: HashSet<VideoId>,
    history: Vec<VideoId>,
    titles: HashMap<VideoId, String>,
    // Use StdRng instead of ThreadRng for thread safety
    rng_seed: [u8; 32],
}

impl PlaylistState {
    pub fn new() -> Self {
        Self::restore(Vec::new(), HashMap::new(), HashSet::new(), Vec::new())
    }

    /// Rebuilds state from persisted collections. The cursor starts at the
    /// first entry when any exist.
    pub fn restore(
        entries: Vec<VideoId>,
        titles: HashMap<VideoId, String>,
        favorites: HashSet<VideoId>,
        history: Vec<VideoId>,
    ) -> Self {
        let mut seed = [0u8; 32];
        getrandom::fill(&mut seed).expect("Failed to generate random seed");

        let current = if entries.is_empty() { None } else { Some(0) };
        Self {
            entries,
            current,
            repeat: false,
            shuffle: false,
            favorites,
            history,
            titles,
            rng_seed: seed,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &VideoId) -> bool {
        self.entries.contains(id)
    }

    pub fn id_at(&self, index: usize) -> Option<&VideoId> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[VideoId] {
        &self.entries
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn set_current_index(&mut self, index: usize) {
        debug_assert!(index < self.entries.len());
        self.current = Some(index);
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    /// Appends a new entry. Returns false without changing anything when the
    /// id is already present.
    pub fn add(&mut self, id: VideoId) -> bool {
        if self.entries.contains(&id) {
            return false;
        }
        self.entries.push(id);
        if self.current.is_none() {
            self.current = Some(0);
        }
        true
    }

    /// Removes the entry at `index` and clamps the cursor.
    ///
    /// The cursor is decremented (floored at 0) when the removed index
    /// precedes it or when it would otherwise point past the new end.
    pub fn remove(&mut self, index: usize) -> Option<VideoId> {
        if index >= self.entries.len() {
            return None;
        }
        let removed = self.entries.remove(index);

        if self.entries.is_empty() {
            self.current = None;
        } else if let Some(cursor) = self.current {
            if cursor > index || cursor >= self.entries.len() {
                self.current = Some(cursor.saturating_sub(1));
            }
        }
        Some(removed)
    }

    /// Cyclic successor of the cursor; `None` only when the playlist is empty.
    pub fn step_next(&self) -> Option<usize> {
        let cursor = self.current?;
        Some((cursor + 1) % self.entries.len())
    }

    /// Cyclic predecessor of the cursor; `None` only when the playlist is empty.
    pub fn step_prev(&self) -> Option<usize> {
        let cursor = self.current?;
        Some((cursor + self.entries.len() - 1) % self.entries.len())
    }

    /// Toggles favorite membership; returns the new membership state.
    pub fn toggle_favorite(&mut self, id: &VideoId) -> bool {
        if self.favorites.remove(id) {
            false
        } else {
            self.favorites.insert(id.clone());
            true
        }
    }

    pub fn is_favorite(&self, id: &VideoId) -> bool {
        self.favorites.contains(id)
    }

    pub fn favorites(&self) -> &HashSet<VideoId> {
        &self.favorites
    }

    /// Appends to the history unless the id was already played once.
    pub fn record_history(&mut self, id: &VideoId) -> bool {
        if self.history.contains(id) {
            return false;
        }
        self.history.push(id.clone());
        true
    }

    pub fn history(&self) -> &[VideoId] {
        &self.history
    }

    pub fn set_title(&mut self, id: VideoId, title: String) {
        self.titles.insert(id, title);
    }

    pub fn remove_title(&mut self, id: &VideoId) {
        self.titles.remove(id);
    }

    pub fn title_override(&self, id: &VideoId) -> Option<&str> {
        self.titles.get(id).map(String::as_str)
    }

    pub fn titles(&self) -> &HashMap<VideoId, String> {
        &self.titles
    }

    /// Display title for the entry at `index`, falling back to the
    /// positional placeholder when no title has been resolved.
    pub fn display_title(&self, index: usize) -> String {
        self.entries
            .get(index)
            .and_then(|id| self.titles.get(id))
            .cloned()
            .unwrap_or_else(|| format!("Track {}", index + 1))
    }

    pub fn toggle_repeat(&mut self) -> bool {
        self.repeat = !self.repeat;
        self.repeat
    }

    /// Flips the shuffle flag. Turning shuffle on applies a uniform
    /// permutation to the entries and resets the cursor to 0.
    pub fn toggle_shuffle(&mut self) -> bool {
        self.shuffle = !self.shuffle;
        if self.shuffle {
            self.shuffle_entries();
        }
        self.shuffle
    }

    fn shuffle_entries(&mut self) {
        let mut rng = StdRng::from_seed(self.rng_seed);
        for i in (1..self.entries.len()).rev() {
            let j = rng.random_range(0..=i);
            self.entries.swap(i, j);
        }

        // Update the seed for next time
        let mut new_seed = [0u8; 32];
        for (i, val) in new_seed.iter_mut().enumerate() {
            *val = self.rng_seed[i].wrapping_add(1);
        }
        self.rng_seed = new_seed;

        if !self.entries.is_empty() {
            self.current = Some(0);
        }
    }

    /// Empties the entries and title cache. Favorites and history survive.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.titles.clear();
        self.current = None;
    }

    pub fn snapshot(&self) -> PlaylistSnapshot {
        let tracks = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, id)| TrackRow {
                id: id.clone(),
                title: self.display_title(index),
                favorite: self.favorites.contains(id),
            })
            .collect();

        PlaylistSnapshot {
            tracks,
            current_index: self.current,
            repeat: self.repeat,
            shuffle: self.shuffle,
        }
    }
}

impl Default for PlaylistState {
    fn default() -> Self {
        Self::new()
    }
}
