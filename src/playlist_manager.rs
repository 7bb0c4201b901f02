//! Playlist state manager runtime component.
//!
//! Owns the playlist state and the persistent store: every user intent
//! mutates state here, is persisted immediately, and fans out as display
//! notifications and player commands on the bus.

use std::collections::{HashMap, HashSet};

use log::{debug, error, info};
use tokio::sync::broadcast::{Receiver, Sender};

use crate::playlist::PlaylistState;
use crate::protocol::{
    Message, MetadataMessage, PlaybackMessage, PlayerCommand, PlaylistMessage, TrackRow, UiMessage,
};
use crate::store::{StoreManager, KEY_FAVORITES, KEY_HISTORY, KEY_PLAYLIST, KEY_TITLES};
use crate::video_id::{extract_video_id, VideoId};

pub struct PlaylistManager {
    state: PlaylistState,
    bus_consumer: Receiver<Message>,
    bus_producer: Sender<Message>,
    store: StoreManager,
    title_generation: u64,
    pending_titles: HashMap<VideoId, u64>,
}

impl PlaylistManager {
    pub fn new(
        bus_consumer: Receiver<Message>,
        bus_producer: Sender<Message>,
        store: StoreManager,
    ) -> Self {
        Self {
            state: PlaylistState::new(),
            bus_consumer,
            bus_producer,
            store,
            title_generation: 0,
            pending_titles: HashMap::new(),
        }
    }

    pub fn run(&mut self) {
        self.restore();

        loop {
            match self.bus_consumer.blocking_recv() {
                Ok(message) => match message {
                    Message::Playlist(PlaylistMessage::AddTrack(link)) => self.add_track(&link),
                    Message::Playlist(PlaylistMessage::RemoveTrack(index)) => {
                        self.remove_track(index)
                    }
                    Message::Playlist(PlaylistMessage::ToggleFavorite(id)) => {
                        self.toggle_favorite(&id)
                    }
                    Message::Playlist(PlaylistMessage::ToggleRepeat) => {
                        let repeat = self.state.toggle_repeat();
                        debug!("PlaylistManager: repeat set to {}", repeat);
                        self.broadcast_playlist_changed();
                    }
                    Message::Playlist(PlaylistMessage::ToggleShuffle) => self.toggle_shuffle(),
                    Message::Playlist(PlaylistMessage::Clear) => self.clear(),
                    Message::Playlist(PlaylistMessage::ShowHistory) => self.show_history(),
                    Message::Playlist(PlaylistMessage::ShowFavorites) => self.show_favorites(),
                    Message::Playback(PlaybackMessage::PlayIndex(index)) => self.play_index(index),
                    Message::Playback(PlaybackMessage::PlayCurrent) => {
                        if let Some(index) = self.state.current_index() {
                            self.play_index(index);
                        }
                    }
                    Message::Playback(PlaybackMessage::Next) => {
                        if let Some(index) = self.state.step_next() {
                            self.play_index(index);
                        }
                    }
                    Message::Playback(PlaybackMessage::Previous) => {
                        if let Some(index) = self.state.step_prev() {
                            self.play_index(index);
                        }
                    }
                    Message::Metadata(MetadataMessage::TitleResolved {
                        id,
                        title,
                        generation,
                    }) => self.apply_resolved_title(id, title, generation),
                    _ => {}
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!(
                        "PlaylistManager lagged on control bus, skipped {} message(s)",
                        skipped
                    );
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    error!("PlaylistManager: bus closed");
                    break;
                }
            }
        }
    }

    /// Rebuilds state from the store and requests titles that were never
    /// resolved in an earlier session.
    fn restore(&mut self) {
        let entries: Vec<VideoId> = self.load_or_default(KEY_PLAYLIST);
        let titles: HashMap<VideoId, String> = self.load_or_default(KEY_TITLES);
        let favorites: HashSet<VideoId> = self.load_or_default(KEY_FAVORITES);
        let history: Vec<VideoId> = self.load_or_default(KEY_HISTORY);

        if !entries.is_empty() {
            info!("PlaylistManager: restoring {} track(s)", entries.len());
        }
        self.state = PlaylistState::restore(entries, titles, favorites, history);

        let unresolved: Vec<(usize, VideoId)> = self
            .state
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, id)| self.state.title_override(id).is_none())
            .map(|(index, id)| (index, id.clone()))
            .collect();
        for (index, id) in unresolved {
            self.request_title(id, index);
        }

        self.broadcast_playlist_changed();
    }

    fn load_or_default<T: serde::de::DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.store.get(key) {
            Ok(value) => value.unwrap_or_default(),
            Err(err) => {
                error!("PlaylistManager: failed to load '{}': {}", key, err);
                T::default()
            }
        }
    }

    fn add_track(&mut self, link: &str) {
        let Some(id) = extract_video_id(link.trim()) else {
            debug!("PlaylistManager: rejected link {:?}", link);
            let _ = self.bus_producer.send(Message::Ui(UiMessage::ErrorMessage(
                "Invalid video link.".to_string(),
            )));
            return;
        };

        if self.state.contains(&id) {
            debug!("PlaylistManager: {} already in playlist", id);
            return;
        }

        self.state.add(id.clone());
        self.persist_entries();

        let index = self.state.len() - 1;
        let _ = self
            .bus_producer
            .send(Message::Playlist(PlaylistMessage::TrackAdded {
                id: id.clone(),
                index,
            }));
        // Clear the inline error slot after a successful add.
        let _ = self
            .bus_producer
            .send(Message::Ui(UiMessage::ErrorMessage(String::new())));

        self.request_title(id, index);
        self.broadcast_playlist_changed();

        if self.state.len() == 1 {
            self.play_index(0);
        }
    }

    fn remove_track(&mut self, index: usize) {
        let Some(removed) = self.state.remove(index) else {
            debug!("PlaylistManager: remove index {} out of bounds", index);
            return;
        };
        debug!("PlaylistManager: removed {} at index {}", removed, index);

        if !self.state.contains(&removed) {
            self.state.remove_title(&removed);
            self.pending_titles.remove(&removed);
            self.persist_titles();
        }
        self.persist_entries();

        match self.state.current_index() {
            Some(cursor) => self.play_index(cursor),
            None => {
                let _ = self.bus_producer.send(Message::Player(PlayerCommand::Stop));
                let _ = self
                    .bus_producer
                    .send(Message::Ui(UiMessage::NowPlayingChanged(None)));
                self.broadcast_playlist_changed();
            }
        }
    }

    /// Sets the cursor and instructs the player to load the track, recording
    /// it in the history log.
    fn play_index(&mut self, index: usize) {
        let Some(id) = self.state.id_at(index).cloned() else {
            debug!("PlaylistManager: play index {} out of bounds", index);
            return;
        };

        self.state.set_current_index(index);
        if self.state.record_history(&id) {
            self.persist_history();
        }

        let _ = self
            .bus_producer
            .send(Message::Player(PlayerCommand::LoadAndPlay(id)));
        let _ = self.bus_producer.send(Message::Ui(UiMessage::Progress {
            elapsed_s: 0.0,
            total_s: 0.0,
        }));
        let _ = self
            .bus_producer
            .send(Message::Ui(UiMessage::NowPlayingChanged(Some(
                self.state.display_title(index),
            ))));
        self.broadcast_playlist_changed();
    }

    fn toggle_favorite(&mut self, id: &VideoId) {
        let now_favorite = self.state.toggle_favorite(id);
        debug!(
            "PlaylistManager: {} favorite set to {}",
            id, now_favorite
        );
        self.persist_favorites();
        self.broadcast_playlist_changed();
    }

    fn toggle_shuffle(&mut self) {
        let shuffle = self.state.toggle_shuffle();
        debug!("PlaylistManager: shuffle set to {}", shuffle);
        if shuffle {
            // The permutation changed the stored order.
            self.persist_entries();
        }
        self.broadcast_playlist_changed();
    }

    fn clear(&mut self) {
        debug!("PlaylistManager: clearing playlist");
        self.state.clear();
        self.pending_titles.clear();
        if let Err(err) = self.store.remove(KEY_PLAYLIST) {
            error!("PlaylistManager: failed to clear playlist key: {}", err);
        }
        if let Err(err) = self.store.remove(KEY_TITLES) {
            error!("PlaylistManager: failed to clear titles key: {}", err);
        }

        let _ = self.bus_producer.send(Message::Player(PlayerCommand::Stop));
        let _ = self
            .bus_producer
            .send(Message::Ui(UiMessage::NowPlayingChanged(None)));
        self.broadcast_playlist_changed();
    }

    fn show_history(&self) {
        let titles = self
            .state
            .history()
            .iter()
            .map(|id| {
                if let Some(title) = self.state.title_override(id) {
                    title.to_string()
                } else if let Some(position) =
                    self.state.entries().iter().position(|entry| entry == id)
                {
                    format!("Track {}", position + 1)
                } else {
                    id.as_str().to_string()
                }
            })
            .collect();
        let _ = self
            .bus_producer
            .send(Message::Ui(UiMessage::HistorySnapshot(titles)));
    }

    fn show_favorites(&self) {
        let rows = self
            .state
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, id)| self.state.is_favorite(id))
            .map(|(index, id)| TrackRow {
                id: id.clone(),
                title: self.state.display_title(index),
                favorite: true,
            })
            .collect();
        let _ = self
            .bus_producer
            .send(Message::Ui(UiMessage::FavoritesSnapshot(rows)));
    }

    /// Applies a resolver result unless it is stale: the generation must be
    /// the latest requested for this id and the id must still be listed.
    fn apply_resolved_title(&mut self, id: VideoId, title: String, generation: u64) {
        let current_generation = self.pending_titles.get(&id).copied();
        if current_generation != Some(generation) || !self.state.contains(&id) {
            debug!(
                "PlaylistManager: discarding stale title for {} (generation {})",
                id, generation
            );
            return;
        }
        self.pending_titles.remove(&id);

        let is_current = self
            .state
            .current_index()
            .and_then(|index| self.state.id_at(index))
            == Some(&id);
        self.state.set_title(id, title.clone());
        self.persist_titles();

        if is_current {
            let _ = self
                .bus_producer
                .send(Message::Ui(UiMessage::NowPlayingChanged(Some(title))));
        }
        self.broadcast_playlist_changed();
    }

    fn request_title(&mut self, id: VideoId, position: usize) {
        self.title_generation += 1;
        self.pending_titles.insert(id.clone(), self.title_generation);
        let _ = self
            .bus_producer
            .send(Message::Metadata(MetadataMessage::ResolveTitle {
                id,
                position,
                generation: self.title_generation,
            }));
    }

    fn broadcast_playlist_changed(&self) {
        let _ = self
            .bus_producer
            .send(Message::Ui(UiMessage::PlaylistChanged(
                self.state.snapshot(),
            )));
    }

    fn persist_entries(&self) {
        if let Err(err) = self.store.set(KEY_PLAYLIST, &self.state.entries().to_vec()) {
            error!("PlaylistManager: failed to persist playlist: {}", err);
        }
    }

    fn persist_titles(&self) {
        if let Err(err) = self.store.set(KEY_TITLES, self.state.titles()) {
            error!("PlaylistManager: failed to persist titles: {}", err);
        }
    }

    fn persist_favorites(&self) {
        if let Err(err) = self.store.set(KEY_FAVORITES, self.state.favorites()) {
            error!("PlaylistManager: failed to persist favorites: {}", err);
        }
    }

    fn persist_history(&self) {
        if let Err(err) = self.store.set(KEY_HISTORY, &self.state.history().to_vec()) {
            error!("PlaylistManager: failed to persist history: {}", err);
        }
    }
}
