//! Event-bus protocol shared by all runtime components.
//!
//! This module defines all message payloads exchanged between the playlist
//! manager, player control, player event handling, title resolution, and the
//! display layer.

use crate::video_id::VideoId;

/// State reported by the external player capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Playing,
    Paused,
    Ended,
}

/// Top-level envelope for all bus traffic.
#[derive(Debug, Clone)]
pub enum Message {
    Playlist(PlaylistMessage),
    Playback(PlaybackMessage),
    Player(PlayerCommand),
    PlayerEvent(PlayerEvent),
    Metadata(MetadataMessage),
    Ui(UiMessage),
}

/// Playlist-domain intents and notifications.
#[derive(Debug, Clone)]
pub enum PlaylistMessage {
    /// User pasted a link; parse it and append the track.
    AddTrack(String),
    RemoveTrack(usize),
    ToggleFavorite(VideoId),
    ToggleRepeat,
    ToggleShuffle,
    Clear,
    ShowHistory,
    ShowFavorites,
    TrackAdded { id: VideoId, index: usize },
}

/// Playback navigation intents handled by the playlist manager.
#[derive(Debug, Clone)]
pub enum PlaybackMessage {
    PlayIndex(usize),
    /// Re-issue playback of the track at the current cursor.
    PlayCurrent,
    Next,
    Previous,
}

/// Commands executed by the player control facade against the external
/// player capability.
#[derive(Debug, Clone)]
pub enum PlayerCommand {
    LoadAndPlay(VideoId),
    Play,
    Pause,
    Stop,
    TogglePlayPause,
    /// Seek to a [0, 1] proportion of the total duration.
    SeekFraction(f64),
    /// Read elapsed/total time and publish a progress notification.
    QueryProgress,
}

/// Lifecycle notifications emitted by the external player.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    Ready,
    StateChanged(PlayerState),
}

/// Title-resolution requests and results.
#[derive(Debug, Clone)]
pub enum MetadataMessage {
    ResolveTitle {
        id: VideoId,
        /// Playlist position at request time, used for the placeholder title.
        position: usize,
        generation: u64,
    },
    TitleResolved {
        id: VideoId,
        title: String,
        generation: u64,
    },
}

/// One rendered playlist row.
#[derive(Debug, Clone)]
pub struct TrackRow {
    pub id: VideoId,
    pub title: String,
    pub favorite: bool,
}

/// Full display state of the playlist, published after every mutation.
#[derive(Debug, Clone)]
pub struct PlaylistSnapshot {
    pub tracks: Vec<TrackRow>,
    pub current_index: Option<usize>,
    pub repeat: bool,
    pub shuffle: bool,
}

/// Notifications consumed by the display layer.
#[derive(Debug, Clone)]
pub enum UiMessage {
    PlaylistChanged(PlaylistSnapshot),
    /// `None` means no active track.
    NowPlayingChanged(Option<String>),
    Progress {
        elapsed_s: f64,
        total_s: f64,
    },
    /// Play/pause control affordance refresh.
    ControlsChanged(PlayerState),
    /// Inline error/status slot; an empty string clears it.
    ErrorMessage(String),
    HistorySnapshot(Vec<String>),
    FavoritesSnapshot(Vec<TrackRow>),
}
