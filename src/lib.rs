//! Video playlist manager built around a broadcast message bus.
//!
//! Each runtime component (playlist manager, player controller, event
//! machine, title resolver, renderer) owns a bus receiver and runs its own
//! blocking loop on a dedicated thread. The playlist manager is the only
//! writer of playlist state; everything else reacts to its snapshots.

pub mod config;
pub mod player;
pub mod player_controller;
pub mod player_events;
pub mod playlist;
pub mod playlist_manager;
pub mod protocol;
pub mod render;
pub mod server;
pub mod store;
pub mod title_resolver;
pub mod video_id;
