//! Console renderer for display notifications.
//!
//! Consumes the display side of the bus and prints the playlist, the
//! now-playing line, progress, and control affordances. Progress updates are
//! frequent, so they render as a single line without redrawing the list.

use log::error;
use tokio::sync::broadcast::{Receiver, Sender};

use crate::protocol::{Message, PlayerState, PlaylistSnapshot, TrackRow, UiMessage};

pub struct ConsoleRenderer {
    bus_consumer: Receiver<Message>,
    // Kept for symmetry with the other components; the renderer only consumes.
    _bus_producer: Sender<Message>,
}

impl ConsoleRenderer {
    pub fn new(bus_consumer: Receiver<Message>, bus_producer: Sender<Message>) -> Self {
        Self {
            bus_consumer,
            _bus_producer: bus_producer,
        }
    }

    pub fn run(&mut self) {
        loop {
            match self.bus_consumer.blocking_recv() {
                Ok(Message::Ui(notification)) => render(&notification),
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!(
                        "ConsoleRenderer lagged on control bus, skipped {} message(s)",
                        skipped
                    );
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    error!("ConsoleRenderer: bus closed");
                    break;
                }
            }
        }
    }
}

fn render(notification: &UiMessage) {
    match notification {
        UiMessage::PlaylistChanged(snapshot) => render_playlist(snapshot),
        UiMessage::NowPlayingChanged(Some(title)) => println!("Now playing: {}", title),
        UiMessage::NowPlayingChanged(None) => println!("Now playing: (nothing)"),
        UiMessage::Progress { elapsed_s, total_s } => {
            println!("{} / {}", format_time(*elapsed_s), format_time(*total_s));
        }
        UiMessage::ControlsChanged(state) => {
            println!("[{}]", control_label(*state));
        }
        UiMessage::ErrorMessage(text) if !text.is_empty() => println!("! {}", text),
        UiMessage::ErrorMessage(_) => {}
        UiMessage::HistorySnapshot(titles) => {
            println!("History ({}):", titles.len());
            for title in titles {
                println!("  {}", title);
            }
        }
        UiMessage::FavoritesSnapshot(rows) => {
            println!("Favorites ({}):", rows.len());
            for row in rows {
                println!("  * {} [{}]", row.title, row.id);
            }
        }
    }
}

fn render_playlist(snapshot: &PlaylistSnapshot) {
    println!(
        "Playlist ({} track(s), repeat {}, shuffle {}):",
        snapshot.tracks.len(),
        on_off(snapshot.repeat),
        on_off(snapshot.shuffle),
    );
    for (index, row) in snapshot.tracks.iter().enumerate() {
        println!("{}{}", row_marker(snapshot, index), row_line(row, index));
    }
}

fn row_marker(snapshot: &PlaylistSnapshot, index: usize) -> &'static str {
    if snapshot.current_index == Some(index) {
        "> "
    } else {
        "  "
    }
}

fn row_line(row: &TrackRow, index: usize) -> String {
    let star = if row.favorite { " *" } else { "" };
    format!("{:>3}. {}{} [{}]", index + 1, row.title, star, row.id)
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

fn control_label(state: PlayerState) -> &'static str {
    match state {
        PlayerState::Playing => "pause",
        PlayerState::Paused | PlayerState::Idle | PlayerState::Ended => "play",
    }
}

/// Formats seconds as `m:ss`, flooring fractional seconds.
pub fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
