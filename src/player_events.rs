//! Player event state machine.
//!
//! Consumes lifecycle notifications from the external player and decides the
//! next playlist action: restart the current track when repeat is on, advance
//! otherwise, and start/stop the periodic progress poll. Playback begins
//! automatically once the player is ready and the playlist is non-empty.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::Duration;

use log::{debug, error};
use tokio::sync::broadcast::{Receiver, Sender};

use crate::protocol::{
    Message, PlaybackMessage, PlayerCommand, PlayerEvent, PlayerState, UiMessage,
};

pub struct PlayerEventMachine {
    bus_consumer: Receiver<Message>,
    bus_producer: Sender<Message>,
    poll_interval: Duration,
    playback_state: PlayerState,
    repeat: bool,
    playlist_empty: bool,
    player_ready: bool,
    auto_started: bool,
    poll_stop: Option<Arc<AtomicBool>>,
}

impl PlayerEventMachine {
    pub fn new(
        bus_consumer: Receiver<Message>,
        bus_producer: Sender<Message>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            bus_consumer,
            bus_producer,
            poll_interval,
            playback_state: PlayerState::Idle,
            repeat: false,
            playlist_empty: true,
            player_ready: false,
            auto_started: false,
            poll_stop: None,
        }
    }

    pub fn run(&mut self) {
        loop {
            match self.bus_consumer.blocking_recv() {
                Ok(Message::PlayerEvent(event)) => self.handle_event(event),
                Ok(Message::Ui(UiMessage::PlaylistChanged(snapshot))) => {
                    self.repeat = snapshot.repeat;
                    self.playlist_empty = snapshot.tracks.is_empty();
                    self.maybe_auto_start();
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!(
                        "PlayerEventMachine lagged on control bus, skipped {} message(s)",
                        skipped
                    );
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    error!("PlayerEventMachine: bus closed");
                    break;
                }
            }
        }
        self.stop_poll();
    }

    fn handle_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::Ready => {
                debug!("PlayerEventMachine: player ready");
                self.player_ready = true;
                self.maybe_auto_start();
            }
            PlayerEvent::StateChanged(state) => {
                debug!("PlayerEventMachine: player state changed to {:?}", state);
                self.playback_state = state;
                match state {
                    PlayerState::Ended => {
                        self.stop_poll();
                        let action = if self.repeat {
                            PlaybackMessage::PlayCurrent
                        } else {
                            PlaybackMessage::Next
                        };
                        let _ = self.bus_producer.send(Message::Playback(action));
                    }
                    PlayerState::Playing => self.start_poll(),
                    PlayerState::Paused | PlayerState::Idle => self.stop_poll(),
                }
            }
        }

        // Every lifecycle notification refreshes the play/pause affordance.
        let _ = self
            .bus_producer
            .send(Message::Ui(UiMessage::ControlsChanged(self.playback_state)));
    }

    fn maybe_auto_start(&mut self) {
        if self.player_ready && !self.playlist_empty && !self.auto_started {
            self.auto_started = true;
            let _ = self
                .bus_producer
                .send(Message::Playback(PlaybackMessage::PlayCurrent));
        }
    }

    fn start_poll(&mut self) {
        self.stop_poll();

        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_thread = stop.clone();
        let producer = self.bus_producer.clone();
        let interval = self.poll_interval;
        thread::spawn(move || loop {
            thread::sleep(interval);
            if stop_for_thread.load(Ordering::Relaxed) {
                break;
            }
            if producer
                .send(Message::Player(PlayerCommand::QueryProgress))
                .is_err()
            {
                break;
            }
        });
        self.poll_stop = Some(stop);
    }

    fn stop_poll(&mut self) {
        if let Some(stop) = self.poll_stop.take() {
            stop.store(true, Ordering::Relaxed);
        }
    }
}
