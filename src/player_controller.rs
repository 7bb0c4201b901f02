//! Player control facade: turns bus commands into calls on the external
//! player capability.

use log::{debug, error};
use tokio::sync::broadcast::{Receiver, Sender};

use crate::player::ExternalPlayer;
use crate::protocol::{Message, PlayerCommand, PlayerEvent, PlayerState, UiMessage};

pub struct PlayerController {
    bus_consumer: Receiver<Message>,
    bus_producer: Sender<Message>,
    player: Box<dyn ExternalPlayer>,
}

impl PlayerController {
    pub fn new(
        bus_consumer: Receiver<Message>,
        bus_producer: Sender<Message>,
        player: Box<dyn ExternalPlayer>,
    ) -> Self {
        Self {
            bus_consumer,
            bus_producer,
            player,
        }
    }

    /// Starts the blocking command loop. Announces player readiness once the
    /// capability is attached, mirroring an embedded player's ready callback.
    pub fn run(&mut self) {
        let _ = self
            .bus_producer
            .send(Message::PlayerEvent(PlayerEvent::Ready));

        loop {
            match self.bus_consumer.blocking_recv() {
                Ok(Message::Player(command)) => self.handle_command(command),
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!(
                        "PlayerController lagged on control bus, skipped {} message(s)",
                        skipped
                    );
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    error!("PlayerController: bus closed");
                    break;
                }
            }
        }
    }

    fn handle_command(&mut self, command: PlayerCommand) {
        match command {
            PlayerCommand::LoadAndPlay(id) => {
                debug!("PlayerController: load and play {}", id);
                self.player.load_by_id(&id);
                self.player.play();
            }
            PlayerCommand::Play => self.player.play(),
            PlayerCommand::Pause => self.player.pause(),
            PlayerCommand::Stop => {
                debug!("PlayerController: stop");
                self.player.stop();
            }
            PlayerCommand::TogglePlayPause => {
                if self.player.state() == PlayerState::Playing {
                    self.player.pause();
                } else {
                    self.player.play();
                }
            }
            PlayerCommand::SeekFraction(fraction) => {
                let duration = self.player.duration();
                if duration > 0.0 {
                    let target = fraction.clamp(0.0, 1.0) * duration;
                    debug!("PlayerController: seeking to {:.1}s", target);
                    self.player.seek_to(target);
                }
            }
            PlayerCommand::QueryProgress => {
                let _ = self.bus_producer.send(Message::Ui(UiMessage::Progress {
                    elapsed_s: self.player.current_time(),
                    total_s: self.player.duration(),
                }));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};
    use tokio::sync::broadcast::{self, error::TryRecvError};

    use crate::video_id::VideoId;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Load(String),
        Play,
        Pause,
        Stop,
        Seek(f64),
    }

    struct FakePlayer {
        calls: Arc<Mutex<Vec<Call>>>,
        state: Arc<Mutex<PlayerState>>,
        duration_s: f64,
        elapsed_s: f64,
    }

    impl ExternalPlayer for FakePlayer {
        fn load_by_id(&mut self, id: &VideoId) {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Load(id.as_str().to_string()));
        }

        fn play(&mut self) {
            self.calls.lock().unwrap().push(Call::Play);
            *self.state.lock().unwrap() = PlayerState::Playing;
        }

        fn pause(&mut self) {
            self.calls.lock().unwrap().push(Call::Pause);
            *self.state.lock().unwrap() = PlayerState::Paused;
        }

        fn stop(&mut self) {
            self.calls.lock().unwrap().push(Call::Stop);
            *self.state.lock().unwrap() = PlayerState::Idle;
        }

        fn seek_to(&mut self, seconds: f64) {
            self.calls.lock().unwrap().push(Call::Seek(seconds));
        }

        fn duration(&self) -> f64 {
            self.duration_s
        }

        fn current_time(&self) -> f64 {
            self.elapsed_s
        }

        fn state(&self) -> PlayerState {
            *self.state.lock().unwrap()
        }
    }

    struct Harness {
        bus_sender: broadcast::Sender<Message>,
        receiver: broadcast::Receiver<Message>,
        calls: Arc<Mutex<Vec<Call>>>,
        state: Arc<Mutex<PlayerState>>,
    }

    fn spawn_controller(duration_s: f64, elapsed_s: f64) -> Harness {
        let (bus_sender, _) = broadcast::channel(256);
        let calls = Arc::new(Mutex::new(Vec::new()));
        let state = Arc::new(Mutex::new(PlayerState::Idle));

        let player = FakePlayer {
            calls: calls.clone(),
            state: state.clone(),
            duration_s,
            elapsed_s,
        };

        let controller_receiver = bus_sender.subscribe();
        let controller_sender = bus_sender.clone();
        let mut receiver = bus_sender.subscribe();
        thread::spawn(move || {
            let mut controller =
                PlayerController::new(controller_receiver, controller_sender, Box::new(player));
            controller.run();
        });

        // The controller announces readiness before processing commands.
        wait_until(&mut receiver, |message| {
            matches!(message, Message::PlayerEvent(PlayerEvent::Ready))
        });

        Harness {
            bus_sender,
            receiver,
            calls,
            state,
        }
    }

    fn wait_until(
        receiver: &mut broadcast::Receiver<Message>,
        mut predicate: impl FnMut(&Message) -> bool,
    ) -> Message {
        let start = Instant::now();
        loop {
            if start.elapsed() > Duration::from_secs(1) {
                panic!("timed out waiting for expected message");
            }
            match receiver.try_recv() {
                Ok(message) => {
                    if predicate(&message) {
                        return message;
                    }
                }
                Err(TryRecvError::Empty) => thread::sleep(Duration::from_millis(5)),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Closed) => panic!("bus closed"),
            }
        }
    }

    fn wait_for_calls(harness: &Harness, expected: &[Call]) {
        let start = Instant::now();
        loop {
            if harness.calls.lock().unwrap().as_slice() == expected {
                return;
            }
            if start.elapsed() > Duration::from_secs(1) {
                panic!(
                    "expected calls {:?}, got {:?}",
                    expected,
                    harness.calls.lock().unwrap()
                );
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn load_and_play_loads_then_plays() {
        let harness = spawn_controller(100.0, 0.0);
        harness
            .bus_sender
            .send(Message::Player(PlayerCommand::LoadAndPlay(VideoId::new(
                "dQw4w9WgXcQ",
            ))))
            .unwrap();

        wait_for_calls(
            &harness,
            &[Call::Load("dQw4w9WgXcQ".to_string()), Call::Play],
        );
    }

    #[test]
    fn toggle_pauses_when_playing_and_plays_otherwise() {
        let harness = spawn_controller(100.0, 0.0);
        *harness.state.lock().unwrap() = PlayerState::Playing;

        harness
            .bus_sender
            .send(Message::Player(PlayerCommand::TogglePlayPause))
            .unwrap();
        wait_for_calls(&harness, &[Call::Pause]);

        harness
            .bus_sender
            .send(Message::Player(PlayerCommand::TogglePlayPause))
            .unwrap();
        wait_for_calls(&harness, &[Call::Pause, Call::Play]);
    }

    #[test]
    fn seek_fraction_maps_to_absolute_seconds() {
        let harness = spawn_controller(200.0, 0.0);
        harness
            .bus_sender
            .send(Message::Player(PlayerCommand::SeekFraction(0.5)))
            .unwrap();
        wait_for_calls(&harness, &[Call::Seek(100.0)]);
    }

    #[test]
    fn seek_fraction_is_clamped() {
        let harness = spawn_controller(200.0, 0.0);
        harness
            .bus_sender
            .send(Message::Player(PlayerCommand::SeekFraction(7.0)))
            .unwrap();
        wait_for_calls(&harness, &[Call::Seek(200.0)]);
    }

    #[test]
    fn seek_with_zero_duration_is_a_noop() {
        let harness = spawn_controller(0.0, 0.0);
        harness
            .bus_sender
            .send(Message::Player(PlayerCommand::SeekFraction(0.5)))
            .unwrap();
        // Follow with a stop so there is a call to wait on.
        harness
            .bus_sender
            .send(Message::Player(PlayerCommand::Stop))
            .unwrap();
        wait_for_calls(&harness, &[Call::Stop]);
    }

    #[test]
    fn query_progress_publishes_elapsed_and_total() {
        let mut harness = spawn_controller(180.0, 42.0);
        harness
            .bus_sender
            .send(Message::Player(PlayerCommand::QueryProgress))
            .unwrap();

        let message = wait_until(&mut harness.receiver, |message| {
            matches!(message, Message::Ui(UiMessage::Progress { .. }))
        });
        match message {
            Message::Ui(UiMessage::Progress { elapsed_s, total_s }) => {
                assert_eq!(elapsed_s, 42.0);
                assert_eq!(total_s, 180.0);
            }
            _ => unreachable!(),
        }
    }
}
