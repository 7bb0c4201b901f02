//! Seam for the external player capability.
//!
//! The real player is a black box living outside this process; the runtime
//! only ever talks to it through [`ExternalPlayer`]. Lifecycle notifications
//! travel back as [`PlayerEvent`] bus messages.

use std::time::Instant;

use log::debug;
use tokio::sync::broadcast::Sender;

use crate::protocol::{Message, PlayerEvent, PlayerState};
use crate::video_id::VideoId;

/// Black-box playback capability consumed by the control facade.
pub trait ExternalPlayer: Send {
    fn load_by_id(&mut self, id: &VideoId);
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn seek_to(&mut self, seconds: f64);
    fn duration(&self) -> f64;
    fn current_time(&self) -> f64;
    fn state(&self) -> PlayerState;
}

/// Stand-in player used by the demo binary.
///
/// Tracks a wall-clock elapsed time for whatever id is loaded and publishes
/// the same lifecycle notifications a real embedded player would.
pub struct SimulatedPlayer {
    bus_producer: Sender<Message>,
    state: PlayerState,
    loaded: Option<VideoId>,
    base_elapsed_s: f64,
    playing_since: Option<Instant>,
    duration_s: f64,
}

const SIMULATED_DURATION_S: f64 = 240.0;

impl SimulatedPlayer {
    pub fn new(bus_producer: Sender<Message>) -> Self {
        Self {
            bus_producer,
            state: PlayerState::Idle,
            loaded: None,
            base_elapsed_s: 0.0,
            playing_since: None,
            duration_s: SIMULATED_DURATION_S,
        }
    }

    fn emit_state(&self) {
        let _ = self
            .bus_producer
            .send(Message::PlayerEvent(PlayerEvent::StateChanged(self.state)));
    }

    fn freeze_clock(&mut self) {
        if let Some(since) = self.playing_since.take() {
            self.base_elapsed_s += since.elapsed().as_secs_f64();
        }
    }
}

impl ExternalPlayer for SimulatedPlayer {
    fn load_by_id(&mut self, id: &VideoId) {
        debug!("SimulatedPlayer: loading {}", id);
        self.loaded = Some(id.clone());
        self.base_elapsed_s = 0.0;
        self.playing_since = None;
    }

    fn play(&mut self) {
        if self.loaded.is_none() {
            return;
        }
        if self.playing_since.is_none() {
            self.playing_since = Some(Instant::now());
        }
        self.state = PlayerState::Playing;
        self.emit_state();
    }

    fn pause(&mut self) {
        self.freeze_clock();
        self.state = PlayerState::Paused;
        self.emit_state();
    }

    fn stop(&mut self) {
        self.freeze_clock();
        self.loaded = None;
        self.base_elapsed_s = 0.0;
        self.state = PlayerState::Idle;
        self.emit_state();
    }

    fn seek_to(&mut self, seconds: f64) {
        self.base_elapsed_s = seconds.clamp(0.0, self.duration_s);
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
    }

    fn duration(&self) -> f64 {
        if self.loaded.is_some() {
            self.duration_s
        } else {
            0.0
        }
    }

    fn current_time(&self) -> f64 {
        let running = self
            .playing_since
            .map(|since| since.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        (self.base_elapsed_s + running).min(self.duration_s)
    }

    fn state(&self) -> PlayerState {
        self.state
    }
}
