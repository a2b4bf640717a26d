//! Ritardando tempo decay
//!
//! While a ritardando is active every engine heartbeat lowers the playback
//! speed by a fixed amount. The speed is not floored: a long ritardando or
//! an aggressive rate can take it to zero or below, which the engine treats
//! as a stalled clock.

use super::engine::PlaybackEngine;
use super::state::PlaybackState;
use organ_common::config::DEFAULT_RITARDANDO_DECREMENT;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Heartbeat-driven speed decrement
pub struct TempoDecay {
    /// f32 bits, so the rate can change while the engine thread reads it
    decrement_rate: AtomicU32,
    state: Arc<PlaybackState>,
    engine: Arc<dyn PlaybackEngine>,
}

impl TempoDecay {
    pub fn new(
        state: Arc<PlaybackState>,
        engine: Arc<dyn PlaybackEngine>,
        decrement_rate: f32,
    ) -> Self {
        Self {
            decrement_rate: AtomicU32::new(decrement_rate.to_bits()),
            state,
            engine,
        }
    }

    /// Create with the default decrement rate
    pub fn with_default_rate(state: Arc<PlaybackState>, engine: Arc<dyn PlaybackEngine>) -> Self {
        Self::new(state, engine, DEFAULT_RITARDANDO_DECREMENT)
    }

    /// Heartbeat callback body; runs on the engine thread
    pub fn handle_heartbeat(&self) {
        if !self.state.is_ritardando_active() {
            return;
        }

        let speed = self.engine.get_speed() - self.get_decrement_rate();
        self.engine.set_speed(speed);
        trace!("Ritardando speed now {:.4}", speed);
    }

    pub fn set_decrement_rate(&self, rate: f32) {
        self.decrement_rate.store(rate.to_bits(), Ordering::Relaxed);
    }

    pub fn get_decrement_rate(&self) -> f32 {
        f32::from_bits(self.decrement_rate.load(Ordering::Relaxed))
    }
}
