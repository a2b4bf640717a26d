//! Operator interrupt
//!
//! When the operator aborts a performance the organ must fall silent at
//! once: stop the engine, release every note, and release the control
//! thread waiting on the synchronizer.

use crate::playback::{PlaybackEngine, Synchronizer};
use crate::timing::TimingManager;
use std::sync::Arc;
use tracing::info;

pub struct OperatorInterrupt {
    engine: Arc<dyn PlaybackEngine>,
    synchronizer: Arc<Synchronizer>,
    timing: Arc<TimingManager>,
}

impl OperatorInterrupt {
    pub fn new(
        engine: Arc<dyn PlaybackEngine>,
        synchronizer: Arc<Synchronizer>,
        timing: Arc<TimingManager>,
    ) -> Self {
        Self {
            engine,
            synchronizer,
            timing,
        }
    }

    /// Silence the organ and release the waiting control thread
    pub fn trigger(&self) {
        self.engine.stop();
        self.engine.notes_off();
        self.synchronizer.notify();

        self.timing.end_timer();
        info!("Elapsed time {}", self.timing.format_elapsed());
    }
}
