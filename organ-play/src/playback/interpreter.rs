//! Marker interpreter
//!
//! Runs on the engine thread for every outgoing event. Marker meta-events
//! carrying musical directions change the playback state and may redirect
//! the engine; everything else passes straight through.
//!
//! **Introduction:** the introduction is played as a chain of segments cut
//! from the score. Each `"]"` closing a segment jumps the engine to the start
//! of the next one; the last `"]"` ends the introduction.
//!
//! **Returns:** `handle_event` returns `true` to forward the event to the
//! output and `false` to suppress it.

use super::engine::PlaybackEngine;
use super::events::Event;
use super::markers::{self, MarkerKind};
use super::score::ScoreInfo;
use super::state::PlaybackState;
use crate::error::{Error, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

pub struct MarkerInterpreter {
    engine: Arc<dyn PlaybackEngine>,
    state: Arc<PlaybackState>,
    score: Arc<ScoreInfo>,
    /// Index of the segment currently playing; `None` until initialized
    cursor: Mutex<Option<usize>>,
}

impl MarkerInterpreter {
    pub fn new(
        engine: Arc<dyn PlaybackEngine>,
        state: Arc<PlaybackState>,
        score: Arc<ScoreInfo>,
    ) -> Self {
        Self {
            engine,
            state,
            score,
            cursor: Mutex::new(None),
        }
    }

    fn cursor(&self) -> MutexGuard<'_, Option<usize>> {
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Point the cursor at the first segment. No-op for a score without
    /// segments.
    pub fn initialize_intro_segments(&self) {
        if self.score.intro_segments.is_empty() {
            return;
        }
        *self.cursor() = Some(0);
        debug!(
            "Introduction cursor reset ({} segments)",
            self.score.intro_segments.len()
        );
    }

    /// Event callback body; decides whether `event` reaches the output
    pub fn handle_event(&self, event: &Event) -> bool {
        if self.score.verbose {
            info!("tick {:>6}: {:?}", event.tick, event.message);
        }

        let Some(text) = event.marker_text() else {
            return true;
        };

        match markers::classify(text) {
            MarkerKind::IntroductionEnd => {
                if let Err(e) = self.end_intro_segment() {
                    error!("Introduction marker at tick {}: {}", event.tick, e);
                }
                true
            }
            MarkerKind::RitardandoIndicator => {
                if self.state.is_playing_introduction() || self.state.is_on_last_verse() {
                    debug!("Ritardando at tick {}", event.tick);
                    self.state.set_ritardando_active(true);
                }
                true
            }
            MarkerKind::DaCapoAlFine => {
                if !self.state.is_on_last_verse() {
                    return true;
                }
                debug!("D.C. al Fine at tick {}", event.tick);
                self.state.set_taking_fine_ending(true);
                self.engine.stop();
                self.engine.finish();
                false
            }
            MarkerKind::FineIndicator => {
                if !self.state.is_taking_fine_ending() {
                    return true;
                }
                debug!("Fine at tick {}", event.tick);
                self.engine.stop();
                self.engine.finish();
                false
            }
            MarkerKind::IntroductionBegin | MarkerKind::None => true,
        }
    }

    /// Jump to the next introduction segment, or end the introduction when
    /// none remain
    fn end_intro_segment(&self) -> Result<()> {
        if !self.state.is_playing_introduction() || self.score.intro_segments.is_empty() {
            return Ok(());
        }

        let mut cursor = self.cursor();
        let current = cursor.ok_or_else(|| {
            Error::InvalidState("introduction segments not initialized".to_string())
        })?;

        let next = current + 1;
        *cursor = Some(next);
        drop(cursor);

        if let Some(segment) = self.score.intro_segments.get(next) {
            debug!("Introduction segment {} starts at tick {}", next + 1, segment.start);
            self.engine.stop();
            self.engine.go_to_tick(segment.start);
            self.engine.play();
            return Ok(());
        }

        debug!("Introduction complete");
        self.engine.stop();
        if self.score.potential_stuck_note {
            self.engine.notes_off();
            if self.state.is_warnings_enabled() {
                warn!("Introduction ends on the final tick; sounding notes were silenced");
            }
        }
        self.engine.finish();
        Ok(())
    }
}
