//! Playback coordinator
//!
//! Drives one performance of a score on the control thread: the optional
//! introduction, then each verse, with pauses between verses and the
//! D.C. al Fine replay after the last verse when the score asks for it.
//!
//! The coordinator owns the playback state, the marker interpreter and the
//! tempo decay, and wires them to the engine's callbacks in [`initialize`].
//! Between segments it blocks on the shared [`Synchronizer`], which the
//! engine's finished callback (or the operator interrupt) releases.
//!
//! **Lifecycle:** Uninitialized → Initialized → PlayingIntroduction
//! (optional) → PlayingVerse(n) → PausedBetweenVerses(n) → … → Finished
//!
//! [`initialize`]: Coordinator::initialize

use super::engine::PlaybackEngine;
use super::interpreter::MarkerInterpreter;
use super::score::ScoreInfo;
use super::state::PlaybackState;
use super::synchronizer::Synchronizer;
use super::tempo_decay::TempoDecay;
use crate::error::{Error, Result};
use organ_common::human_time::format_plural;
use organ_common::PlaybackSettings;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use tracing::{debug, info};

/// Where the coordinator is in the performance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Initialized,
    PlayingIntroduction,
    /// Verse number, starting at 1
    PlayingVerse(u32),
    /// Pausing after this verse (0 = after the introduction)
    PausedBetweenVerses(u32),
    Finished,
}

/// Summary shown to the operator before playback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackInfo {
    pub title: String,
    pub key_signature: String,
    pub verses: u32,
    /// Performed tempo, rounded to whole beats per minute
    pub bpm: i64,
}

impl fmt::Display for PlaybackInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"{}\" in {} - {} at {} bpm",
            self.title,
            self.key_signature,
            format_plural(self.verses, "verse", "verses"),
            self.bpm
        )
    }
}

pub struct Coordinator {
    engine: Arc<dyn PlaybackEngine>,
    synchronizer: Arc<Synchronizer>,
    score: Arc<ScoreInfo>,
    state: Arc<PlaybackState>,
    interpreter: Arc<MarkerInterpreter>,
    decay: Arc<TempoDecay>,
    phase: Mutex<Phase>,
    running: AtomicBool,
    /// Engine speed at the start of every verse
    base_speed: f32,
}

impl Coordinator {
    /// Build a coordinator, checking the score and settings up front
    pub fn new(
        engine: Arc<dyn PlaybackEngine>,
        synchronizer: Arc<Synchronizer>,
        score: ScoreInfo,
        settings: &PlaybackSettings,
    ) -> Result<Self> {
        score.validate()?;
        settings.validate()?;

        let score = Arc::new(score);
        let state = Arc::new(PlaybackState::new());
        state.set_warnings_enabled(settings.display_warnings);

        let interpreter = Arc::new(MarkerInterpreter::new(
            Arc::clone(&engine),
            Arc::clone(&state),
            Arc::clone(&score),
        ));
        let decay = Arc::new(TempoDecay::new(
            Arc::clone(&state),
            Arc::clone(&engine),
            settings.ritardando_decrement,
        ));

        Ok(Self {
            base_speed: score.initial_speed(),
            engine,
            synchronizer,
            score,
            state,
            interpreter,
            decay,
            phase: Mutex::new(Phase::Uninitialized),
            running: AtomicBool::new(false),
        })
    }

    fn phase_guard(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, phase: Phase) {
        debug!("Phase: {:?}", phase);
        *self.phase_guard() = phase;
    }

    pub fn phase(&self) -> Phase {
        *self.phase_guard()
    }

    pub fn state(&self) -> &Arc<PlaybackState> {
        &self.state
    }

    pub fn synchronizer(&self) -> &Arc<Synchronizer> {
        &self.synchronizer
    }

    pub fn tempo_decay(&self) -> &TempoDecay {
        &self.decay
    }

    pub fn score(&self) -> &ScoreInfo {
        &self.score
    }

    /// Register the engine callbacks and set the starting speed and tempo
    pub fn initialize(&self) {
        let interpreter = Arc::clone(&self.interpreter);
        self.engine
            .set_event_callback(Box::new(move |event| interpreter.handle_event(event)));

        let decay = Arc::clone(&self.decay);
        self.engine
            .set_heartbeat_callback(Box::new(move || decay.handle_heartbeat()));

        let synchronizer = Arc::clone(&self.synchronizer);
        self.engine
            .set_finished_callback(Box::new(move || synchronizer.notify()));

        self.engine.set_speed(self.base_speed);
        self.engine.set_tempo(self.score.usec_per_quarter);

        debug!(
            "Coordinator initialized (speed {:.3}, {} usec/quarter)",
            self.base_speed, self.score.usec_per_quarter
        );
        self.set_phase(Phase::Initialized);
    }

    pub fn set_display_warnings(&self, enabled: bool) {
        self.state.set_warnings_enabled(enabled);
    }

    pub fn playback_info(&self) -> PlaybackInfo {
        PlaybackInfo {
            title: self.score.title.clone(),
            key_signature: self.score.key_signature.clone(),
            verses: self.score.verses,
            bpm: (f64::from(self.score.bpm) * f64::from(self.score.speed)).round() as i64,
        }
    }

    pub fn display_playback_info(&self) {
        info!("Playing: {}", self.playback_info());
    }

    /// Perform the score. Blocks the calling thread until the last verse
    /// (and any Fine ending) has finished.
    pub fn execute_playback(&self) -> Result<()> {
        let phase = self.phase();
        if phase == Phase::Uninitialized {
            return Err(Error::InvalidState(
                "initialize() must be called before execute_playback()".to_string(),
            ));
        }
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(Error::InvalidState("playback already in progress".to_string()));
        }

        if phase == Phase::Finished {
            self.engine.rewind();
        }
        self.state.reset();
        self.synchronizer.reset();

        if self.score.should_play_intro() {
            self.play_introduction();
        }
        self.play_verses();

        self.set_phase(Phase::Finished);
        self.running.store(false, Ordering::Release);
        Ok(())
    }

    fn play_introduction(&self) {
        self.set_phase(Phase::PlayingIntroduction);
        self.state.set_playing_introduction(true);
        self.state.set_ritardando_active(false);

        self.interpreter.initialize_intro_segments();
        if let Some(first) = self.score.intro_segments.first() {
            self.engine.go_to_tick(first.start);
        }

        info!("Playing introduction");
        self.engine.play();
        self.synchronizer.wait();

        self.state.set_ritardando_active(false);
        self.state.set_playing_introduction(false);
        self.engine.set_speed(self.base_speed);
        self.engine.rewind();

        self.set_phase(Phase::PausedBetweenVerses(0));
        self.pause();
    }

    fn play_verses(&self) {
        let verses = self.score.verses;

        for verse in 1..=verses {
            self.state.set_ritardando_active(false);
            self.engine.set_speed(self.base_speed);

            if verse == verses {
                self.state.set_on_last_verse(true);
                info!("Playing verse {}, last verse", verse);
            } else {
                info!("Playing verse {}", verse);
            }

            self.set_phase(Phase::PlayingVerse(verse));
            self.engine.play();
            self.synchronizer.wait();

            if !self.state.is_on_last_verse() {
                self.engine.rewind();
                self.set_phase(Phase::PausedBetweenVerses(verse));
                self.pause();
            }

            if self.state.is_taking_fine_ending() {
                debug!("Taking the Fine ending");
                self.engine.rewind();
                self.engine.play();
                self.synchronizer.wait();
            }
        }
    }

    fn pause(&self) {
        if let Some(duration) = self.score.pause_duration() {
            debug!("Pausing {:?}", duration);
            thread::sleep(duration);
        }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        // Callbacks hold the interpreter and decay, which hold the engine
        self.engine.clear_callbacks();
    }
}
