//! Playback state flags
//!
//! Five independent booleans describing where the performance is in the
//! musical form. Any subset may be true at once.
//!
//! The flags are written from the engine thread (marker and heartbeat
//! callbacks) and read from the control thread, so each one is an atomic.

use std::sync::atomic::{AtomicBool, Ordering};

/// Shared playback state
#[derive(Debug, Default)]
pub struct PlaybackState {
    playing_introduction: AtomicBool,
    ritardando_active: AtomicBool,
    on_last_verse: AtomicBool,
    taking_fine_ending: AtomicBool,
    /// Operator preference, survives `reset()`
    warnings_enabled: AtomicBool,
}

/// Copyable view of all flags at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateSnapshot {
    pub playing_introduction: bool,
    pub ritardando_active: bool,
    pub on_last_verse: bool,
    pub taking_fine_ending: bool,
    pub warnings_enabled: bool,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_playing_introduction(&self) -> bool {
        self.playing_introduction.load(Ordering::Acquire)
    }

    pub fn set_playing_introduction(&self, playing: bool) {
        self.playing_introduction.store(playing, Ordering::Release);
    }

    pub fn is_ritardando_active(&self) -> bool {
        self.ritardando_active.load(Ordering::Acquire)
    }

    pub fn set_ritardando_active(&self, active: bool) {
        self.ritardando_active.store(active, Ordering::Release);
    }

    pub fn is_on_last_verse(&self) -> bool {
        self.on_last_verse.load(Ordering::Acquire)
    }

    pub fn set_on_last_verse(&self, last: bool) {
        self.on_last_verse.store(last, Ordering::Release);
    }

    pub fn is_taking_fine_ending(&self) -> bool {
        self.taking_fine_ending.load(Ordering::Acquire)
    }

    pub fn set_taking_fine_ending(&self, active: bool) {
        self.taking_fine_ending.store(active, Ordering::Release);
    }

    pub fn is_warnings_enabled(&self) -> bool {
        self.warnings_enabled.load(Ordering::Acquire)
    }

    pub fn set_warnings_enabled(&self, enabled: bool) {
        self.warnings_enabled.store(enabled, Ordering::Release);
    }

    /// Clear the four per-performance flags; `warnings_enabled` is kept
    pub fn reset(&self) {
        self.set_playing_introduction(false);
        self.set_ritardando_active(false);
        self.set_on_last_verse(false);
        self.set_taking_fine_ending(false);
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            playing_introduction: self.is_playing_introduction(),
            ritardando_active: self.is_ritardando_active(),
            on_last_verse: self.is_on_last_verse(),
            taking_fine_ending: self.is_taking_fine_ending(),
            warnings_enabled: self.is_warnings_enabled(),
        }
    }
}
