//! Performance timing
//!
//! Measures how long a performance took, for the closing "Fine" line and the
//! interrupt report.

use chrono::{DateTime, Local};
use organ_common::human_time::format_elapsed_duration;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug, Default)]
struct Marks {
    start: Option<Instant>,
    end: Option<Instant>,
    started_at: Option<DateTime<Local>>,
}

/// Start/end stopwatch shared between playback and the interrupt path
#[derive(Debug, Default)]
pub struct TimingManager {
    marks: Mutex<Marks>,
}

impl TimingManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn marks(&self) -> MutexGuard<'_, Marks> {
        self.marks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn start_timer(&self) {
        let mut marks = self.marks();
        marks.start = Some(Instant::now());
        marks.end = None;
        marks.started_at = Some(Local::now());
    }

    pub fn end_timer(&self) {
        self.marks().end = Some(Instant::now());
    }

    /// Wall-clock time the timer was started
    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.marks().started_at
    }

    /// Time between start and end; a running timer measures up to now
    pub fn elapsed(&self) -> Duration {
        let marks = self.marks();
        match (marks.start, marks.end) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed().as_secs()
    }

    /// Elapsed time as `M:SS`
    pub fn format_elapsed(&self) -> String {
        format_elapsed_duration(self.elapsed())
    }

    pub fn display_elapsed(&self) {
        info!("Fine - elapsed time {}", self.format_elapsed());
    }
}
