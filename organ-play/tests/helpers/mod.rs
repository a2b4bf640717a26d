//! Test helper modules for organ-play integration tests
//!
//! Provides reusable test infrastructure components:
//! - RecordingEngine: scripted `PlaybackEngine` that records every call
//! - RecordingSink: `EventSink` that keeps what the engine played
//! - Score builders for common introduction layouts

#![allow(dead_code)]

pub mod recording_engine;

pub use recording_engine::{Call, RecordingEngine, RecordingSink};

use organ_play::playback::{IntroSegment, ScoreInfo};
use std::time::{Duration, Instant};

/// Score with the given introduction segments and verse count
pub fn score_with_intro(segments: &[(u32, u32)], verses: u32) -> ScoreInfo {
    ScoreInfo {
        title: "Test Hymn".to_string(),
        verses,
        intro_segments: segments
            .iter()
            .map(|&(start, end)| IntroSegment { start, end })
            .collect(),
        play_intro: !segments.is_empty(),
        ..ScoreInfo::default()
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_for(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
