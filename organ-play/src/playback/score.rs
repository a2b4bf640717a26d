//! Score sheets and score metadata
//!
//! A score sheet is a TOML file describing one hymn: header metadata plus a
//! flat list of timed events. Loading it produces the tick-ordered timeline
//! the engine plays and the [`ScoreInfo`] the coordinator and interpreter
//! read.
//!
//! ```toml
//! title = "Old Hundredth"
//! key = "G"
//! time_signature = "4/4"
//! ticks_per_quarter = 480
//! verses = 4
//! pause_ticks = 480
//!
//! [[events]]
//! tick = 0
//! tempo = 600000
//!
//! [[events]]
//! tick = 0
//! marker = "["
//!
//! [[events]]
//! tick = 0
//! note_on = { channel = 0, key = 67, velocity = 80 }
//! ```
//!
//! Each `[[events]]` entry carries exactly one of `marker`, `text`,
//! `note_on`, `note_off`, `control_change` or `tempo`.

use super::events::{Event, Message};
use super::markers::{INTRO_BEGIN, INTRO_END};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Tempo assumed when the score carries no tempo event (120 bpm)
pub const DEFAULT_USEC_PER_QUARTER: u32 = 500_000;

pub const DEFAULT_TICKS_PER_QUARTER: u32 = 480;

const MICROSECONDS_PER_MINUTE: f32 = 60_000_000.0;

const QUARTER_NOTE_DENOMINATOR: f32 = 4.0;

/// One introduction segment, in ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntroSegment {
    pub start: u32,
    pub end: u32,
}

/// Read-only score metadata used during playback
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreInfo {
    pub title: String,
    pub key_signature: String,
    pub time_signature: String,
    pub verses: u32,
    /// Gap between verses, in ticks
    pub pause_ticks: Option<u32>,
    pub usec_per_quarter: u32,
    pub ticks_per_quarter: u32,
    /// Tempo written in the score, in beats per minute
    pub file_bpm: f32,
    /// Tempo to perform at (operator override or `file_bpm`)
    pub bpm: f32,
    /// Operator speed multiplier
    pub speed: f32,
    pub intro_segments: Vec<IntroSegment>,
    pub play_intro: bool,
    /// The introduction ends on the score's final tick with a note still
    /// releasing there
    pub potential_stuck_note: bool,
    pub verbose: bool,
}

impl Default for ScoreInfo {
    fn default() -> Self {
        Self {
            title: String::new(),
            key_signature: "C".to_string(),
            time_signature: "4/4".to_string(),
            verses: 1,
            pause_ticks: None,
            usec_per_quarter: DEFAULT_USEC_PER_QUARTER,
            ticks_per_quarter: DEFAULT_TICKS_PER_QUARTER,
            file_bpm: 120.0,
            bpm: 120.0,
            speed: 1.0,
            intro_segments: Vec::new(),
            play_intro: false,
            potential_stuck_note: false,
            verbose: false,
        }
    }
}

impl ScoreInfo {
    pub fn usec_per_tick(&self) -> f64 {
        f64::from(self.usec_per_quarter) / f64::from(self.ticks_per_quarter.max(1))
    }

    /// Wall-clock length of the pause between verses
    pub fn pause_duration(&self) -> Option<Duration> {
        self.pause_ticks
            .map(|ticks| Duration::from_micros((f64::from(ticks) * self.usec_per_tick()) as u64))
    }

    pub fn should_play_intro(&self) -> bool {
        self.play_intro && !self.intro_segments.is_empty()
    }

    /// Engine speed that performs the score at `bpm` scaled by `speed`
    pub fn initial_speed(&self) -> f32 {
        (self.bpm / self.file_bpm) * self.speed
    }

    /// Check the preconditions playback relies on
    pub fn validate(&self) -> Result<()> {
        if self.verses == 0 {
            return Err(Error::InvalidScore("at least one verse is required".to_string()));
        }
        if self.usec_per_quarter == 0 || self.ticks_per_quarter == 0 {
            return Err(Error::InvalidScore(format!(
                "tempo values must be positive (usec_per_quarter={}, ticks_per_quarter={})",
                self.usec_per_quarter, self.ticks_per_quarter
            )));
        }
        for (name, value) in [("bpm", self.bpm), ("file bpm", self.file_bpm)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidScore(format!("{} must be positive, got {}", name, value)));
            }
        }
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(Error::InvalidScore(format!(
                "speed must be positive, got {}",
                self.speed
            )));
        }

        let mut previous_end = 0;
        for (i, segment) in self.intro_segments.iter().enumerate() {
            if segment.end < segment.start {
                return Err(Error::InvalidScore(format!(
                    "introduction segment {} ends at tick {} before it starts at tick {}",
                    i + 1,
                    segment.end,
                    segment.start
                )));
            }
            if segment.start < previous_end {
                return Err(Error::InvalidScore(format!(
                    "introduction segment {} starts at tick {} inside the previous segment",
                    i + 1,
                    segment.start
                )));
            }
            previous_end = segment.end;
        }
        Ok(())
    }
}

/// Operator choices applied on top of the score sheet
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceOptions {
    pub speed: f32,
    /// Perform at this tempo instead of the written one
    pub bpm: Option<f32>,
    /// Play this many verses instead of the written count
    pub verses: Option<u32>,
    pub play_intro: bool,
    pub verbose: bool,
}

impl Default for PerformanceOptions {
    fn default() -> Self {
        Self {
            speed: 1.0,
            bpm: None,
            verses: None,
            play_intro: true,
            verbose: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoreSheet {
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_key")]
    pub key: String,
    #[serde(default = "default_time_signature")]
    pub time_signature: String,
    #[serde(default = "default_ticks_per_quarter")]
    pub ticks_per_quarter: u32,
    #[serde(default = "default_verses")]
    pub verses: u32,
    #[serde(default)]
    pub pause_ticks: Option<u32>,
    #[serde(default)]
    pub events: Vec<EventEntry>,
}

fn default_key() -> String {
    "C".to_string()
}

fn default_time_signature() -> String {
    "4/4".to_string()
}

fn default_ticks_per_quarter() -> u32 {
    DEFAULT_TICKS_PER_QUARTER
}

fn default_verses() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventEntry {
    pub tick: u32,
    pub marker: Option<String>,
    pub text: Option<String>,
    pub note_on: Option<NoteOnEntry>,
    pub note_off: Option<NoteOffEntry>,
    pub control_change: Option<ControlChangeEntry>,
    pub tempo: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoteOnEntry {
    #[serde(default)]
    pub channel: u8,
    pub key: u8,
    pub velocity: u8,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoteOffEntry {
    #[serde(default)]
    pub channel: u8,
    pub key: u8,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlChangeEntry {
    #[serde(default)]
    pub channel: u8,
    pub controller: u8,
    pub value: u8,
}

impl EventEntry {
    fn into_event(self) -> Result<Event> {
        let tick = self.tick;
        let mut messages = Vec::with_capacity(1);

        if let Some(text) = self.marker {
            messages.push(Message::Marker(text));
        }
        if let Some(text) = self.text {
            messages.push(Message::Text(text));
        }
        if let Some(n) = self.note_on {
            messages.push(Message::NoteOn {
                channel: n.channel,
                key: n.key,
                velocity: n.velocity,
            });
        }
        if let Some(n) = self.note_off {
            messages.push(Message::NoteOff {
                channel: n.channel,
                key: n.key,
            });
        }
        if let Some(cc) = self.control_change {
            messages.push(Message::ControlChange {
                channel: cc.channel,
                controller: cc.controller,
                value: cc.value,
            });
        }
        if let Some(usec_per_quarter) = self.tempo {
            messages.push(Message::Tempo { usec_per_quarter });
        }

        match messages.len() {
            1 => Ok(Event::new(tick, messages.remove(0))),
            n => Err(Error::InvalidScore(format!(
                "event at tick {} must carry exactly one message, found {}",
                tick, n
            ))),
        }
    }
}

impl ScoreSheet {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

/// A loaded score: metadata plus the tick-ordered timeline
#[derive(Debug, Clone)]
pub struct Score {
    pub info: ScoreInfo,
    pub timeline: Vec<Event>,
}

impl Score {
    /// Load a score sheet from disk and apply `options`
    pub fn load(path: &Path, options: &PerformanceOptions) -> Result<Self> {
        let sheet = ScoreSheet::load(path)?;
        let score = Self::from_sheet(sheet, options)?;
        info!(
            "Loaded {} ({} events)",
            path.display(),
            score.timeline.len()
        );
        Ok(score)
    }

    pub fn from_sheet(sheet: ScoreSheet, options: &PerformanceOptions) -> Result<Self> {
        let denominator = parse_denominator(&sheet.time_signature)?;

        let mut timeline = sheet
            .events
            .into_iter()
            .map(EventEntry::into_event)
            .collect::<Result<Vec<_>>>()?;
        // Stable: events sharing a tick keep their written order
        timeline.sort_by_key(|event| event.tick);

        let intro_segments = derive_intro_segments(&timeline)?;
        let potential_stuck_note = detect_stuck_note(&timeline, &intro_segments);

        let usec_per_quarter = timeline
            .iter()
            .find_map(|event| match event.message {
                Message::Tempo { usec_per_quarter } if usec_per_quarter > 0 => {
                    Some(usec_per_quarter)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_USEC_PER_QUARTER);

        let quarters_per_minute = MICROSECONDS_PER_MINUTE / usec_per_quarter as f32;
        let file_bpm = quarters_per_minute * (denominator as f32 / QUARTER_NOTE_DENOMINATOR);

        let play_intro = options.play_intro && !intro_segments.is_empty();
        if options.play_intro && !play_intro {
            debug!("Score has no introduction markers; introduction skipped");
        }

        let info = ScoreInfo {
            title: sheet.title,
            key_signature: sheet.key,
            time_signature: sheet.time_signature,
            verses: options.verses.unwrap_or(sheet.verses),
            pause_ticks: sheet.pause_ticks,
            usec_per_quarter,
            ticks_per_quarter: sheet.ticks_per_quarter,
            file_bpm,
            bpm: options.bpm.unwrap_or(file_bpm),
            speed: options.speed,
            intro_segments,
            play_intro,
            potential_stuck_note,
            verbose: options.verbose,
        };
        info.validate()?;

        Ok(Self { info, timeline })
    }
}

fn parse_denominator(time_signature: &str) -> Result<u32> {
    let invalid = || Error::InvalidScore(format!("invalid time signature '{}'", time_signature));

    let (_, denominator) = time_signature.split_once('/').ok_or_else(invalid)?;
    let denominator: u32 = denominator.trim().parse().map_err(|_| invalid())?;
    if denominator == 0 || !denominator.is_power_of_two() {
        return Err(invalid());
    }
    Ok(denominator)
}

/// Pair `"["` and `"]"` markers into segments; a `"]"` closes the most
/// recently opened segment
fn derive_intro_segments(timeline: &[Event]) -> Result<Vec<IntroSegment>> {
    let mut segments: Vec<IntroSegment> = Vec::new();
    let mut open = false;

    for event in timeline {
        match event.marker_text() {
            Some(INTRO_BEGIN) => {
                if open {
                    return Err(Error::InvalidScore(format!(
                        "introduction segment opened at tick {} before the previous one closed",
                        event.tick
                    )));
                }
                segments.push(IntroSegment {
                    start: event.tick,
                    end: event.tick,
                });
                open = true;
            }
            Some(INTRO_END) => {
                if let Some(last) = segments.last_mut() {
                    last.end = event.tick;
                    open = false;
                }
            }
            _ => {}
        }
    }

    if open {
        let start = segments.last().map(|s| s.start).unwrap_or_default();
        return Err(Error::InvalidScore(format!(
            "introduction segment at tick {} is never closed",
            start
        )));
    }
    Ok(segments)
}

/// The introduction's final `"]"` sits on the score's last tick and a
/// note-off is at or after it, so the jump can cut a note-off short
fn detect_stuck_note(timeline: &[Event], segments: &[IntroSegment]) -> bool {
    let Some(last_segment) = segments.last() else {
        return false;
    };
    let track_end = timeline.last().map(|e| e.tick).unwrap_or_default();
    let last_note_off = timeline
        .iter()
        .filter(|e| e.is_note_off())
        .map(|e| e.tick)
        .max();

    track_end == last_segment.end && last_note_off.is_some_and(|tick| tick >= last_segment.end)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = r#"
title = "Old Hundredth"
key = "G"
time_signature = "4/4"
ticks_per_quarter = 480
verses = 4
pause_ticks = 480

[[events]]
tick = 0
tempo = 600000

[[events]]
tick = 0
marker = "["

[[events]]
tick = 0
note_on = { key = 67, velocity = 80 }

[[events]]
tick = 480
note_off = { key = 67 }

[[events]]
tick = 480
marker = "]"

[[events]]
tick = 1920
marker = "["

[[events]]
tick = 2400
marker = "]"

[[events]]
tick = 2880
marker = "Fine"
"#;

    fn load(sheet: &str, options: &PerformanceOptions) -> Result<Score> {
        Score::from_sheet(ScoreSheet::from_toml_str(sheet)?, options)
    }

    #[test]
    fn test_sheet_metadata_and_segments() {
        let score = load(SHEET, &PerformanceOptions::default()).unwrap();
        let info = &score.info;

        assert_eq!(info.title, "Old Hundredth");
        assert_eq!(info.key_signature, "G");
        assert_eq!(info.verses, 4);
        assert_eq!(info.pause_ticks, Some(480));
        assert_eq!(info.usec_per_quarter, 600_000);
        assert!((info.file_bpm - 100.0).abs() < 1e-3);
        assert_eq!(info.bpm, info.file_bpm);
        assert_eq!(
            info.intro_segments,
            vec![
                IntroSegment { start: 0, end: 480 },
                IntroSegment { start: 1920, end: 2400 }
            ]
        );
        assert!(info.should_play_intro());
        assert!(!info.potential_stuck_note);
        assert_eq!(score.timeline.len(), 8);
    }

    #[test]
    fn test_timeline_sorted_stably() {
        let sheet = r#"
[[events]]
tick = 10
marker = "b"

[[events]]
tick = 0
marker = "a"

[[events]]
tick = 10
marker = "c"
"#;
        let score = load(sheet, &PerformanceOptions::default()).unwrap();
        let texts: Vec<_> = score.timeline.iter().filter_map(|e| e.marker_text()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_defaults_without_tempo_event() {
        let score = load("title = \"Plain\"", &PerformanceOptions::default()).unwrap();
        assert_eq!(score.info.usec_per_quarter, DEFAULT_USEC_PER_QUARTER);
        assert!((score.info.file_bpm - 120.0).abs() < 1e-3);
        assert_eq!(score.info.verses, 1);
        assert!(!score.info.play_intro);
    }

    #[test]
    fn test_file_bpm_uses_time_signature_denominator() {
        let sheet = r#"
time_signature = "6/8"

[[events]]
tick = 0
tempo = 600000
"#;
        let score = load(sheet, &PerformanceOptions::default()).unwrap();
        assert!((score.info.file_bpm - 200.0).abs() < 1e-3);
    }

    #[test]
    fn test_options_override_sheet() {
        let options = PerformanceOptions {
            speed: 0.9,
            bpm: Some(80.0),
            verses: Some(2),
            play_intro: false,
            verbose: true,
        };
        let score = load(SHEET, &options).unwrap();

        assert_eq!(score.info.verses, 2);
        assert_eq!(score.info.bpm, 80.0);
        assert!(!score.info.should_play_intro());
        assert!(score.info.verbose);
        assert!((score.info.initial_speed() - 0.8 * 0.9).abs() < 1e-5);
    }

    #[test]
    fn test_stuck_note_when_intro_ends_on_last_tick() {
        let sheet = r#"
[[events]]
tick = 0
marker = "["

[[events]]
tick = 0
note_on = { key = 60, velocity = 90 }

[[events]]
tick = 960
note_off = { key = 60 }

[[events]]
tick = 960
marker = "]"
"#;
        let score = load(sheet, &PerformanceOptions::default()).unwrap();
        assert!(score.info.potential_stuck_note);
    }

    #[test]
    fn test_unclosed_segment_rejected() {
        let sheet = r#"
[[events]]
tick = 0
marker = "["
"#;
        let err = load(sheet, &PerformanceOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidScore(_)));
    }

    #[test]
    fn test_event_with_two_messages_rejected() {
        let sheet = r#"
[[events]]
tick = 0
marker = "Fine"
text = "Fine"
"#;
        let err = load(sheet, &PerformanceOptions::default()).unwrap_err();
        assert!(err.to_string().contains("exactly one message"));
    }

    #[test]
    fn test_bad_time_signature_rejected() {
        for ts in ["4", "4/0", "3/5", "x/y"] {
            let sheet = format!("time_signature = \"{}\"", ts);
            assert!(load(&sheet, &PerformanceOptions::default()).is_err(), "{}", ts);
        }
    }

    #[test]
    fn test_zero_verses_rejected() {
        let err = load("verses = 0", &PerformanceOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidScore(_)));
    }

    #[test]
    fn test_validate_segment_ordering() {
        let mut info = ScoreInfo {
            intro_segments: vec![IntroSegment { start: 100, end: 50 }],
            ..ScoreInfo::default()
        };
        assert!(info.validate().is_err());

        info.intro_segments = vec![
            IntroSegment { start: 0, end: 100 },
            IntroSegment { start: 50, end: 150 },
        ];
        assert!(info.validate().is_err());

        info.intro_segments = vec![
            IntroSegment { start: 0, end: 100 },
            IntroSegment { start: 100, end: 250 },
        ];
        assert!(info.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_speed() {
        for speed in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let info = ScoreInfo {
                speed,
                ..ScoreInfo::default()
            };
            assert!(info.validate().is_err(), "speed {}", speed);
        }
    }

    #[test]
    fn test_pause_duration() {
        let info = ScoreInfo {
            pause_ticks: Some(480),
            usec_per_quarter: 500_000,
            ticks_per_quarter: 480,
            ..ScoreInfo::default()
        };
        assert_eq!(info.pause_duration(), Some(Duration::from_millis(500)));
        assert_eq!(ScoreInfo::default().pause_duration(), None);
    }
}
