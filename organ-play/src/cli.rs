//! Command-line arguments for the `organ-play` binary

use crate::playback::PerformanceOptions;
use clap::Parser;
use organ_common::PlaybackSettings;
use std::path::PathBuf;

/// Prelude speed argument is tenths of the written tempo
const PRELUDE_SPEED_DIVISOR: f32 = 10.0;
const PRELUDE_MIN_SPEED: f32 = 0.5;
const PRELUDE_MAX_SPEED: f32 = 2.0;
const PRELUDE_VERSES: u32 = 2;

/// Play a hymn score on the organ
#[derive(Parser, Debug)]
#[command(name = "organ-play")]
#[command(about = "Play hymn scores with introductions, verses and ritardandos")]
#[command(version, disable_version_flag = true)]
#[command(arg(clap::Arg::new("version").long("version").help("Print version").action(clap::ArgAction::Version)))]
pub struct Args {
    /// Score sheet to play
    pub score: PathBuf,

    /// Prelude/postlude: two verses, no introduction. Optional speed in
    /// tenths (9 = 90%)
    #[arg(long, value_name = "NN", num_args = 0..=1, require_equals = true)]
    pub prelude: Option<Option<u32>>,

    /// Perform at this tempo in beats per minute
    #[arg(short = 't', long = "tempo", value_name = "BPM",
          value_parser = clap::value_parser!(u32).range(1..))]
    pub tempo: Option<u32>,

    /// Number of verses, with introduction
    #[arg(short = 'n', value_name = "VERSES", conflicts_with = "verses_without_intro",
          value_parser = clap::value_parser!(u32).range(1..))]
    pub verses_with_intro: Option<u32>,

    /// Number of verses, without introduction
    #[arg(short = 'x', value_name = "VERSES",
          value_parser = clap::value_parser!(u32).range(1..))]
    pub verses_without_intro: Option<u32>,

    /// Log every event as it plays
    #[arg(short = 'V', long)]
    pub verbose: bool,

    /// Show musical warnings such as stuck-note risk
    #[arg(short = 'W', long)]
    pub warnings: bool,

    /// Configuration file (overrides ORGAN_PLAY_CONFIG)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Fold the command line into performance options. Flags win over the
    /// configuration file.
    pub fn performance_options(&self, settings: &PlaybackSettings) -> PerformanceOptions {
        let mut options = PerformanceOptions {
            verbose: self.verbose || settings.verbose,
            bpm: self.tempo.map(|bpm| bpm as f32),
            ..PerformanceOptions::default()
        };

        if let Some(prelude) = self.prelude {
            options.verses = Some(PRELUDE_VERSES);
            options.play_intro = false;
            options.speed = match prelude {
                Some(tenths) => prelude_speed(tenths),
                None => settings.prelude_speed,
            };
        }

        if let Some(verses) = self.verses_with_intro {
            options.verses = Some(verses);
            options.play_intro = true;
        }
        if let Some(verses) = self.verses_without_intro {
            options.verses = Some(verses);
            options.play_intro = false;
        }

        options
    }

    pub fn display_warnings(&self, settings: &PlaybackSettings) -> bool {
        self.warnings || settings.display_warnings
    }
}

/// Speed for `--prelude=NN`; out-of-range values play at written tempo
fn prelude_speed(tenths: u32) -> f32 {
    let speed = tenths as f32 / PRELUDE_SPEED_DIVISOR;
    if (PRELUDE_MIN_SPEED..=PRELUDE_MAX_SPEED).contains(&speed) {
        speed
    } else {
        1.0
    }
}
