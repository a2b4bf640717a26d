//! Playback control: musical form, markers and the engine seam

pub mod clock_engine;
pub mod coordinator;
pub mod engine;
pub mod events;
pub mod interpreter;
pub mod markers;
pub mod output;
pub mod score;
pub mod state;
pub mod synchronizer;
pub mod tempo_decay;

pub use clock_engine::ClockEngine;
pub use coordinator::{Coordinator, Phase, PlaybackInfo};
pub use engine::{EventCallback, FinishedCallback, HeartbeatCallback, PlaybackEngine};
pub use events::{Event, Message};
pub use interpreter::MarkerInterpreter;
pub use markers::MarkerKind;
pub use output::{EventSink, LogSink};
pub use score::{IntroSegment, PerformanceOptions, Score, ScoreInfo, ScoreSheet};
pub use state::{PlaybackState, StateSnapshot};
pub use synchronizer::Synchronizer;
pub use tempo_decay::TempoDecay;
