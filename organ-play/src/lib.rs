//! # Organ Player Library (organ-play)
//!
//! Playback control for hymn scores on a church organ.
//!
//! **Purpose:** Perform a score the way an organist would: an introduction
//! assembled from marked segments, a configurable number of verses with
//! pauses between them, a ritardando on the last line, and the D.C. al Fine
//! return when the score calls for it.
//!
//! **Architecture:** A control thread runs the [`playback::Coordinator`];
//! a [`playback::PlaybackEngine`] emits timed events on its own thread and
//! reports back through callbacks. [`playback::ClockEngine`] is the
//! in-process reference engine.

pub mod cli;
pub mod error;
pub mod interrupt;
pub mod playback;
pub mod timing;

pub use error::{Error, Result};
pub use interrupt::OperatorInterrupt;
pub use timing::TimingManager;
