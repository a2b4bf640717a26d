//! Playback engine control surface
//!
//! The engine owns the scheduling loop and transport; the player only needs
//! the primitives below plus three callback hooks. Callbacks are invoked
//! synchronously on the engine's own thread and must return quickly.
//!
//! All methods take `&self`: implementations synchronize internally so the
//! control thread, the callbacks and the interrupt path can share one engine
//! behind an `Arc`.

use super::events::Event;

/// Called once per outgoing event; return `false` to suppress it
pub type EventCallback = Box<dyn Fn(&Event) -> bool + Send + Sync>;

/// Called periodically while playing, independent of events
pub type HeartbeatCallback = Box<dyn Fn() + Send + Sync>;

/// Called when playback reaches the end or `finish()` is requested
pub type FinishedCallback = Box<dyn Fn() + Send + Sync>;

pub trait PlaybackEngine: Send + Sync {
    /// Start or resume emitting events from the current position
    fn play(&self);

    /// Pause emission, keeping the current position
    fn stop(&self);

    /// End the current run; the finished callback fires once
    fn finish(&self);

    /// Silence every sounding note on the output
    fn notes_off(&self);

    /// Return to the start of the score
    fn rewind(&self);

    /// Move the position to `tick`
    fn go_to_tick(&self, tick: u32);

    /// Set the playback speed multiplier (1.0 = notated tempo)
    fn set_speed(&self, speed: f32);

    fn get_speed(&self) -> f32;

    /// Set the tempo in microseconds per quarter note
    fn set_tempo(&self, usec_per_quarter: u32);

    fn set_event_callback(&self, callback: EventCallback);

    fn set_heartbeat_callback(&self, callback: HeartbeatCallback);

    fn set_finished_callback(&self, callback: FinishedCallback);

    /// Drop all registered callbacks
    fn clear_callbacks(&self);
}
