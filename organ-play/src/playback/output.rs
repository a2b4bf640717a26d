//! Event output
//!
//! Where the reference engine delivers events it decided to play. Device
//! wire encoding is out of scope; [`LogSink`] reports events through
//! `tracing` instead.

use super::events::{Event, Message};
use tracing::{debug, info, trace};

/// Destination for events the engine plays
pub trait EventSink: Send + Sync {
    fn send(&self, event: &Event);

    /// Release every sounding note
    fn all_notes_off(&self);
}

/// Writes events to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn send(&self, event: &Event) {
        match &event.message {
            Message::Marker(text) => info!("[{}] marker \"{}\"", event.tick, text),
            Message::Text(text) => debug!("[{}] text \"{}\"", event.tick, text),
            Message::Tempo { usec_per_quarter } => {
                debug!("[{}] tempo {} usec/quarter", event.tick, usec_per_quarter)
            }
            message => trace!("[{}] {:?}", event.tick, message),
        }
    }

    fn all_notes_off(&self) {
        info!("All notes off");
    }
}
