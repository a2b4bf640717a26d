//! Timed score events emitted by the playback engine
//!
//! Events carry an absolute tick position and a message. Only the subset of
//! MIDI messages the player reacts to is modelled; wire encoding belongs to
//! the output device, not this crate.

/// Message payload of a timed event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    /// Marker meta-event; musical directions live here
    Marker(String),
    /// Free text meta-event (never interpreted as a direction)
    Text(String),
    /// Tempo meta-event
    Tempo { usec_per_quarter: u32 },
}

/// A message at an absolute tick position in the score
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub tick: u32,
    pub message: Message,
}

impl Event {
    pub fn new(tick: u32, message: Message) -> Self {
        Self { tick, message }
    }

    pub fn marker(tick: u32, text: impl Into<String>) -> Self {
        Self::new(tick, Message::Marker(text.into()))
    }

    pub fn note_on(tick: u32, channel: u8, key: u8, velocity: u8) -> Self {
        Self::new(tick, Message::NoteOn { channel, key, velocity })
    }

    pub fn note_off(tick: u32, channel: u8, key: u8) -> Self {
        Self::new(tick, Message::NoteOff { channel, key })
    }

    /// Marker text, if this is a marker meta-event
    pub fn marker_text(&self) -> Option<&str> {
        match &self.message {
            Message::Marker(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// True for note-off, including note-on with zero velocity
    pub fn is_note_off(&self) -> bool {
        matches!(
            self.message,
            Message::NoteOff { .. } | Message::NoteOn { velocity: 0, .. }
        )
    }

    /// True for a sounding note-on
    pub fn is_note_on(&self) -> bool {
        matches!(self.message, Message::NoteOn { velocity, .. } if velocity > 0)
    }
}
