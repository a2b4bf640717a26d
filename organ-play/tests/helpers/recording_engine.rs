//! Scripted playback engine for coordinator and interpreter tests
//!
//! Each top-level `play()` pops the next queued run of events and feeds it
//! through the event callback on the calling thread. A run ends when the
//! events are exhausted (the finished callback fires, as at the end of a
//! score) or when a callback stops the engine. Calls made from inside a
//! callback are recorded but do not start a new run.

use organ_play::playback::{
    Event, EventCallback, EventSink, FinishedCallback, HeartbeatCallback, PlaybackEngine,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// One recorded engine call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Play,
    Stop,
    Finish,
    NotesOff,
    Rewind,
    GoToTick(u32),
    SetSpeed(f32),
    SetTempo(u32),
}

type Observer = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Callbacks {
    event: Option<Arc<dyn Fn(&Event) -> bool + Send + Sync>>,
    heartbeat: Option<Arc<dyn Fn() + Send + Sync>>,
    finished: Option<Arc<dyn Fn() + Send + Sync>>,
}

pub struct RecordingEngine {
    calls: Mutex<Vec<Call>>,
    runs: Mutex<VecDeque<Vec<Event>>>,
    callbacks: Mutex<Callbacks>,
    speed: Mutex<f32>,
    playing: AtomicBool,
    dispatching: AtomicBool,
    finished_this_run: AtomicBool,
    /// Finish immediately when `play()` finds no queued run
    auto_finish: AtomicBool,
    play_observer: Mutex<Option<Observer>>,
    forwarded: Mutex<Vec<Event>>,
}

impl RecordingEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            runs: Mutex::new(VecDeque::new()),
            callbacks: Mutex::new(Callbacks::default()),
            speed: Mutex::new(1.0),
            playing: AtomicBool::new(false),
            dispatching: AtomicBool::new(false),
            finished_this_run: AtomicBool::new(false),
            auto_finish: AtomicBool::new(true),
            play_observer: Mutex::new(None),
            forwarded: Mutex::new(Vec::new()),
        })
    }

    /// Queue the events the next top-level `play()` will emit
    pub fn queue_run(&self, events: Vec<Event>) {
        self.runs.lock().unwrap().push_back(events);
    }

    pub fn set_auto_finish(&self, enabled: bool) {
        self.auto_finish.store(enabled, Ordering::SeqCst);
    }

    /// Run `observer` at the start of every top-level `play()`
    pub fn on_play(&self, observer: impl Fn() + Send + Sync + 'static) {
        *self.play_observer.lock().unwrap() = Some(Arc::new(observer));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    /// Calls other than speed and tempo changes
    pub fn transport_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::SetSpeed(_) | Call::SetTempo(_)))
            .collect()
    }

    /// Events the event callback let through
    pub fn forwarded(&self) -> Vec<Event> {
        self.forwarded.lock().unwrap().clone()
    }

    /// Pass one event through the event callback, as the engine would
    pub fn emit(&self, event: &Event) -> bool {
        let callback = self.callbacks.lock().unwrap().event.clone();
        let forward = callback.map_or(true, |cb| cb(event));
        if forward {
            self.forwarded.lock().unwrap().push(event.clone());
        }
        forward
    }

    pub fn heartbeat(&self) {
        let callback = self.callbacks.lock().unwrap().heartbeat.clone();
        if let Some(cb) = callback {
            cb();
        }
    }

    pub fn has_callbacks(&self) -> bool {
        let callbacks = self.callbacks.lock().unwrap();
        callbacks.event.is_some() || callbacks.heartbeat.is_some() || callbacks.finished.is_some()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn fire_finished(&self) {
        let callback = self.callbacks.lock().unwrap().finished.clone();
        if let Some(cb) = callback {
            cb();
        }
    }

    fn run(&self) {
        self.dispatching.store(true, Ordering::SeqCst);
        self.finished_this_run.store(false, Ordering::SeqCst);

        let run = self.runs.lock().unwrap().pop_front();
        match run {
            Some(events) => {
                for event in &events {
                    self.emit(event);
                    if !self.playing.load(Ordering::SeqCst) {
                        break;
                    }
                }
                if !self.finished_this_run.load(Ordering::SeqCst)
                    && self.playing.load(Ordering::SeqCst)
                {
                    self.playing.store(false, Ordering::SeqCst);
                    self.fire_finished();
                }
            }
            None => {
                if self.auto_finish.load(Ordering::SeqCst) {
                    self.playing.store(false, Ordering::SeqCst);
                    self.fire_finished();
                }
            }
        }

        self.dispatching.store(false, Ordering::SeqCst);
    }
}

impl PlaybackEngine for RecordingEngine {
    fn play(&self) {
        self.record(Call::Play);
        self.playing.store(true, Ordering::SeqCst);
        if self.dispatching.load(Ordering::SeqCst) {
            return;
        }
        let observer = self.play_observer.lock().unwrap().clone();
        if let Some(observer) = observer {
            observer();
        }
        self.run();
    }

    fn stop(&self) {
        self.record(Call::Stop);
        self.playing.store(false, Ordering::SeqCst);
    }

    fn finish(&self) {
        self.record(Call::Finish);
        self.playing.store(false, Ordering::SeqCst);
        self.finished_this_run.store(true, Ordering::SeqCst);
        self.fire_finished();
    }

    fn notes_off(&self) {
        self.record(Call::NotesOff);
    }

    fn rewind(&self) {
        self.record(Call::Rewind);
    }

    fn go_to_tick(&self, tick: u32) {
        self.record(Call::GoToTick(tick));
    }

    fn set_speed(&self, speed: f32) {
        self.record(Call::SetSpeed(speed));
        *self.speed.lock().unwrap() = speed;
    }

    fn get_speed(&self) -> f32 {
        *self.speed.lock().unwrap()
    }

    fn set_tempo(&self, usec_per_quarter: u32) {
        self.record(Call::SetTempo(usec_per_quarter));
    }

    fn set_event_callback(&self, callback: EventCallback) {
        self.callbacks.lock().unwrap().event = Some(Arc::from(callback));
    }

    fn set_heartbeat_callback(&self, callback: HeartbeatCallback) {
        self.callbacks.lock().unwrap().heartbeat = Some(Arc::from(callback));
    }

    fn set_finished_callback(&self, callback: FinishedCallback) {
        self.callbacks.lock().unwrap().finished = Some(Arc::from(callback));
    }

    fn clear_callbacks(&self) {
        *self.callbacks.lock().unwrap() = Callbacks::default();
    }
}

/// Keeps every event the engine played
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
    notes_off: Mutex<u32>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn marker_texts(&self) -> Vec<String> {
        self.events()
            .iter()
            .filter_map(|e| e.marker_text().map(str::to_string))
            .collect()
    }

    pub fn notes_off_count(&self) -> u32 {
        *self.notes_off.lock().unwrap()
    }
}

impl EventSink for RecordingSink {
    fn send(&self, event: &Event) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn all_notes_off(&self) {
        *self.notes_off.lock().unwrap() += 1;
    }
}
