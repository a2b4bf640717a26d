//! Reference playback engine
//!
//! Plays an in-memory, tick-ordered timeline on a dedicated worker thread.
//! Musical time advances by real elapsed time scaled by the current speed;
//! a speed at or below zero stalls musical time while heartbeats continue.
//!
//! **Threading:** transport state lives behind one mutex with a condvar the
//! worker sleeps on. Callbacks run on the worker with the lock released, so
//! they may freely call back into the engine (`stop`, `go_to_tick`, `play`,
//! `finish`).
//!
//! **Seeking from a callback:** a seek to the tick of the event being
//! dispatched resumes after that event, so a marker cannot re-trigger itself.

use super::engine::{EventCallback, FinishedCallback, HeartbeatCallback, PlaybackEngine};
use super::events::{Event, Message};
use super::output::EventSink;
use super::score::DEFAULT_USEC_PER_QUARTER;
use crate::error::{Error, Result};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, trace};

type SharedEventCallback = Arc<dyn Fn(&Event) -> bool + Send + Sync>;
type SharedNotifyCallback = Arc<dyn Fn() + Send + Sync>;

struct Transport {
    /// Next timeline index to dispatch
    index: usize,
    tick: f64,
    playing: bool,
    finish_requested: bool,
    shutdown: bool,
    speed: f32,
    usec_per_quarter: u32,
    last_advance: Instant,
    next_heartbeat: Instant,
    /// Bumped on every seek
    generation: u64,
    seek_tick: u32,
}

#[derive(Default)]
struct Callbacks {
    event: Option<SharedEventCallback>,
    heartbeat: Option<SharedNotifyCallback>,
    finished: Option<SharedNotifyCallback>,
}

struct SharedEngineState {
    transport: Mutex<Transport>,
    wake: Condvar,
    callbacks: Mutex<Callbacks>,
    timeline: Vec<Event>,
    ticks_per_quarter: u32,
    heartbeat_interval: Duration,
    sink: Arc<dyn EventSink>,
}

impl SharedEngineState {
    fn transport(&self) -> MutexGuard<'_, Transport> {
        self.transport.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn callbacks(&self) -> MutexGuard<'_, Callbacks> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn usec_per_tick(&self, usec_per_quarter: u32) -> f64 {
        f64::from(usec_per_quarter) / f64::from(self.ticks_per_quarter.max(1))
    }

    /// Move musical time forward to `now`
    fn advance(&self, transport: &mut Transport, now: Instant) {
        let elapsed = now.saturating_duration_since(transport.last_advance);
        transport.last_advance = now;
        if transport.speed > 0.0 {
            let usec = elapsed.as_secs_f64() * 1_000_000.0;
            transport.tick +=
                usec * f64::from(transport.speed) / self.usec_per_tick(transport.usec_per_quarter);
        }
    }

    fn seek(&self, tick: u32) {
        let mut transport = self.transport();
        transport.index = self.timeline.partition_point(|event| event.tick < tick);
        transport.tick = f64::from(tick);
        transport.last_advance = Instant::now();
        transport.generation = transport.generation.wrapping_add(1);
        transport.seek_tick = tick;
        drop(transport);
        self.wake.notify_all();
    }

    /// Run the event callback, then play the event if it was accepted
    fn dispatch(&self, event: &Event) {
        let callback = self.callbacks().event.clone();
        let forward = callback.map_or(true, |cb| cb(event));

        if let Message::Tempo { usec_per_quarter } = event.message {
            if usec_per_quarter > 0 {
                self.transport().usec_per_quarter = usec_per_quarter;
            }
        }

        if forward {
            self.sink.send(event);
        }
    }

    fn fire_heartbeat(&self) {
        let callback = self.callbacks().heartbeat.clone();
        if let Some(cb) = callback {
            cb();
        }
    }

    fn fire_finished(&self) {
        debug!("Playback finished");
        let callback = self.callbacks().finished.clone();
        if let Some(cb) = callback {
            cb();
        }
    }
}

/// Thread-driven `PlaybackEngine` over an in-memory timeline
pub struct ClockEngine {
    state: Arc<SharedEngineState>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ClockEngine {
    /// Start the worker for `timeline`, which must be sorted by tick
    pub fn new(
        timeline: Vec<Event>,
        ticks_per_quarter: u32,
        heartbeat_interval: Duration,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        if ticks_per_quarter == 0 {
            return Err(Error::Engine("ticks per quarter must be positive".to_string()));
        }
        if let Some(pair) = timeline.windows(2).find(|pair| pair[1].tick < pair[0].tick) {
            return Err(Error::Engine(format!(
                "timeline out of order: tick {} follows tick {}",
                pair[1].tick, pair[0].tick
            )));
        }

        let now = Instant::now();
        let state = Arc::new(SharedEngineState {
            transport: Mutex::new(Transport {
                index: 0,
                tick: 0.0,
                playing: false,
                finish_requested: false,
                shutdown: false,
                speed: 1.0,
                usec_per_quarter: DEFAULT_USEC_PER_QUARTER,
                last_advance: now,
                next_heartbeat: now,
                generation: 0,
                seek_tick: 0,
            }),
            wake: Condvar::new(),
            callbacks: Mutex::new(Callbacks::default()),
            timeline,
            ticks_per_quarter,
            heartbeat_interval: heartbeat_interval.max(Duration::from_millis(1)),
            sink,
        });

        let worker_state = Arc::clone(&state);
        let handle = thread::Builder::new()
            .name("clock-engine".to_string())
            .spawn(move || Self::worker_loop(worker_state))
            .map_err(|e| Error::Engine(format!("failed to start worker thread: {}", e)))?;

        debug!(
            "Clock engine started ({} events, {} ticks/quarter)",
            state.timeline.len(),
            ticks_per_quarter
        );

        Ok(Self {
            state,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Current position in ticks
    pub fn position(&self) -> u32 {
        self.state.transport().tick as u32
    }

    pub fn is_playing(&self) -> bool {
        self.state.transport().playing
    }

    fn worker_loop(state: Arc<SharedEngineState>) {
        let mut transport = state.transport();

        loop {
            transport = state
                .wake
                .wait_while(transport, |t| !t.playing && !t.finish_requested && !t.shutdown)
                .unwrap_or_else(PoisonError::into_inner);

            if transport.shutdown {
                break;
            }

            if transport.finish_requested {
                transport.finish_requested = false;
                transport.playing = false;
                drop(transport);
                state.fire_finished();
                transport = state.transport();
                continue;
            }

            let now = Instant::now();
            state.advance(&mut transport, now);

            if now >= transport.next_heartbeat {
                transport.next_heartbeat = now + state.heartbeat_interval;
                drop(transport);
                state.fire_heartbeat();
                transport = state.transport();
                continue;
            }

            let index = transport.index;
            let Some(event) = state.timeline.get(index) else {
                transport.playing = false;
                drop(transport);
                state.fire_finished();
                transport = state.transport();
                continue;
            };

            if f64::from(event.tick) <= transport.tick {
                transport.index = index + 1;
                let generation = transport.generation;
                drop(transport);

                trace!("Dispatching event {} at tick {}", index, event.tick);
                state.dispatch(event);

                transport = state.transport();
                if transport.generation != generation
                    && transport.seek_tick == event.tick
                    && transport.index <= index
                {
                    transport.index = index + 1;
                }
                continue;
            }

            let until_heartbeat = transport.next_heartbeat.saturating_duration_since(now);
            let wait = if transport.speed > 0.0 {
                let ticks_ahead = f64::from(event.tick) - transport.tick;
                let usec = ticks_ahead * state.usec_per_tick(transport.usec_per_quarter)
                    / f64::from(transport.speed);
                Duration::try_from_secs_f64(usec.max(0.0) / 1_000_000.0)
                    .map_or(until_heartbeat, |until_event| until_heartbeat.min(until_event))
            } else {
                until_heartbeat
            };

            transport = state
                .wake
                .wait_timeout(transport, wait)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }

        debug!("Clock engine worker exiting");
    }
}

impl PlaybackEngine for ClockEngine {
    fn play(&self) {
        let mut transport = self.state.transport();
        if !transport.playing {
            let now = Instant::now();
            transport.playing = true;
            transport.last_advance = now;
            transport.next_heartbeat = now + self.state.heartbeat_interval;
        }
        drop(transport);
        self.state.wake.notify_all();
    }

    fn stop(&self) {
        let mut transport = self.state.transport();
        if transport.playing {
            let now = Instant::now();
            self.state.advance(&mut transport, now);
            transport.playing = false;
        }
        drop(transport);
        self.state.wake.notify_all();
    }

    fn finish(&self) {
        self.state.transport().finish_requested = true;
        self.state.wake.notify_all();
    }

    fn notes_off(&self) {
        self.state.sink.all_notes_off();
    }

    fn rewind(&self) {
        self.state.seek(0);
    }

    fn go_to_tick(&self, tick: u32) {
        self.state.seek(tick);
    }

    fn set_speed(&self, speed: f32) {
        let mut transport = self.state.transport();
        // Time played so far counts at the old speed
        let now = Instant::now();
        if transport.playing {
            self.state.advance(&mut transport, now);
        }
        transport.speed = speed;
        drop(transport);
        self.state.wake.notify_all();
    }

    fn get_speed(&self) -> f32 {
        self.state.transport().speed
    }

    fn set_tempo(&self, usec_per_quarter: u32) {
        if usec_per_quarter == 0 {
            error!("Ignoring zero tempo");
            return;
        }
        self.state.transport().usec_per_quarter = usec_per_quarter;
        self.state.wake.notify_all();
    }

    fn set_event_callback(&self, callback: EventCallback) {
        self.state.callbacks().event = Some(Arc::from(callback));
    }

    fn set_heartbeat_callback(&self, callback: HeartbeatCallback) {
        self.state.callbacks().heartbeat = Some(Arc::from(callback));
    }

    fn set_finished_callback(&self, callback: FinishedCallback) {
        self.state.callbacks().finished = Some(Arc::from(callback));
    }

    fn clear_callbacks(&self) {
        *self.state.callbacks() = Callbacks::default();
    }
}

impl Drop for ClockEngine {
    fn drop(&mut self) {
        self.state.transport().shutdown = true;
        self.state.wake.notify_all();

        let handle = self
            .worker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            // The last handle may be released from inside a callback
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if let Err(e) = handle.join() {
                error!("Clock engine worker panicked: {:?}", e);
            }
        }
    }
}
