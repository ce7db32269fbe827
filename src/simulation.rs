use std::convert::TryFrom;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bitflags::bitflags;
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::clock::FrameClock;
use crate::config::{Config, FrameSource};
use crate::error::{Error, Result};
use crate::format::Geometry;
use crate::io::{Mapping, ScatterGatherQueue};
use crate::memory::try_zeroed;
use crate::sync::Event;
use crate::timer::Timer;
use crate::traits::{HardwareSink, ImageSynthesizer, MappingOwner};

/// Bytes per pixel of frames injected through `set_data`
const INJECTED_BYTES_PER_PIXEL: usize = 3;

/// Run state of the simulated hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum State {
    Stopped = 0,
    Running = 1,
    Paused = 2,
}

impl TryFrom<u8> for State {
    type Error = ();

    fn try_from(repr: u8) -> std::result::Result<Self, Self::Error> {
        match repr {
            0 => Ok(State::Stopped),
            1 => Ok(State::Running),
            2 => Ok(State::Paused),
            _ => Err(()),
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Stopped => "stopped",
            State::Running => "running",
            State::Paused => "paused",
        };
        write!(f, "{}", name)
    }
}

bitflags! {
    /// What a single tick did
    #[derive(PartialEq, Eq, Debug, Clone, Copy)]
    pub(crate) struct TickFlags: u8 {
        const FRAME_PLACED  = 0x01;
        const FRAME_SKIPPED = 0x02;
        const REARMED       = 0x04;
        const QUIESCED      = 0x08;
    }
}

/// Buffers and schedule of one run, present between start and stop
struct Session {
    geometry: Geometry,
    clock: FrameClock,
    synthesis: Vec<u8>,
    live: Vec<u8>,
    synth: Box<dyn ImageSynthesizer>,
}

struct Shared {
    state: AtomicU8,
    stop_requested: AtomicBool,
    tick_count: AtomicU32,
    completed: AtomicU32,
    skipped: AtomicU32,

    queue: ScatterGatherQueue,
    session: Mutex<Option<Session>>,
    quiesced: Event,

    config: Config,
    sink: Arc<dyn HardwareSink>,
}

/// Read-only view of the hardware counters handed to the interrupt sink
pub struct Registers<'a> {
    shared: &'a Shared,
}

impl Registers<'_> {
    /// Scatter-gather mappings filled since start
    pub fn mappings_completed(&self) -> u32 {
        self.shared.completed.load(Ordering::Relaxed)
    }

    pub fn tick_count(&self) -> u32 {
        self.shared.tick_count.load(Ordering::SeqCst)
    }

    pub fn skipped_frames(&self) -> u32 {
        self.shared.skipped.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> State {
        self.shared.state()
    }
}

impl Shared {
    fn state(&self) -> State {
        State::try_from(self.state.load(Ordering::SeqCst)).unwrap_or(State::Stopped)
    }

    fn set_state(&self, state: State) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// Body of the simulated interrupt, returns the deadline of the next one
    fn tick(&self) -> (TickFlags, Option<Instant>) {
        let tick_count = self.tick_count.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
        let mut flags = TickFlags::empty();

        let clock = {
            let mut session = self.session.lock();
            match session.as_mut() {
                Some(session) => {
                    if self.state() == State::Running {
                        flags |= self.place_frame(session);
                    }
                    Some(session.clock)
                }
                None => None,
            }
        };

        self.sink.on_interrupt(&Registers { shared: self });

        if self
            .stop_requested
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.quiesced.set();
            flags |= TickFlags::QUIESCED;
            trace!(tick_count, ?flags, "tick");
            return (flags, None);
        }

        let next = clock.and_then(|clock| clock.next_fire_time(tick_count));
        if next.is_some() {
            flags |= TickFlags::REARMED;
        } else if clock.is_some() {
            warn!(tick_count, "next frame deadline out of range, timer left idle");
        }
        trace!(tick_count, ?flags, "tick");
        (flags, next)
    }

    fn place_frame(&self, session: &mut Session) -> TickFlags {
        match self.config.frame_source {
            FrameSource::Live => session.synthesis.copy_from_slice(&session.live),
            FrameSource::Synthesized => session.synth.synthesize(&mut session.synthesis),
        }

        let geometry = session.geometry;
        let frame = &session.synthesis[..geometry.frame_bytes()];
        match self.queue.drain(frame, geometry.row_bytes()) {
            Ok(completed) => {
                self.completed.fetch_add(completed, Ordering::SeqCst);
                TickFlags::FRAME_PLACED
            }
            Err(starved) => {
                self.skipped.fetch_add(1, Ordering::SeqCst);
                debug!(rows_missing = starved.rows_missing, "frame skipped");
                TickFlags::FRAME_SKIPPED
            }
        }
    }
}

/// Simulated capture hardware
///
/// A dedicated timer thread plays the role of the frame interrupt. While running, every tick
/// places one frame into the scatter-gather mappings the owner programmed and then notifies the
/// [`HardwareSink`].
pub struct HardwareSimulation {
    shared: Arc<Shared>,
    timer: Timer,
    /// Serializes start, pause and stop
    control: Mutex<()>,
}

impl HardwareSimulation {
    /// Returns a stopped simulation using the default configuration
    ///
    /// # Arguments
    ///
    /// * `sink` - Receiver of the per-tick interrupt
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use capsim::{HardwareSimulation, HardwareSink, Registers, State};
    ///
    /// struct Quiet;
    /// impl HardwareSink for Quiet {
    ///     fn on_interrupt(&self, _registers: &Registers<'_>) {}
    /// }
    ///
    /// let hw = HardwareSimulation::new(Arc::new(Quiet)).unwrap();
    /// assert_eq!(hw.state(), State::Stopped);
    /// ```
    pub fn new(sink: Arc<dyn HardwareSink>) -> Result<Self> {
        HardwareSimulation::with_config(Config::default(), sink)
    }

    pub fn with_config(config: Config, sink: Arc<dyn HardwareSink>) -> Result<Self> {
        let timer_name = config.timer_name.clone();
        let shared = Arc::new(Shared {
            state: AtomicU8::new(State::Stopped as u8),
            stop_requested: AtomicBool::new(false),
            tick_count: AtomicU32::new(0),
            completed: AtomicU32::new(0),
            skipped: AtomicU32::new(0),
            queue: ScatterGatherQueue::with_capacity(config.mappings_max),
            session: Mutex::new(None),
            quiesced: Event::new(),
            config,
            sink,
        });

        let timer = {
            let shared = Arc::clone(&shared);
            Timer::spawn(&timer_name, move || shared.tick().1)?
        };

        Ok(HardwareSimulation {
            shared,
            timer,
            control: Mutex::new(()),
        })
    }

    /// Allocates the frame buffers and starts ticking every `interval`
    ///
    /// Only has an effect while stopped. The first tick fires one interval from now.
    ///
    /// # Arguments
    ///
    /// * `synth` - Synthesizer the buffers are attached to
    /// * `interval` - Time between two ticks
    /// * `width` - Frame width in pixels
    /// * `height` - Frame height in rows
    /// * `image_size` - Size of each frame buffer in bytes
    pub fn start(
        &self,
        mut synth: Box<dyn ImageSynthesizer>,
        interval: Duration,
        width: u32,
        height: u32,
        image_size: usize,
    ) -> Result<()> {
        let _control = self.control.lock();
        let state = self.shared.state();
        if state != State::Stopped {
            debug!(%state, "start ignored");
            return Ok(());
        }

        if interval.as_nanos() == 0 {
            return Err(Error::invalid("zero frame interval"));
        }
        let clock = FrameClock::new(Instant::now(), interval);
        let first = clock.next_fire_time(0).ok_or_else(|| {
            Error::invalid(format!("frame interval {:?} out of range", interval))
        })?;
        let geometry = Geometry::new(width, height, synth.bytes_per_pixel(), image_size)?;
        if image_size > self.shared.config.max_image_size {
            return Err(Error::ResourceExhausted {
                what: "image size above the configured maximum",
            });
        }

        let synthesis = try_zeroed(image_size).ok_or(Error::ResourceExhausted {
            what: "synthesis buffer",
        })?;
        let live = try_zeroed(image_size).ok_or(Error::ResourceExhausted {
            what: "live buffer",
        })?;

        synth.set_image_size(width, height);
        synth.set_buffer(Some(image_size));

        self.shared.tick_count.store(0, Ordering::SeqCst);
        self.shared.completed.store(0, Ordering::SeqCst);
        self.shared.skipped.store(0, Ordering::SeqCst);
        self.shared.stop_requested.store(false, Ordering::SeqCst);
        self.shared.quiesced.reset();

        *self.shared.session.lock() = Some(Session {
            geometry,
            clock,
            synthesis,
            live,
            synth,
        });
        self.shared.queue.open();
        self.shared.set_state(State::Running);
        self.timer.arm(first);

        info!(width, height, image_size, ?interval, "hardware started");
        Ok(())
    }

    /// Pauses (`true`) or resumes (`false`) frame production
    ///
    /// Pausing blocks until the pending tick acknowledges it. Resuming re-synchronizes the tick
    /// count with the wall clock time elapsed since start, paused time included.
    pub fn pause(&self, pausing: bool) -> Result<()> {
        let _control = self.control.lock();
        let state = self.shared.state();

        match (pausing, state) {
            (true, State::Running) => {
                self.quiesce();
                self.shared.set_state(State::Paused);
                debug!(tick_count = self.tick_count(), "hardware paused");
            }
            (false, State::Paused) => {
                let clock = match self.shared.session.lock().as_ref() {
                    Some(session) => session.clock,
                    None => return Ok(()),
                };
                let tick_count = clock.elapsed_ticks(Instant::now());
                let next = clock
                    .next_fire_time(tick_count)
                    .ok_or_else(|| Error::invalid("resume deadline out of range"))?;
                self.shared.tick_count.store(tick_count, Ordering::SeqCst);
                self.shared.set_state(State::Running);
                self.timer.arm(next);
                debug!(tick_count, "hardware resumed");
            }
            _ => debug!(pausing, %state, "pause ignored"),
        }

        Ok(())
    }

    /// Stops frame production, frees the buffers and discards every queued mapping
    pub fn stop(&self) -> Result<()> {
        let _control = self.control.lock();
        let state = self.shared.state();

        match state {
            State::Stopped => {
                debug!("stop ignored");
                return Ok(());
            }
            State::Running => self.quiesce(),
            State::Paused => {}
        }

        self.shared.set_state(State::Stopped);
        self.timer.cancel();
        if let Some(mut session) = self.shared.session.lock().take() {
            session.synth.set_buffer(None);
        }
        let discarded = self.shared.queue.close();
        self.shared.completed.store(0, Ordering::SeqCst);

        info!(
            discarded,
            skipped = self.skipped_frame_count(),
            "hardware stopped"
        );
        Ok(())
    }

    /// Asks the next tick to stop re-arming and waits for it to do so
    fn quiesce(&self) {
        let poll = self.shared.config.quiesce_poll();
        self.shared.quiesced.reset();
        self.shared.stop_requested.store(true, Ordering::SeqCst);

        while !self.shared.quiesced.wait_for(poll) {
            if !self.timer.is_alive() {
                warn!("timer thread is gone, not waiting for the pending tick");
                self.shared.stop_requested.store(false, Ordering::SeqCst);
                break;
            }
            // no tick pending and the request was not taken: nothing left to wait for
            if self.timer.is_idle()
                && self
                    .shared
                    .stop_requested
                    .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
            {
                debug!("no pending tick to acknowledge");
                break;
            }
            trace!(armed = self.timer.is_armed(), "waiting for pending tick");
        }
    }

    /// Queues one scatter-gather descriptor per mapping, carved consecutively out of `*buffer`
    ///
    /// `*buffer` is advanced past every queued chunk. Returns the number of mappings queued,
    /// which is less than `mappings.len()` when the descriptor pool runs out and 0 while stopped.
    ///
    /// # Safety
    ///
    /// `*buffer` must point to at least the sum of the mapping byte counts of writable memory
    /// that stays valid, and is not accessed elsewhere, until the mappings complete or the
    /// hardware is stopped.
    pub unsafe fn program_scatter_gather_mappings(
        &self,
        owner: &Arc<dyn MappingOwner>,
        buffer: &mut *mut u8,
        mappings: &[Mapping],
    ) -> u32 {
        self.shared.queue.program(owner, buffer, mappings)
    }

    /// Mappings completed since start, possibly one tick stale
    pub fn read_number_of_mappings_completed(&self) -> u32 {
        self.shared.completed.load(Ordering::Relaxed)
    }

    /// Injects a top-down frame of 24 bit pixels into the live buffer
    ///
    /// Ignored unless running, or when `frame` is shorter than `width * height * 3` bytes.
    pub fn set_data(&self, frame: &[u8]) {
        if self.shared.state() != State::Running {
            return;
        }

        let mut session = self.shared.session.lock();
        let session = match session.as_mut() {
            Some(session) => session,
            None => return,
        };

        let row_bytes = session.geometry.width as usize * INJECTED_BYTES_PER_PIXEL;
        let height = session.geometry.height as usize;
        let frame_bytes = row_bytes * height;
        if frame.len() < frame_bytes || session.live.len() < frame_bytes {
            return;
        }

        for (y, row) in frame.chunks_exact(row_bytes).take(height).enumerate() {
            let offset = (height - 1 - y) * row_bytes;
            session.live[offset..offset + row_bytes].copy_from_slice(row);
        }
    }

    /// Ticks that found too few mappings queued to place a frame
    pub fn skipped_frame_count(&self) -> u32 {
        self.shared.skipped.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> State {
        self.shared.state()
    }

    pub fn tick_count(&self) -> u32 {
        self.shared.tick_count.load(Ordering::SeqCst)
    }

    pub fn mappings_queued(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn bytes_queued(&self) -> usize {
        self.shared.queue.bytes_queued()
    }

    /// Whether the frame buffers are allocated
    pub fn has_buffers(&self) -> bool {
        self.shared.session.lock().is_some()
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }
}

impl Drop for HardwareSimulation {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
