use std::time::{Duration, Instant};

/// Snapshot of the simulation time supplied to the shader uniforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Accumulated elapsed time in seconds.
    pub seconds: f32,
    /// Delta since the previous step in seconds; zero on the first step.
    pub delta_seconds: f32,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    pub fn new(seconds: f32, delta_seconds: f32, frame_index: u64) -> Self {
        Self {
            seconds,
            delta_seconds,
            frame_index,
        }
    }
}

/// Abstraction over where simulation time originates from.
pub trait TimeSource: Send {
    /// Resets the source to its initial state.
    fn reset(&mut self);
    /// Produces the time sample for the next frame.
    fn sample(&mut self) -> TimeSample;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
    last: Instant,
    frame: u64,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        let now = Instant::now();
        Self {
            origin: now,
            last: now,
            frame: 0,
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        let now = Instant::now();
        self.origin = now;
        self.last = now;
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let now = Instant::now();
        if self.frame == 0 {
            self.origin = now;
            self.last = now;
        }
        let sample = TimeSample::new(
            now.duration_since(self.origin).as_secs_f32(),
            now.duration_since(self.last).as_secs_f32(),
            self.frame,
        );
        self.last = now;
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Time source that advances by a fixed step per rendered frame, decoupling
/// the simulation from wall-clock jitter.
#[derive(Debug, Clone, Copy)]
pub struct FixedStepTimeSource {
    step: Duration,
    elapsed: Duration,
    frame: u64,
}

impl FixedStepTimeSource {
    pub fn new(step: Duration) -> Self {
        Self {
            step,
            elapsed: Duration::ZERO,
            frame: 0,
        }
    }
}

impl TimeSource for FixedStepTimeSource {
    fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let delta = if self.frame == 0 {
            Duration::ZERO
        } else {
            self.step
        };
        self.elapsed += delta;
        let sample = TimeSample::new(
            self.elapsed.as_secs_f32(),
            delta.as_secs_f32(),
            self.frame,
        );
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

/// Builds a time source for the requested integration mode.
pub fn time_source_for_step(step: Option<Duration>) -> BoxedTimeSource {
    match step {
        Some(step) if !step.is_zero() => Box::new(FixedStepTimeSource::new(step)),
        _ => Box::new(SystemTimeSource::new()),
    }
}

/// Accumulator-based frame pacing for an optional FPS cap.
///
/// Uncapped clocks report every tick as renderable. Capped clocks skip ticks
/// that land inside the current interval and subtract a single interval when
/// one elapses, so a long stall does not produce a burst of catch-up frames.
#[derive(Debug)]
pub struct FrameClock {
    interval: Option<Duration>,
    accumulator: Duration,
    last_tick: Option<Instant>,
}

/// Slack added to the accumulator comparison so a tick arriving marginally
/// before the interval boundary still renders.
const PACING_TOLERANCE: Duration = Duration::from_micros(250);

impl FrameClock {
    pub fn new(target_fps: Option<f32>) -> Self {
        let interval = target_fps
            .filter(|fps| *fps > 0.0)
            .map(|fps| Duration::from_secs_f32(1.0 / fps));
        Self {
            interval,
            accumulator: Duration::ZERO,
            last_tick: None,
        }
    }

    /// Reports whether a frame should render at `now`, consuming one interval
    /// when it does.
    pub fn ready(&mut self, now: Instant) -> bool {
        let Some(interval) = self.interval else {
            return true;
        };

        let Some(last) = self.last_tick else {
            self.last_tick = Some(now);
            return true;
        };

        let delta = now.saturating_duration_since(last);
        self.last_tick = Some(now);
        self.accumulator = self.accumulator.saturating_add(delta);
        if self.accumulator + PACING_TOLERANCE < interval {
            return false;
        }
        self.accumulator = self.accumulator.saturating_sub(interval);
        true
    }

    /// Earliest instant at which the next frame becomes due, if capped.
    pub fn next_deadline(&self, now: Instant) -> Option<Instant> {
        let interval = self.interval?;
        let remaining = interval.saturating_sub(self.accumulator);
        Some(now + remaining)
    }
}
