//! Pointer sampling and the autonomous drive state machine.
//!
//! The render loop owns the mouse uniform; this crate decides what gets
//! written into it each frame. Real pointer samples land in a single-slot
//! [`SampleSlot`] mailbox (event callbacks never touch GPU state directly)
//! and the [`DriveController`] arbitrates between the latest sample and a
//! synthetic orbital position while the user is idle. All timing flows
//! through explicit `Instant`s passed in by the caller, which keeps every
//! transition unit-testable without a clock or a window.

use std::f32::consts::TAU;
use std::time::{Duration, Instant};

use fieldconfig::AutopilotSettings;

/// Base orbital angular speed in radians per second, before the configured
/// speed multiplier is applied. One lap roughly every ten seconds.
pub const BASE_ANGULAR_SPEED: f32 = 0.6;

#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("orbit radius {0} is outside (0, 0.5]")]
    InvalidOrbitRadius(f32),
}

/// A single pointer-move event mapped into normalized surface space.
///
/// Coordinates are clamped to [0, 1] with a bottom-left origin so they can be
/// compared against `gl_FragCoord`-derived positions without further
/// transforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub x: f32,
    pub y: f32,
    pub at: Instant,
}

impl PointerSample {
    pub fn new(x: f32, y: f32, at: Instant) -> Self {
        Self {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
            at,
        }
    }

    /// Converts a device-space cursor position (top-left origin, physical
    /// pixels) into a normalized sample for the given surface size.
    pub fn from_physical(position: (f64, f64), surface: (u32, u32), at: Instant) -> Self {
        let width = surface.0.max(1) as f64;
        let height = surface.1.max(1) as f64;
        Self::new(
            (position.0 / width) as f32,
            (1.0 - position.1 / height) as f32,
            at,
        )
    }

    /// The two floats written into the mouse uniform.
    pub fn as_uniform(&self) -> [f32; 2] {
        [self.x, self.y]
    }
}

/// Single-slot mailbox holding the most recent pointer sample.
///
/// Event callbacks `offer` into it (overwriting any unread sample) and the
/// render loop `take`s at most once per frame, preserving the single-writer
/// discipline over the uniform set.
#[derive(Debug, Default)]
pub struct SampleSlot {
    latest: Option<PointerSample>,
}

impl SampleSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a sample, replacing any previous unread one.
    pub fn offer(&mut self, sample: PointerSample) {
        self.latest = Some(sample);
    }

    /// Removes and returns the pending sample, if any.
    pub fn take(&mut self) -> Option<PointerSample> {
        self.latest.take()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_none()
    }
}

/// Fixed-radius orbit around the surface midpoint.
#[derive(Debug, Clone, Copy)]
pub struct OrbitPath {
    radius: f32,
    angular_speed: f32,
}

impl OrbitPath {
    pub fn new(radius: f32, speed_multiplier: f32) -> Result<Self, DriveError> {
        if !radius.is_finite() || radius <= 0.0 || radius > 0.5 {
            return Err(DriveError::InvalidOrbitRadius(radius));
        }
        Ok(Self {
            radius,
            angular_speed: BASE_ANGULAR_SPEED * speed_multiplier.max(0.0),
        })
    }

    pub fn angular_speed(&self) -> f32 {
        self.angular_speed
    }

    /// Position on the orbit for the given phase angle, centered on (0.5, 0.5).
    pub fn position(&self, angle: f32) -> [f32; 2] {
        [
            0.5 + self.radius * angle.cos(),
            0.5 + self.radius * angle.sin(),
        ]
    }
}

/// Who currently owns the mouse uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriveState {
    /// A real pointer sample arrived recently; autonomous motion is
    /// suppressed until the stored deadline passes.
    UserDriven { takeover_until: Instant },
    /// No recent input; the controller advances the synthetic orbit.
    AutoDriven,
}

/// Arbitrates between live pointer input and autonomous orbital motion.
///
/// The machine starts in [`DriveState::AutoDriven`] and never terminates; it
/// is torn down with the surface that owns it.
#[derive(Debug)]
pub struct DriveController {
    enabled: bool,
    hold: Duration,
    orbit: OrbitPath,
    state: DriveState,
    angle: f32,
}

impl DriveController {
    pub fn new(settings: &AutopilotSettings) -> Result<Self, DriveError> {
        Ok(Self {
            enabled: settings.enabled,
            hold: settings.takeover + settings.resume_delay,
            orbit: OrbitPath::new(settings.orbit_radius, settings.speed)?,
            state: DriveState::AutoDriven,
            angle: 0.0,
        })
    }

    pub fn state(&self) -> DriveState {
        self.state
    }

    /// Current orbit phase angle; stable while the user is driving.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Registers a real pointer sample: flips to `UserDriven`, refreshes the
    /// takeover deadline, and returns the uniform value to write. The sample
    /// is used verbatim; perceived smoothing is the shader falloff's job.
    pub fn observe(&mut self, sample: PointerSample) -> [f32; 2] {
        self.state = DriveState::UserDriven {
            takeover_until: sample.at + self.hold,
        };
        sample.as_uniform()
    }

    /// Advances the autonomous path by `dt` if the controller owns the
    /// uniform at `now`. Returns `None` while the user is driving, while the
    /// takeover deadline has not passed, or when the autopilot is disabled —
    /// in all of those cases the uniform must be left untouched.
    pub fn advance(&mut self, now: Instant, dt: Duration) -> Option<[f32; 2]> {
        if !self.enabled {
            return None;
        }

        if let DriveState::UserDriven { takeover_until } = self.state {
            if now < takeover_until {
                return None;
            }
            // Deadline passed with no intervening sample: resume at the
            // stored phase angle rather than jumping.
            self.state = DriveState::AutoDriven;
        }

        self.angle = (self.angle + dt.as_secs_f32() * self.orbit.angular_speed()) % TAU;
        Some(self.orbit.position(self.angle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> AutopilotSettings {
        AutopilotSettings {
            enabled: true,
            speed: 1.0,
            orbit_radius: 0.30,
            takeover: Duration::from_millis(250),
            resume_delay: Duration::from_secs(3),
        }
    }

    const FRAME: Duration = Duration::from_millis(16);

    #[test]
    fn starts_auto_driven_on_the_orbit() {
        let mut controller = DriveController::new(&settings()).unwrap();
        assert_eq!(controller.state(), DriveState::AutoDriven);

        let position = controller.advance(Instant::now(), FRAME).expect("auto position");
        let dx = position[0] - 0.5;
        let dy = position[1] - 0.5;
        assert!(((dx * dx + dy * dy).sqrt() - 0.30).abs() < 1e-5);
    }

    #[test]
    fn sample_flips_state_immediately() {
        let mut controller = DriveController::new(&settings()).unwrap();
        let now = Instant::now();
        let uniform = controller.observe(PointerSample::new(0.2, 0.8, now));
        assert_eq!(uniform, [0.2, 0.8]);
        assert!(matches!(controller.state(), DriveState::UserDriven { .. }));
        assert_eq!(controller.advance(now, FRAME), None);
    }

    #[test]
    fn resumes_no_earlier_than_the_deadline() {
        let mut controller = DriveController::new(&settings()).unwrap();
        let t0 = Instant::now();
        controller.observe(PointerSample::new(0.5, 0.5, t0));

        let just_before = t0 + Duration::from_millis(3249);
        assert_eq!(controller.advance(just_before, FRAME), None);
        assert!(matches!(controller.state(), DriveState::UserDriven { .. }));

        let deadline = t0 + Duration::from_millis(3250);
        assert!(controller.advance(deadline, FRAME).is_some());
        assert_eq!(controller.state(), DriveState::AutoDriven);
    }

    #[test]
    fn later_samples_refresh_the_deadline() {
        let mut controller = DriveController::new(&settings()).unwrap();
        let t0 = Instant::now();
        controller.observe(PointerSample::new(0.1, 0.1, t0));
        let t1 = t0 + Duration::from_secs(2);
        controller.observe(PointerSample::new(0.9, 0.9, t1));

        // The first deadline has passed, but the refreshed one has not.
        assert_eq!(
            controller.advance(t0 + Duration::from_millis(3300), FRAME),
            None
        );
        assert!(controller
            .advance(t1 + Duration::from_millis(3250), FRAME)
            .is_some());
    }

    #[test]
    fn disabled_autopilot_never_writes() {
        let mut config = settings();
        config.enabled = false;
        let mut controller = DriveController::new(&config).unwrap();
        assert_eq!(controller.advance(Instant::now(), FRAME), None);

        let now = Instant::now();
        let uniform = controller.observe(PointerSample::new(0.3, 0.4, now));
        assert_eq!(uniform, [0.3, 0.4]);
        assert_eq!(controller.advance(now + Duration::from_secs(60), FRAME), None);
    }

    #[test]
    fn orbit_follows_the_angular_formula() {
        let mut controller = DriveController::new(&settings()).unwrap();
        let now = Instant::now();
        let dt = Duration::from_millis(100);

        let mut angle = 0.0f32;
        for step in 1..=20 {
            let position = controller
                .advance(now + dt * step, dt)
                .expect("autopilot active");
            angle = (angle + dt.as_secs_f32() * BASE_ANGULAR_SPEED) % TAU;
            assert!((position[0] - (0.5 + 0.30 * angle.cos())).abs() < 1e-5);
            assert!((position[1] - (0.5 + 0.30 * angle.sin())).abs() < 1e-5);
        }
    }

    #[test]
    fn resume_continues_from_stored_phase() {
        let mut controller = DriveController::new(&settings()).unwrap();
        let t0 = Instant::now();
        controller.advance(t0, Duration::from_secs(1));
        let phase = controller.angle();
        assert!(phase > 0.0);

        controller.observe(PointerSample::new(0.5, 0.5, t0));
        let resumed = controller
            .advance(t0 + Duration::from_secs(4), FRAME)
            .expect("resumed");
        let expected = (phase + FRAME.as_secs_f32() * BASE_ANGULAR_SPEED) % TAU;
        assert!((controller.angle() - expected).abs() < 1e-6);
        assert!((resumed[0] - (0.5 + 0.30 * expected.cos())).abs() < 1e-5);
    }

    #[test]
    fn takeover_scenario_end_to_end() {
        // Mirrors the mount-with-autopilot scenario: takeover 250ms, resume
        // delay 3000ms, one sample at t=0 at (0.2, 0.8), nothing afterwards.
        let mut controller = DriveController::new(&settings()).unwrap();
        let t0 = Instant::now();

        let uniform = controller.observe(PointerSample::new(0.2, 0.8, t0));
        assert_eq!(uniform, [0.2, 0.8]);
        assert!(matches!(controller.state(), DriveState::UserDriven { .. }));

        let mut clock = t0;
        let dt = Duration::from_millis(50);
        let mut resumed_at = None;
        for _ in 0..80 {
            clock += dt;
            if controller.advance(clock, dt).is_some() {
                resumed_at = Some(clock);
                break;
            }
        }

        let resumed_at = resumed_at.expect("autopilot resumed");
        let idle = resumed_at.duration_since(t0);
        assert!(idle >= Duration::from_millis(3250));
        assert!(idle < Duration::from_millis(3300));

        // Thereafter every frame lands on the orbit.
        let position = controller.advance(resumed_at + dt, dt).expect("orbiting");
        let dx = position[0] - 0.5;
        let dy = position[1] - 0.5;
        assert!(((dx * dx + dy * dy).sqrt() - 0.30).abs() < 1e-5);
    }

    #[test]
    fn slot_keeps_only_the_latest_sample() {
        let mut slot = SampleSlot::new();
        assert!(slot.is_empty());
        let now = Instant::now();
        slot.offer(PointerSample::new(0.1, 0.1, now));
        slot.offer(PointerSample::new(0.9, 0.2, now));
        let sample = slot.take().expect("pending sample");
        assert_eq!(sample.as_uniform(), [0.9, 0.2]);
        assert!(slot.take().is_none());
    }

    #[test]
    fn physical_positions_normalize_with_y_flip() {
        let now = Instant::now();
        let top_left = PointerSample::from_physical((0.0, 0.0), (800, 600), now);
        assert_eq!(top_left.as_uniform(), [0.0, 1.0]);

        let center = PointerSample::from_physical((400.0, 300.0), (800, 600), now);
        assert_eq!(center.as_uniform(), [0.5, 0.5]);

        let outside = PointerSample::from_physical((1200.0, -50.0), (800, 600), now);
        assert_eq!(outside.as_uniform(), [1.0, 1.0]);
    }

    #[test]
    fn rejects_invalid_orbit_radius() {
        let mut config = settings();
        config.orbit_radius = 0.0;
        assert!(matches!(
            DriveController::new(&config),
            Err(DriveError::InvalidOrbitRadius(_))
        ));
    }
}
