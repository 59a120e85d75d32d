use std::time::Instant;

/// Floor for the per-frame delta. The smoothing blend divides by delta, so
/// zero-length frames (first frame, stalled clock) are clamped up to this.
pub const MIN_FRAME_DELTA: f32 = 1e-4;

const RATE_GAIN: f32 = 0.4;
const RATE_FEEDBACK: f32 = 1.6;

/// Per-frame timing: delta since the previous tick, total elapsed time, and
/// a smoothed frame-rate estimate blended as `(0.4/delta + 1.6*rate) / 2`.
/// For a steady delta the blend settles at `1/delta`.
pub struct FrameClock {
    previous: Instant,
    pub delta: f32,
    pub elapsed: f32,
    pub rate: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            previous: Instant::now(),
            delta: MIN_FRAME_DELTA,
            elapsed: 0.0,
            rate: 0.0,
        }
    }

    /// Advance from the wall clock. Called once per loop iteration.
    pub fn tick(&mut self) {
        let now = Instant::now();
        let raw = (now - self.previous).as_secs_f32();
        self.previous = now;
        self.advance(raw);
    }

    /// Advance by an explicit delta (tick uses this; tests drive it directly).
    pub fn advance(&mut self, raw_delta: f32) {
        self.delta = raw_delta.max(MIN_FRAME_DELTA);
        self.elapsed += self.delta;
        self.rate = (RATE_GAIN / self.delta + RATE_FEEDBACK * self.rate) / 2.0;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_converges_to_inverse_delta() {
        let mut clock = FrameClock::new();
        let delta = 1.0 / 60.0;
        for _ in 0..200 {
            clock.advance(delta);
        }
        // Fixed point of r = (0.4/d + 1.6r)/2 is r = 1/d
        let expected = 1.0 / delta;
        assert!(
            (clock.rate - expected).abs() < 0.01,
            "rate {} should settle at {}",
            clock.rate,
            expected
        );
    }

    #[test]
    fn test_zero_delta_is_clamped() {
        let mut clock = FrameClock::new();
        clock.advance(0.0);
        assert_eq!(clock.delta, MIN_FRAME_DELTA);
        assert!(clock.rate.is_finite(), "blend must not divide by zero");

        clock.advance(-0.5);
        assert_eq!(clock.delta, MIN_FRAME_DELTA, "negative deltas clamp too");
        assert!(clock.rate.is_finite());
    }

    #[test]
    fn test_elapsed_accumulates() {
        let mut clock = FrameClock::new();
        clock.advance(0.1);
        clock.advance(0.2);
        clock.advance(0.3);
        assert!((clock.elapsed - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_rate_tracks_changing_delta() {
        let mut clock = FrameClock::new();
        for _ in 0..200 {
            clock.advance(1.0 / 30.0);
        }
        let slow = clock.rate;
        for _ in 0..200 {
            clock.advance(1.0 / 120.0);
        }
        let fast = clock.rate;
        assert!(
            fast > slow * 3.0,
            "rate should follow the frame cadence: slow={slow} fast={fast}"
        );
    }
}
