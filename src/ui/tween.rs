//! Interruptible numeric transitions for animated counters.

use std::time::{Duration, Instant};

/// `1 - (1 - t)^4`, clamped to `[0, 1]`.
pub fn ease_out_quart(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(4)
}

/// Animates a displayed value toward a target, one sample per frame.
///
/// Retargeting mid-flight starts the new leg from the last sampled frame, so
/// the displayed value never jumps.
#[derive(Debug, Clone)]
pub struct NumericTween {
    from: f64,
    to: f64,
    started: Option<Instant>,
    duration: Duration,
    displayed: f64,
}

impl NumericTween {
    pub fn new(initial: f64, duration: Duration) -> Self {
        Self {
            from: initial,
            to: initial,
            started: None,
            duration,
            displayed: initial,
        }
    }

    /// Value shown by the last sampled frame.
    pub fn displayed(&self) -> f64 {
        self.displayed
    }

    pub fn is_animating(&self) -> bool {
        self.started.is_some()
    }

    pub fn set_target(&mut self, target: f64, now: Instant) {
        if target == self.to {
            return;
        }
        self.from = self.displayed;
        self.to = target;
        self.started = Some(now);
    }

    /// Advance to `now` and return the value to draw.
    pub fn sample(&mut self, now: Instant) -> f64 {
        let Some(started) = self.started else {
            return self.displayed;
        };
        let t = if self.duration.is_zero() {
            1.0
        } else {
            now.saturating_duration_since(started).as_secs_f64() / self.duration.as_secs_f64()
        };
        if t >= 1.0 {
            self.started = None;
            self.displayed = self.to;
        } else {
            self.displayed = self.from + (self.to - self.from) * ease_out_quart(t);
        }
        self.displayed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn easing_endpoints() {
        assert_eq!(ease_out_quart(0.0), 0.0);
        assert_eq!(ease_out_quart(1.0), 1.0);
        assert!(ease_out_quart(0.5) > 0.5);
    }

    #[test]
    fn reaches_target_after_duration() {
        let t0 = Instant::now();
        let mut tween = NumericTween::new(0.0, MS * 800);
        tween.set_target(100.0, t0);
        assert_eq!(tween.sample(t0), 0.0);
        let mid = tween.sample(t0 + MS * 400);
        assert!(mid > 50.0 && mid < 100.0);
        assert_eq!(tween.sample(t0 + MS * 800), 100.0);
        assert!(!tween.is_animating());
    }

    #[test]
    fn retarget_starts_from_last_frame() {
        let t0 = Instant::now();
        let mut tween = NumericTween::new(0.0, MS * 800);
        tween.set_target(100.0, t0);
        let before = tween.sample(t0 + MS * 200);
        tween.set_target(40.0, t0 + MS * 200);
        let at_retarget = tween.sample(t0 + MS * 200);
        assert_eq!(before, at_retarget);

        let mut last = at_retarget;
        for step in 1..=60 {
            let value = tween.sample(t0 + MS * (200 + step * 20));
            assert!(value <= 100.0);
            assert!((value - last).abs() <= (before - 40.0).abs());
            last = value;
        }
        assert_eq!(last, 40.0);
    }

    #[test]
    fn zero_duration_snaps() {
        let t0 = Instant::now();
        let mut tween = NumericTween::new(5.0, Duration::ZERO);
        tween.set_target(9.0, t0);
        assert_eq!(tween.sample(t0), 9.0);
    }

    #[test]
    fn same_target_does_not_restart() {
        let t0 = Instant::now();
        let mut tween = NumericTween::new(0.0, MS * 100);
        tween.set_target(10.0, t0);
        tween.sample(t0 + MS * 50);
        tween.set_target(10.0, t0 + MS * 50);
        assert_eq!(tween.sample(t0 + MS * 100), 10.0);
    }
}
