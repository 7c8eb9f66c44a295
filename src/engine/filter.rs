//! Hysteresis and slew filter
//!
//! # Hysteresis
//!
//! The direction of travel is taken from the last two raw samples: a sample
//! strictly above the previous one is rising, anything else is falling. The
//! curve is looked up at `temp + band/2` while rising and `temp - band/2`
//! while falling, so a reversal drops the lookup by a whole band and the
//! duty holds until the temperature has crossed it. The first sample counts
//! as rising.
//!
//! # Slew
//!
//! A first-order low-pass toward the curve target with time constant `tau`:
//! `out += (target - out) * (1 - exp(-dt / tau))`. The blend depends only
//! on elapsed time, not on how often the filter runs.

use std::time::Duration;

use super::Curve;
use crate::data::FilterConfig;

/// Per-channel filter memory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    last_input: Option<f32>,
    falling: bool,
    last_output: Option<f32>,
    last_update: Option<Duration>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_output(&self) -> Option<f32> {
        self.last_output
    }

    pub fn is_rising(&self) -> bool {
        !self.falling
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Lookup temperature after the hysteresis shift
    fn shifted_input(&mut self, temp: f32, band: f32) -> f32 {
        if let Some(last) = self.last_input {
            self.falling = temp <= last;
        }
        self.last_input = Some(temp);

        let half = band.max(0.0) / 2.0;
        if self.falling {
            temp - half
        } else {
            temp + half
        }
    }

    /// Filtered duty for `temp` at monotonic time `now`, clamped to 0-100
    pub fn step(&mut self, curve: &Curve, temp: f32, now: Duration, params: &FilterConfig) -> f32 {
        let lookup = self.shifted_input(temp, params.hysteresis_c);
        let target = curve.evaluate(lookup).clamp(0.0, 100.0);

        let output = match (self.last_output, self.last_update) {
            (Some(previous), Some(last_update)) if params.tau_secs > 0.0 => {
                let dt = now.saturating_sub(last_update);
                if dt.is_zero() {
                    return previous;
                }
                let alpha = 1.0 - (-dt.as_secs_f32() / params.tau_secs).exp();
                previous + (target - previous) * alpha
            }
            _ => target,
        };

        let output = output.clamp(0.0, 100.0);
        self.last_output = Some(output);
        self.last_update = Some(now);
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Curve {
        Curve::from_pairs(&[(40.0, 20.0), (60.0, 80.0)]).unwrap()
    }

    fn params(hysteresis_c: f32, tau_secs: f32) -> FilterConfig {
        FilterConfig { hysteresis_c, tau_secs }
    }

    fn secs(s: f32) -> Duration {
        Duration::from_secs_f32(s)
    }

    #[test]
    fn test_no_filtering_is_curve() {
        let mut state = FilterState::new();
        assert!((state.step(&ramp(), 50.0, secs(0.0), &params(0.0, 0.0)) - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_lookup_shifts_toward_travel() {
        let mut state = FilterState::new();
        let p = params(4.0, 0.0);

        // 50 rising looks up 52: 20 + 12/20*60
        let rising = state.step(&ramp(), 50.0, secs(0.0), &p);
        assert!((rising - 56.0).abs() < 1e-4);
        // 49 falling looks up 47
        let falling = state.step(&ramp(), 49.0, secs(1.0), &p);
        assert!((falling - 41.0).abs() < 1e-4);
        assert!(!state.is_rising());
        assert!(falling < rising);
    }

    #[test]
    fn test_falling_temperature_never_raises_duty() {
        let mut state = FilterState::new();
        let p = params(4.0, 0.0);
        let mut previous = state.step(&ramp(), 58.0, secs(0.0), &p);
        for (i, temp) in [57.0, 55.5, 52.0, 49.0, 45.0].into_iter().enumerate() {
            let duty = state.step(&ramp(), temp, secs(i as f32 + 1.0), &p);
            assert!(duty <= previous, "{} gave {} after {}", temp, duty, previous);
            previous = duty;
        }
    }

    #[test]
    fn test_equal_sample_counts_as_falling() {
        let mut state = FilterState::new();
        let p = params(2.0, 0.0);
        state.step(&ramp(), 50.0, secs(0.0), &p);
        assert!(state.is_rising());
        state.step(&ramp(), 51.0, secs(1.0), &p);
        assert!(state.is_rising());
        state.step(&ramp(), 51.0, secs(2.0), &p);
        assert!(!state.is_rising());
    }

    #[test]
    fn test_rising_inside_band_never_decreases() {
        let mut state = FilterState::new();
        let p = params(2.0, 0.0);
        state.step(&ramp(), 48.0, secs(0.0), &p);
        let a = state.step(&ramp(), 49.5, secs(1.0), &p);
        let b = state.step(&ramp(), 50.5, secs(2.0), &p);
        assert!(b >= a);
    }

    #[test]
    fn test_slew_partial_then_converges() {
        let curve = Curve::from_pairs(&[(0.0, 0.0), (50.0, 0.0), (51.0, 100.0)]).unwrap();
        let mut state = FilterState::new();
        let p = params(0.0, 2.0);

        assert_eq!(state.step(&curve, 30.0, secs(0.0), &p), 0.0);
        let first = state.step(&curve, 80.0, secs(0.1), &p);
        assert!(first > 0.0 && first < 100.0);

        let mut t = 0.1;
        let mut out = first;
        while t < 30.0 {
            t += 0.5;
            out = state.step(&curve, 80.0, secs(t), &p);
        }
        assert!((out - 100.0).abs() < 1.0);
    }

    #[test]
    fn test_frame_rate_independent() {
        let p = params(0.0, 2.0);
        let curve = Curve::from_pairs(&[(0.0, 0.0), (50.0, 0.0), (51.0, 100.0)]).unwrap();

        let mut coarse = FilterState::new();
        coarse.step(&curve, 30.0, secs(0.0), &p);
        let coarse_out = coarse.step(&curve, 80.0, secs(2.0), &p);

        let mut fine = FilterState::new();
        fine.step(&curve, 30.0, secs(0.0), &p);
        let mut fine_out = 0.0;
        for i in 1..=20 {
            fine_out = fine.step(&curve, 80.0, secs(i as f32 * 0.1), &p);
        }
        assert!((coarse_out - fine_out).abs() < 0.1);
    }

    #[test]
    fn test_non_positive_dt_is_noop() {
        let mut state = FilterState::new();
        let p = params(0.0, 2.0);
        let first = state.step(&ramp(), 45.0, secs(5.0), &p);

        assert_eq!(state.step(&ramp(), 60.0, secs(5.0), &p), first);
        assert_eq!(state.step(&ramp(), 60.0, secs(4.0), &p), first);
    }

    #[test]
    fn test_reset_clears_memory() {
        let mut state = FilterState::new();
        state.step(&ramp(), 45.0, secs(1.0), &params(1.0, 2.0));
        state.reset();
        assert_eq!(state, FilterState::new());
    }
}
