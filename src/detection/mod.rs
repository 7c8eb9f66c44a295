//! Active detection: coupling inference and fan calibration
//!
//! Both sweeps are long-running and blocking. They process outputs one at
//! a time in enumeration order, hold the output's lock for the whole
//! experiment and restore its state before moving on. Every settle/hold
//! wait is cancellable through a shared [`CancelToken`].

mod calibration;
mod coupling;
mod heuristic;

pub use calibration::{calibrate, calibrate_all, Calibration, CalibrationReport};
pub use coupling::{detect_and_couple, infer_coupling, CouplingReport};
pub use heuristic::{fill_missing, heuristic_coupling, heuristic_record, pick_sensor};

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::constants::timing;
use crate::data::{OutputId, OutputOutcome, SensorId};
use crate::hw::Clock;

/// Cooperative cancellation flag shared between a sweep and its host
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Re-arm the token for the next sweep
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Step of a sweep, reported while it runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepPhase {
    Probe,
    TachCheck,
    Baseline,
    Boost,
    SpinUp,
    MinStable,
}

/// Progress event from a coupling or calibration sweep
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SweepEvent {
    OutputStarted {
        output: OutputId,
        position: usize,
        total: usize,
    },
    Phase {
        output: OutputId,
        phase: SweepPhase,
    },
    /// A calibration step finished settling
    Step {
        output: OutputId,
        duty_percent: u32,
        rpm: Option<u32>,
    },
    Scored {
        output: OutputId,
        sensor: SensorId,
        delta_c: f32,
    },
    Restored {
        output: OutputId,
    },
    OutputFinished {
        output: OutputId,
        outcome: OutputOutcome,
    },
}

/// Sleep for `duration` in short slices, checking `cancel` before and after each
///
/// Returns `false` if the wait was cut short by cancellation.
pub fn wait_cancellable(clock: &dyn Clock, duration: Duration, cancel: &CancelToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    let mut remaining = duration;
    while !remaining.is_zero() {
        let slice = remaining.min(timing::CANCEL_POLL);
        clock.sleep(slice);
        remaining -= slice;
        if cancel.is_cancelled() {
            return false;
        }
    }
    true
}
