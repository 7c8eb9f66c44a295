//! Safety/write layer
//!
//! The only place that writes duty or enable mode. Every commanded duty is
//! clamped to `[max(floor, min), max]`; an "unsupported" write failure
//! permanently downgrades the output to read-only, after which writes to it
//! are skipped silently. Permission failures are returned but do not
//! downgrade.
//!
//! Outputs are shared as [`SharedOutput`]. Whoever holds the lock owns the
//! hardware for that output: sweeps hold it for a whole experiment, the
//! control loop only `try_lock`s.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::HwmonIo;
use crate::constants::pwm::enable;
use crate::data::PwmOutput;
use crate::error::{LfcError, Result};

/// A PWM output with a single owner at a time
pub type SharedOutput = Arc<Mutex<PwmOutput>>;

pub fn share_outputs(outputs: Vec<PwmOutput>) -> Vec<SharedOutput> {
    outputs.into_iter().map(|o| Arc::new(Mutex::new(o))).collect()
}

/// Raw duty and enable mode captured before an experiment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub raw: Option<u32>,
    pub enable: Option<String>,
}

pub fn snapshot(io: &dyn HwmonIo, output: &PwmOutput) -> Snapshot {
    let raw = io.read_pwm_raw(&output.pwm_path).ok();
    let enable = output.enable_path.as_ref().and_then(|p| io.read_enable(p));
    trace!(output = %output.id, raw = ?raw, enable = ?enable, "Snapshot taken");
    Snapshot { raw, enable }
}

/// Put back the captured duty, then the captured enable mode
///
/// Both steps are attempted; the first failure is returned.
pub fn restore(io: &dyn HwmonIo, output: &mut PwmOutput, snap: &Snapshot) -> Result<()> {
    let mut first_err = None;

    if let Some(raw) = snap.raw {
        if output.is_writable() {
            match write_raw(io, output, raw) {
                Ok(()) => output.last_duty = Some(output.percent_from_raw(raw)),
                Err(e) => first_err = Some(e),
            }
        }
    }

    if let (Some(path), Some(mode)) = (&output.enable_path, &snap.enable) {
        if let Err(e) = io.write_enable(path, mode) {
            warn!(output = %output.id, error = %e, "Failed to restore enable mode");
            first_err.get_or_insert(e);
        }
    }

    debug!(output = %output.id, "Restored pre-experiment state");
    first_err.map_or(Ok(()), Err)
}

/// Switch to manual mode if the output has an enable file and is not already manual
///
/// Returns the previous mode when it was changed.
fn force_manual(io: &dyn HwmonIo, output: &PwmOutput) -> Option<String> {
    let path = output.enable_path.as_ref()?;
    let previous = io.read_enable(path);
    if previous.as_deref() == Some(enable::MANUAL) {
        return None;
    }
    if let Err(e) = io.write_enable(path, enable::MANUAL) {
        debug!(output = %output.id, error = %e, "Could not force manual mode");
        return None;
    }
    previous
}

fn write_raw(io: &dyn HwmonIo, output: &mut PwmOutput, raw: u32) -> Result<()> {
    io.write_pwm_raw(&output.pwm_path, raw).map_err(|e| {
        if e.is_unsupported() {
            warn!(output = %output.id, "PWM write not supported, marking read-only");
            output.mark_read_only();
        }
        e
    })
}

/// Clamp a requested duty to what this output may be driven at
pub fn clamp_duty(output: &PwmOutput, percent: f32, floor: f32) -> f32 {
    let lo = floor.max(output.min_percent).clamp(0.0, 100.0);
    let hi = output.max_percent.max(lo);
    percent.max(lo).min(hi)
}

/// Command a duty through the floor/ceiling clamp
///
/// Returns the duty actually written, or `None` when the output is
/// read-only and the write was skipped.
pub fn command_duty(
    io: &dyn HwmonIo,
    output: &mut PwmOutput,
    percent: f32,
    floor: f32,
) -> Result<Option<f32>> {
    if !output.is_writable() {
        trace!(output = %output.id, "Skipping write to read-only output");
        return Ok(None);
    }

    let duty = clamp_duty(output, percent, floor);
    force_manual(io, output);
    let raw = output.raw_from_percent(duty);
    write_raw(io, output, raw)?;
    output.last_duty = Some(duty);
    trace!(output = %output.id, duty, raw, "Duty written");
    Ok(Some(duty))
}

/// Check that the driver accepts duty writes on this output
///
/// Forces manual mode, writes the current duty back to itself and restores
/// the enable mode. An unsupported write marks the output read-only.
pub fn probe_writable(io: &dyn HwmonIo, output: &mut PwmOutput) -> Result<()> {
    if !output.is_writable() {
        return Err(LfcError::ReadOnly(output.id.to_string()));
    }

    let current = io.read_pwm_raw(&output.pwm_path)?;
    let previous_mode = force_manual(io, output);
    let result = write_raw(io, output, current);

    if let (Some(path), Some(mode)) = (&output.enable_path, previous_mode) {
        if let Err(e) = io.write_enable(path, &mode) {
            debug!(output = %output.id, error = %e, "Could not restore enable mode after probe");
        }
    }
    result
}
