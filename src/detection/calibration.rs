//! Fan calibration
//!
//! Two phases, both floor-respecting:
//! 1. **Spin-up**: step duty up from `max(start, floor)` until the tach
//!    reads at least the threshold.
//! 2. **Min-stable**: step back down from spin-up while the tach stays at
//!    or above the threshold, stopping at the first miss or at the floor.
//!
//! A single `calibrate` call leaves the output at its minimum stable duty.
//! `calibrate_all` snapshots and restores every output around its sweep.

use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::{wait_cancellable, CancelToken, SweepEvent, SweepPhase};
use crate::data::{CalibrationConfig, CalibrationResult, OutputId, OutputOutcome, PwmOutput};
use crate::error::{LfcError, Result};
use crate::hw::{command_duty, restore, snapshot, Clock, HwmonIo, SharedOutput};

/// Outcome of a single calibration call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calibration {
    Complete(CalibrationResult),
    /// Cancelled; the output holds whatever duty it last had
    Aborted,
}

/// Result of a batch calibration
#[derive(Debug, Clone, Default)]
pub struct CalibrationReport {
    pub results: BTreeMap<OutputId, CalibrationResult>,
    pub outcomes: BTreeMap<OutputId, OutputOutcome>,
    pub cancelled: bool,
}

/// Set a duty, settle and read the tach. `None` when cancelled.
fn step(
    io: &dyn HwmonIo,
    clock: &dyn Clock,
    output: &mut PwmOutput,
    duty: u32,
    config: &CalibrationConfig,
    cancel: &CancelToken,
    on_event: &mut dyn FnMut(&SweepEvent),
) -> Result<Option<Option<u32>>> {
    if cancel.is_cancelled() {
        return Ok(None);
    }
    if command_duty(io, output, duty as f32, config.floor_percent as f32)?.is_none() {
        return Err(LfcError::ReadOnly(output.id.to_string()));
    }
    if !wait_cancellable(clock, config.settle(), cancel) {
        return Ok(None);
    }
    let rpm = output.tach_path.as_ref().and_then(|p| io.read_rpm(p));
    debug!(output = %output.id, duty, rpm = ?rpm, "Calibration step");
    on_event(&SweepEvent::Step {
        output: output.id.clone(),
        duty_percent: duty,
        rpm,
    });
    Ok(Some(rpm))
}

/// Find spin-up and minimum stable duty for one output
///
/// Fails with `NoSpinDetected` when no step reaches the RPM threshold,
/// including when the output has no tachometer.
pub fn calibrate(
    io: &dyn HwmonIo,
    clock: &dyn Clock,
    output: &mut PwmOutput,
    config: &CalibrationConfig,
    cancel: &CancelToken,
    on_event: &mut dyn FnMut(&SweepEvent),
) -> Result<Calibration> {
    if !output.is_writable() {
        return Err(LfcError::ReadOnly(output.id.to_string()));
    }
    if output.tach_path.is_none() {
        return Err(LfcError::NoSpinDetected { output: output.id.to_string() });
    }
    let spins = |rpm: Option<u32>| rpm.is_some_and(|r| r >= config.rpm_threshold);
    let floor = config.floor_percent;
    let step_size = config.step_percent.max(1);

    on_event(&SweepEvent::Phase { output: output.id.clone(), phase: SweepPhase::SpinUp });
    let mut spinup = None;
    let mut duty = config.sweep_start();
    while duty <= config.end_percent {
        match step(io, clock, output, duty, config, cancel, on_event)? {
            None => return Ok(Calibration::Aborted),
            Some(rpm) if spins(rpm) => {
                spinup = Some((duty, rpm.unwrap_or(0)));
                break;
            }
            Some(_) => duty += step_size,
        }
    }
    let Some((spinup_percent, spinup_rpm)) = spinup else {
        warn!(output = %output.id, "No spin detected during calibration");
        return Err(LfcError::NoSpinDetected { output: output.id.to_string() });
    };

    on_event(&SweepEvent::Phase { output: output.id.clone(), phase: SweepPhase::MinStable });
    let mut min_stable = spinup_percent;
    let mut rpm_at_min = spinup_rpm;
    loop {
        let next = min_stable.saturating_sub(step_size).max(floor);
        if next >= min_stable {
            break;
        }
        match step(io, clock, output, next, config, cancel, on_event)? {
            None => return Ok(Calibration::Aborted),
            Some(rpm) if spins(rpm) => {
                min_stable = next;
                rpm_at_min = rpm.unwrap_or(0);
            }
            Some(_) => break,
        }
    }

    if output.last_duty != Some(min_stable as f32) {
        command_duty(io, output, min_stable as f32, floor as f32)?;
    }

    let result = CalibrationResult {
        spinup_percent,
        min_stable_percent: min_stable,
        rpm_at_min,
    };
    info!(
        output = %output.id,
        spinup = result.spinup_percent,
        min_stable = result.min_stable_percent,
        rpm = result.rpm_at_min,
        "Calibration complete"
    );
    Ok(Calibration::Complete(result))
}

/// Calibrate outputs one at a time, restoring each afterwards
///
/// Stops after the first cancelled output; that output is restored and the
/// rest are marked aborted without being touched.
pub fn calibrate_all(
    io: &dyn HwmonIo,
    clock: &dyn Clock,
    outputs: &[SharedOutput],
    config: &CalibrationConfig,
    cancel: &CancelToken,
    on_event: &mut dyn FnMut(&SweepEvent),
) -> CalibrationReport {
    let mut report = CalibrationReport::default();
    let total = outputs.len();
    info!(outputs = total, "Starting batch calibration");

    for (position, shared) in outputs.iter().enumerate() {
        let mut guard = shared.lock();
        let output = &mut *guard;
        let id = output.id.clone();

        if report.cancelled || cancel.is_cancelled() {
            report.cancelled = true;
            report.outcomes.insert(id, OutputOutcome::Aborted);
            continue;
        }
        if !output.is_writable() {
            report.outcomes.insert(id, OutputOutcome::skipped("read-only"));
            continue;
        }
        if output.tach_path.is_none() {
            report.outcomes.insert(id, OutputOutcome::skipped("no tachometer"));
            continue;
        }

        on_event(&SweepEvent::OutputStarted { output: id.clone(), position, total });
        let snap = snapshot(io, output);
        let result = calibrate(io, clock, output, config, cancel, on_event);
        let restored = restore(io, output, &snap);
        on_event(&SweepEvent::Restored { output: id.clone() });

        let outcome = match result {
            Ok(Calibration::Complete(res)) => {
                report.results.insert(id.clone(), res);
                OutputOutcome::Ok
            }
            Ok(Calibration::Aborted) => {
                report.cancelled = true;
                OutputOutcome::Aborted
            }
            Err(e) => OutputOutcome::error(e.to_string()),
        };
        let outcome = match restored {
            Err(e) if outcome.is_ok() => OutputOutcome::error(format!("restore failed: {}", e)),
            _ => outcome,
        };

        on_event(&SweepEvent::OutputFinished { output: id.clone(), outcome: outcome.clone() });
        report.outcomes.insert(id, outcome);
    }

    info!(
        calibrated = report.results.len(),
        cancelled = report.cancelled,
        "Batch calibration finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::{share_outputs, FakeClock, FakeHwmon, TachModel, WriteRecord};
    use std::path::{Path, PathBuf};

    fn rig(tach: TachModel) -> (FakeHwmon, PwmOutput) {
        let hw = FakeHwmon::new();
        hw.add_pwm_with_max("/pwm1", 60, 100);
        hw.add_enable("/pwm1_enable", "2");
        hw.add_tach("/fan1", tach);
        let out = PwmOutput::new(OutputId::new("hwmon0", 1), "nct6798", "/pwm1")
            .with_enable("/pwm1_enable")
            .with_tach("/fan1")
            .with_raw_max(100);
        (hw, out)
    }

    fn threshold(spin: f32) -> TachModel {
        TachModel::Threshold {
            pwm: PathBuf::from("/pwm1"),
            spin_percent: spin,
            rpm_per_percent: 20.0,
        }
    }

    #[test]
    fn test_finds_spinup() {
        let (hw, mut out) = rig(threshold(25.0));
        let result = calibrate(
            &hw,
            &FakeClock::new(),
            &mut out,
            &CalibrationConfig::default(),
            &CancelToken::new(),
            &mut |_| {},
        )
        .unwrap();

        let Calibration::Complete(res) = result else {
            panic!("calibration aborted");
        };
        assert_eq!(res.spinup_percent, 25);
        assert_eq!(res.min_stable_percent, 25);
        assert_eq!(res.rpm_at_min, 500);
        assert_eq!(hw.pwm_raw(Path::new("/pwm1")), Some(25));
    }

    #[test]
    fn test_min_stable_below_spinup() {
        let (hw, mut out) = rig(TachModel::Hysteretic {
            pwm: PathBuf::from("/pwm1"),
            spin_percent: 45.0,
            stall_percent: 30.0,
            rpm_per_percent: 10.0,
        });
        let result = calibrate(
            &hw,
            &FakeClock::new(),
            &mut out,
            &CalibrationConfig::default(),
            &CancelToken::new(),
            &mut |_| {},
        )
        .unwrap();

        assert_eq!(
            result,
            Calibration::Complete(CalibrationResult {
                spinup_percent: 45,
                min_stable_percent: 30,
                rpm_at_min: 300,
            })
        );
        assert_eq!(hw.pwm_raw(Path::new("/pwm1")), Some(30));
    }

    #[test]
    fn test_min_stable_stops_at_floor() {
        let (hw, mut out) = rig(threshold(0.0));
        let config = CalibrationConfig { floor_percent: 30, ..Default::default() };
        let result = calibrate(&hw, &FakeClock::new(), &mut out, &config, &CancelToken::new(), &mut |_| {})
            .unwrap();

        let Calibration::Complete(res) = result else {
            panic!("calibration aborted");
        };
        assert_eq!(res.spinup_percent, 30);
        assert_eq!(res.min_stable_percent, 30);
        assert!(hw.pwm_writes(Path::new("/pwm1")).iter().all(|raw| *raw >= 30));
    }

    #[test]
    fn test_no_spin() {
        let (hw, mut out) = rig(TachModel::Constant(0));
        let err = calibrate(
            &hw,
            &FakeClock::new(),
            &mut out,
            &CalibrationConfig::default(),
            &CancelToken::new(),
            &mut |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, LfcError::NoSpinDetected { .. }));
    }

    #[test]
    fn test_missing_tach_is_no_spin() {
        let hw = FakeHwmon::new();
        hw.add_pwm("/pwm1", 60);
        let mut out = PwmOutput::new(OutputId::new("hwmon0", 1), "nct6798", "/pwm1");
        let err = calibrate(
            &hw,
            &FakeClock::new(),
            &mut out,
            &CalibrationConfig::default(),
            &CancelToken::new(),
            &mut |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, LfcError::NoSpinDetected { .. }));
        assert!(hw.writes().is_empty());
    }

    #[test]
    fn test_cancel_mid_sweep() {
        let (hw, mut out) = rig(threshold(60.0));
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let mut steps = 0;
        let result = calibrate(
            &hw,
            &FakeClock::new(),
            &mut out,
            &CalibrationConfig::default(),
            &cancel,
            &mut |event| {
                if matches!(event, SweepEvent::Step { .. }) {
                    steps += 1;
                    if steps == 2 {
                        trigger.cancel();
                    }
                }
            },
        )
        .unwrap();

        assert_eq!(result, Calibration::Aborted);
        assert_eq!(hw.pwm_writes(Path::new("/pwm1")), vec![20, 25]);
    }

    #[test]
    fn test_batch_restores_each_output() {
        let (hw, out) = rig(threshold(25.0));
        hw.add_pwm("/pwm2", 200);
        let no_tach = PwmOutput::new(OutputId::new("hwmon0", 2), "nct6798", "/pwm2");
        let outputs = share_outputs(vec![out, no_tach]);

        let report = calibrate_all(
            &hw,
            &FakeClock::new(),
            &outputs,
            &CalibrationConfig::default(),
            &CancelToken::new(),
            &mut |_| {},
        );

        assert!(!report.cancelled);
        assert_eq!(report.results.get(&OutputId::new("hwmon0", 1)).map(|r| r.spinup_percent), Some(25));
        assert_eq!(
            report.outcomes.get(&OutputId::new("hwmon0", 2)),
            Some(&OutputOutcome::skipped("no tachometer"))
        );
        assert_eq!(hw.pwm_raw(Path::new("/pwm1")), Some(60));
        assert_eq!(hw.enable_mode(Path::new("/pwm1_enable")).as_deref(), Some("2"));
        assert_eq!(
            hw.writes().last(),
            Some(&WriteRecord::Enable { path: PathBuf::from("/pwm1_enable"), mode: "2".into() })
        );
    }
}
