//! Active coupling inference
//!
//! For each output: probe writability, snapshot, optionally fast-reject via
//! the tachometer, record a baseline temperature vector, boost, record again,
//! restore, and pick the sensor with the largest absolute change.

use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::heuristic::fill_missing;
use super::{wait_cancellable, CancelToken, SweepEvent, SweepPhase};
use crate::constants::coupling::UNKNOWN_DUTY_PERCENT;
use crate::data::{
    CouplingConfig, CouplingEvidence, CouplingRecord, CouplingTable, OutputId, OutputOutcome, PwmOutput,
    TemperaturePoint,
};
use crate::error::{LfcError, Result};
use crate::hw::{command_duty, probe_writable, restore, snapshot, Clock, HwmonIo, SharedOutput};

/// Result of a coupling sweep
#[derive(Debug, Clone, Default)]
pub struct CouplingReport {
    pub records: CouplingTable,
    pub outcomes: BTreeMap<OutputId, OutputOutcome>,
    /// The sweep stopped early on request
    pub cancelled: bool,
}

/// What one output's experiment concluded
enum Experiment {
    Coupled(CouplingRecord),
    Skipped(String),
    Aborted,
}

/// Everything one experiment needs besides the output itself
struct Sweep<'a> {
    io: &'a dyn HwmonIo,
    clock: &'a dyn Clock,
    temps: &'a [TemperaturePoint],
    config: &'a CouplingConfig,
    cancel: &'a CancelToken,
}

impl Sweep<'_> {
    fn read_all(&self) -> Vec<Option<f32>> {
        self.temps.iter().map(|t| self.io.read_temperature(&t.path)).collect()
    }

    fn set_duty(&self, output: &mut PwmOutput, percent: f32) -> Result<()> {
        match command_duty(self.io, output, percent, self.config.floor_percent)? {
            Some(_) => Ok(()),
            None => Err(LfcError::ReadOnly(output.id.to_string())),
        }
    }

    /// Boost and compare RPM; `false` means the fan did not react
    fn tach_responds(&self, output: &mut PwmOutput) -> Result<Option<bool>> {
        let Some(tach) = output.tach_path.clone() else {
            return Ok(Some(true));
        };
        let before = self.io.read_rpm(&tach);
        self.set_duty(output, self.config.boost_percent())?;
        if !wait_cancellable(self.clock, self.config.hold(), self.cancel) {
            return Ok(None);
        }
        let after = self.io.read_rpm(&tach);
        debug!(output = %output.id, before = ?before, after = ?after, "Tach check");

        Ok(Some(match (before, after) {
            (Some(b), Some(a)) => a.abs_diff(b) >= self.config.tach_delta_rpm,
            _ => true,
        }))
    }

    fn perturb(
        &self,
        output: &mut PwmOutput,
        previous_percent: Option<f32>,
        on_event: &mut dyn FnMut(&SweepEvent),
    ) -> Result<Experiment> {
        let id = output.id.clone();

        if output.tach_path.is_some() {
            on_event(&SweepEvent::Phase { output: id.clone(), phase: SweepPhase::TachCheck });
            match self.tach_responds(output)? {
                None => return Ok(Experiment::Aborted),
                Some(false) => return Ok(Experiment::Skipped("fan did not respond to boost".into())),
                Some(true) => {}
            }
        }

        on_event(&SweepEvent::Phase { output: id.clone(), phase: SweepPhase::Baseline });
        let baseline_duty = self
            .config
            .floor_percent
            .max(previous_percent.unwrap_or(UNKNOWN_DUTY_PERCENT));
        self.set_duty(output, baseline_duty)?;
        if !wait_cancellable(self.clock, self.config.settle(), self.cancel) {
            return Ok(Experiment::Aborted);
        }
        let baseline = self.read_all();

        on_event(&SweepEvent::Phase { output: id.clone(), phase: SweepPhase::Boost });
        self.set_duty(output, self.config.boost_percent())?;
        if !wait_cancellable(self.clock, self.config.hold(), self.cancel) {
            return Ok(Experiment::Aborted);
        }
        let boosted = self.read_all();

        Ok(self.score(&id, &baseline, &boosted))
    }

    fn score(&self, output: &OutputId, baseline: &[Option<f32>], boosted: &[Option<f32>]) -> Experiment {
        let mut best: Option<(&TemperaturePoint, f32)> = None;
        for ((point, before), after) in self.temps.iter().zip(baseline).zip(boosted) {
            let (Some(before), Some(after)) = (before, after) else {
                continue;
            };
            let delta = (after - before).abs();
            if delta > best.map_or(0.0, |(_, d)| d) {
                best = Some((point, delta));
            }
        }

        match best {
            Some((point, delta_c)) => Experiment::Coupled(CouplingRecord {
                output: output.clone(),
                sensor: point.id.clone(),
                sensor_label: point.label.clone(),
                evidence: CouplingEvidence::Measured { delta_c },
            }),
            None => Experiment::Skipped("no sensor responded".into()),
        }
    }
}

/// Perturb each output in turn and record the sensor it affects most
///
/// Per-output failures end up in `outcomes`; cancellation restores the
/// current output, marks it and every later output aborted, and returns.
pub fn infer_coupling(
    io: &dyn HwmonIo,
    clock: &dyn Clock,
    outputs: &[SharedOutput],
    temps: &[TemperaturePoint],
    config: &CouplingConfig,
    cancel: &CancelToken,
    on_event: &mut dyn FnMut(&SweepEvent),
) -> CouplingReport {
    let sweep = Sweep { io, clock, temps, config, cancel };
    let mut report = CouplingReport::default();
    let total = outputs.len();

    info!(outputs = total, temps = temps.len(), "Starting coupling inference");

    for (position, shared) in outputs.iter().enumerate() {
        let mut guard = shared.lock();
        let output = &mut *guard;
        let id = output.id.clone();

        if report.cancelled || cancel.is_cancelled() {
            report.cancelled = true;
            report.outcomes.insert(id, OutputOutcome::Aborted);
            continue;
        }

        on_event(&SweepEvent::OutputStarted { output: id.clone(), position, total });
        on_event(&SweepEvent::Phase { output: id.clone(), phase: SweepPhase::Probe });

        let outcome = match probe_writable(io, output) {
            Err(e) if e.is_unsupported() || matches!(e, LfcError::ReadOnly(_)) => {
                OutputOutcome::skipped("read-only")
            }
            Err(e) => OutputOutcome::error(e.to_string()),
            Ok(()) => {
                let snap = snapshot(io, output);
                let previous = snap.raw.map(|raw| output.percent_from_raw(raw));
                let result = sweep.perturb(output, previous, on_event);

                let restored = restore(io, output, &snap);
                on_event(&SweepEvent::Restored { output: id.clone() });

                let outcome = match result {
                    Ok(Experiment::Coupled(record)) => {
                        info!(
                            output = %id,
                            sensor = %record.sensor,
                            delta = record.evidence.confidence().unwrap_or(0.0),
                            "Coupling found"
                        );
                        on_event(&SweepEvent::Scored {
                            output: id.clone(),
                            sensor: record.sensor.clone(),
                            delta_c: record.evidence.confidence().unwrap_or(0.0),
                        });
                        report.records.insert(record);
                        OutputOutcome::Ok
                    }
                    Ok(Experiment::Skipped(reason)) => {
                        debug!(output = %id, reason = %reason, "No coupling");
                        OutputOutcome::skipped(reason)
                    }
                    Ok(Experiment::Aborted) => {
                        info!(output = %id, "Coupling inference cancelled");
                        report.cancelled = true;
                        OutputOutcome::Aborted
                    }
                    Err(e) => {
                        warn!(output = %id, error = %e, "Coupling experiment failed");
                        OutputOutcome::error(e.to_string())
                    }
                };

                match restored {
                    Err(e) if !report.cancelled => OutputOutcome::error(format!("restore failed: {}", e)),
                    _ => outcome,
                }
            }
        };

        on_event(&SweepEvent::OutputFinished { output: id.clone(), outcome: outcome.clone() });
        report.outcomes.insert(id, outcome);
    }

    info!(
        records = report.records.len(),
        cancelled = report.cancelled,
        "Coupling inference finished"
    );
    report
}

/// Active inference, then heuristic records for every output still uncovered
pub fn detect_and_couple(
    io: &dyn HwmonIo,
    clock: &dyn Clock,
    outputs: &[SharedOutput],
    temps: &[TemperaturePoint],
    config: &CouplingConfig,
    cancel: &CancelToken,
    on_event: &mut dyn FnMut(&SweepEvent),
) -> CouplingReport {
    let mut report = infer_coupling(io, clock, outputs, temps, config, cancel, on_event);
    let ids: Vec<OutputId> = outputs.iter().map(|o| o.lock().id.clone()).collect();
    let added = fill_missing(&mut report.records, &ids, temps);
    debug!(added, "Filled uncovered outputs heuristically");
    report
}
