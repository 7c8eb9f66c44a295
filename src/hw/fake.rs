//! In-memory hwmon for deterministic sweeps
//!
//! Temperatures follow a linear thermal model: each sensor has a base
//! value and a coefficient per PWM path, and reads as
//! `base + Σ k · (100 − duty%)`. Tachometers either spin above a duty
//! threshold or report a constant. Every successful write is logged.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use super::HwmonIo;
use crate::constants::pwm;
use crate::error::{LfcError, Result};

/// Failure to inject on writes to a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteFailure {
    Unsupported,
    Permission,
    Io,
}

/// Tachometer behaviour
#[derive(Debug, Clone, PartialEq)]
pub enum TachModel {
    /// Zero below `spin_percent`, otherwise `duty% · rpm_per_percent`
    Threshold {
        pwm: PathBuf,
        spin_percent: f32,
        rpm_per_percent: f32,
    },
    /// Starts at `spin_percent`, keeps turning down to `stall_percent`
    Hysteretic {
        pwm: PathBuf,
        spin_percent: f32,
        stall_percent: f32,
        rpm_per_percent: f32,
    },
    Constant(u32),
}

/// One successful write, in order
#[derive(Debug, Clone, PartialEq)]
pub enum WriteRecord {
    Pwm { path: PathBuf, raw: u32 },
    Enable { path: PathBuf, mode: String },
}

#[derive(Debug, Default)]
struct Thermal {
    base: f32,
    coefficients: Vec<(PathBuf, f32)>,
}

#[derive(Debug, Default)]
struct State {
    pwm: HashMap<PathBuf, u32>,
    raw_max: HashMap<PathBuf, u32>,
    enable: HashMap<PathBuf, String>,
    temps: HashMap<PathBuf, Thermal>,
    tachs: HashMap<PathBuf, TachModel>,
    failures: HashMap<PathBuf, WriteFailure>,
    unavailable: HashSet<PathBuf>,
    spinning: HashSet<PathBuf>,
    writes: Vec<WriteRecord>,
}

impl State {
    fn duty_percent(&self, path: &Path) -> f32 {
        let raw = self.pwm.get(path).copied().unwrap_or(0);
        let max = self.raw_max.get(path).copied().unwrap_or(pwm::DEFAULT_RAW_MAX);
        pwm::to_percent(raw, max)
    }

    fn check_failure(&self, path: &Path, enable: bool) -> Result<()> {
        match self.failures.get(path) {
            None => Ok(()),
            Some(WriteFailure::Unsupported) => Err(LfcError::WriteUnsupported {
                path: path.to_path_buf(),
            }),
            Some(WriteFailure::Permission) => Err(LfcError::WritePermission {
                path: path.to_path_buf(),
                reason: "Permission denied".into(),
            }),
            Some(WriteFailure::Io) if enable => Err(LfcError::EnableWrite {
                path: path.to_path_buf(),
                reason: "Input/output error".into(),
            }),
            Some(WriteFailure::Io) => Err(LfcError::PwmWrite {
                path: path.to_path_buf(),
                reason: "Input/output error".into(),
            }),
        }
    }
}

/// Fully in-memory [`HwmonIo`]
#[derive(Debug, Default)]
pub struct FakeHwmon {
    state: Mutex<State>,
}

impl FakeHwmon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pwm(&self, path: impl Into<PathBuf>, raw: u32) {
        self.state.lock().pwm.insert(path.into(), raw);
    }

    /// Register a PWM path whose native range tops out at `raw_max`
    pub fn add_pwm_with_max(&self, path: impl Into<PathBuf>, raw: u32, raw_max: u32) {
        let path = path.into();
        let mut state = self.state.lock();
        state.raw_max.insert(path.clone(), raw_max);
        state.pwm.insert(path, raw);
    }

    pub fn add_enable(&self, path: impl Into<PathBuf>, mode: &str) {
        self.state.lock().enable.insert(path.into(), mode.to_string());
    }

    pub fn add_temperature(&self, path: impl Into<PathBuf>, base: f32) {
        self.state.lock().temps.insert(
            path.into(),
            Thermal {
                base,
                coefficients: Vec::new(),
            },
        );
    }

    /// Make `temp` respond to `pwm` with coefficient `k` (°C per % below 100)
    pub fn couple(&self, temp: impl AsRef<Path>, pwm: impl Into<PathBuf>, k: f32) {
        if let Some(thermal) = self.state.lock().temps.get_mut(temp.as_ref()) {
            thermal.coefficients.push((pwm.into(), k));
        }
    }

    pub fn add_tach(&self, path: impl Into<PathBuf>, model: TachModel) {
        self.state.lock().tachs.insert(path.into(), model);
    }

    pub fn fail_writes(&self, path: impl Into<PathBuf>, failure: WriteFailure) {
        self.state.lock().failures.insert(path.into(), failure);
    }

    pub fn clear_failure(&self, path: &Path) {
        self.state.lock().failures.remove(path);
    }

    /// Make reads of a temperature or tach path return unavailable
    pub fn set_unavailable(&self, path: impl Into<PathBuf>) {
        self.state.lock().unavailable.insert(path.into());
    }

    pub fn pwm_raw(&self, path: &Path) -> Option<u32> {
        self.state.lock().pwm.get(path).copied()
    }

    pub fn enable_mode(&self, path: &Path) -> Option<String> {
        self.state.lock().enable.get(path).cloned()
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.state.lock().writes.clone()
    }

    /// Raw values written to one PWM path, in order
    pub fn pwm_writes(&self, path: &Path) -> Vec<u32> {
        self.state
            .lock()
            .writes
            .iter()
            .filter_map(|w| match w {
                WriteRecord::Pwm { path: p, raw } if p == path => Some(*raw),
                _ => None,
            })
            .collect()
    }

    pub fn clear_writes(&self) {
        self.state.lock().writes.clear();
    }
}

impl HwmonIo for FakeHwmon {
    fn read_temperature(&self, path: &Path) -> Option<f32> {
        let state = self.state.lock();
        if state.unavailable.contains(path) {
            return None;
        }
        let thermal = state.temps.get(path)?;
        let value = thermal
            .coefficients
            .iter()
            .fold(thermal.base, |acc, (pwm, k)| acc + k * (100.0 - state.duty_percent(pwm)));
        Some(value)
    }

    fn read_rpm(&self, path: &Path) -> Option<u32> {
        let mut state = self.state.lock();
        if state.unavailable.contains(path) {
            return None;
        }
        match state.tachs.get(path)?.clone() {
            TachModel::Constant(rpm) => Some(rpm),
            TachModel::Threshold {
                pwm,
                spin_percent,
                rpm_per_percent,
            } => {
                let duty = state.duty_percent(&pwm);
                if duty + 1e-3 < spin_percent {
                    Some(0)
                } else {
                    Some((duty * rpm_per_percent).round() as u32)
                }
            }
            TachModel::Hysteretic {
                pwm,
                spin_percent,
                stall_percent,
                rpm_per_percent,
            } => {
                let duty = state.duty_percent(&pwm);
                let was_spinning = state.spinning.contains(path);
                let threshold = if was_spinning { stall_percent } else { spin_percent };
                if duty + 1e-3 < threshold {
                    state.spinning.remove(path);
                    Some(0)
                } else {
                    state.spinning.insert(path.to_path_buf());
                    Some((duty * rpm_per_percent).round() as u32)
                }
            }
        }
    }

    fn read_pwm_raw(&self, path: &Path) -> Result<u32> {
        self.state
            .lock()
            .pwm
            .get(path)
            .copied()
            .ok_or_else(|| LfcError::PwmRead {
                path: path.to_path_buf(),
                reason: "No such file".into(),
            })
    }

    fn write_pwm_raw(&self, path: &Path, raw: u32) -> Result<()> {
        let mut state = self.state.lock();
        state.check_failure(path, false)?;
        match state.pwm.get_mut(path) {
            Some(value) => *value = raw,
            None => {
                return Err(LfcError::PwmWrite {
                    path: path.to_path_buf(),
                    reason: "No such file".into(),
                })
            }
        }
        state.writes.push(WriteRecord::Pwm {
            path: path.to_path_buf(),
            raw,
        });
        Ok(())
    }

    fn read_enable(&self, path: &Path) -> Option<String> {
        self.state.lock().enable.get(path).cloned()
    }

    fn write_enable(&self, path: &Path, mode: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.check_failure(path, true)?;
        match state.enable.get_mut(path) {
            Some(value) => *value = mode.to_string(),
            None => {
                return Err(LfcError::EnableWrite {
                    path: path.to_path_buf(),
                    reason: "No such file".into(),
                })
            }
        }
        state.writes.push(WriteRecord::Enable {
            path: path.to_path_buf(),
            mode: mode.to_string(),
        });
        Ok(())
    }
}
