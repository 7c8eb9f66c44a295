//! Tuning parameters for the sweeps and the control loop
//!
//! Every field has a serde default so a host can supply a partial JSON
//! document and get the rest from `constants`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::constants::{calibration, coupling, filter, safety, timing};
use crate::error::{LfcError, Result};

/// Active coupling inference parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CouplingConfig {
    pub hold_percent: f32,
    pub hold_secs: f32,
    pub floor_percent: f32,
    pub settle_secs: f32,
    pub tach_delta_rpm: u32,
}

impl Default for CouplingConfig {
    fn default() -> Self {
        Self {
            hold_percent: coupling::DEFAULT_HOLD_PERCENT,
            hold_secs: coupling::DEFAULT_HOLD.as_secs_f32(),
            floor_percent: safety::DEFAULT_FLOOR_PERCENT,
            settle_secs: coupling::DEFAULT_SETTLE.as_secs_f32(),
            tach_delta_rpm: coupling::DEFAULT_TACH_DELTA_RPM,
        }
    }
}

impl CouplingConfig {
    pub fn hold(&self) -> Duration {
        secs(self.hold_secs)
    }

    pub fn settle(&self) -> Duration {
        secs(self.settle_secs)
    }

    /// Duty used for the boost phase, never below the floor
    pub fn boost_percent(&self) -> f32 {
        self.hold_percent.max(self.floor_percent).clamp(0.0, 100.0)
    }

    pub fn validate(&self) -> Result<()> {
        check_percent("coupling.hold_percent", self.hold_percent)?;
        check_percent("coupling.floor_percent", self.floor_percent)?;
        check_duration("coupling.hold_secs", self.hold_secs)?;
        check_duration("coupling.settle_secs", self.settle_secs)?;
        Ok(())
    }
}

/// Calibration sweep parameters, in whole percent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub floor_percent: u32,
    pub start_percent: u32,
    pub end_percent: u32,
    pub step_percent: u32,
    pub settle_secs: f32,
    pub rpm_threshold: u32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            floor_percent: safety::DEFAULT_FLOOR_PERCENT as u32,
            start_percent: calibration::DEFAULT_START_PERCENT,
            end_percent: calibration::DEFAULT_END_PERCENT,
            step_percent: calibration::DEFAULT_STEP_PERCENT,
            settle_secs: calibration::DEFAULT_SETTLE_SECS,
            rpm_threshold: calibration::DEFAULT_RPM_THRESHOLD,
        }
    }
}

impl CalibrationConfig {
    pub fn settle(&self) -> Duration {
        secs(self.settle_secs)
    }

    /// First duty of the upward sweep
    pub fn sweep_start(&self) -> u32 {
        self.start_percent.max(self.floor_percent)
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("calibration.floor_percent", self.floor_percent),
            ("calibration.start_percent", self.start_percent),
            ("calibration.end_percent", self.end_percent),
        ] {
            if value > 100 {
                return Err(LfcError::invalid_config(field, format!("{} exceeds 100", value)));
            }
        }
        if self.step_percent == 0 || self.step_percent > 100 {
            return Err(LfcError::invalid_config("calibration.step_percent", "must be 1-100"));
        }
        if self.start_percent > self.end_percent {
            return Err(LfcError::invalid_config(
                "calibration.start_percent",
                "must not exceed end_percent",
            ));
        }
        check_duration("calibration.settle_secs", self.settle_secs)
    }
}

/// Filter defaults for channels created from coupling results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub hysteresis_c: f32,
    pub tau_secs: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            hysteresis_c: filter::DEFAULT_HYSTERESIS_CELSIUS,
            tau_secs: filter::DEFAULT_TAU_SECS,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<()> {
        check_non_negative("filter.hysteresis_c", self.hysteresis_c)?;
        check_duration("filter.tau_secs", self.tau_secs)
    }
}

/// Control loop parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub tick_interval_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: timing::DEFAULT_TICK_MS,
        }
    }
}

impl ControlConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// All engine tunables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub coupling: CouplingConfig,
    pub calibration: CalibrationConfig,
    pub filter: FilterConfig,
    pub control: ControlConfig,
}

impl EngineConfig {
    /// Parse and validate a (possibly partial) JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| LfcError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = ?path, "Loaded engine config");
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.coupling.validate()?;
        self.calibration.validate()?;
        self.filter.validate()?;
        if self.control.tick_interval_ms == 0 {
            return Err(LfcError::invalid_config("control.tick_interval_ms", "must be > 0"));
        }
        Ok(())
    }
}

/// Saturating conversion; NaN and negatives become zero
fn secs(value: f32) -> Duration {
    Duration::try_from_secs_f32(value.max(0.0)).unwrap_or(Duration::MAX)
}

fn check_percent(field: &str, value: f32) -> Result<()> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(LfcError::invalid_config(field, format!("{} is not within 0-100", value)));
    }
    Ok(())
}

fn check_non_negative(field: &str, value: f32) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(LfcError::invalid_config(field, format!("{} must be a non-negative number", value)));
    }
    Ok(())
}

fn check_duration(field: &str, value: f32) -> Result<()> {
    check_non_negative(field, value)?;
    if value > timing::MAX_CONFIG_SECS {
        return Err(LfcError::invalid_config(
            field,
            format!("{} exceeds {} seconds", value, timing::MAX_CONFIG_SECS),
        ));
    }
    Ok(())
}
