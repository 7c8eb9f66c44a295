//! Core data types
//!
//! Typed records for the inventory, coupling and calibration results. These
//! are the pure data the engine hands to its hosts (GUI, CLI, daemon).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Identity of a temperature input: hwmon directory + `tempN` index
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SensorId {
    pub chip: String,
    pub index: u32,
}

impl SensorId {
    pub fn new(chip: impl Into<String>, index: u32) -> Self {
        Self { chip: chip.into(), index }
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/temp{}", self.chip, self.index)
    }
}

/// Identity of a PWM output: hwmon directory + `pwmN` index
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutputId {
    pub chip: String,
    pub index: u32,
}

impl OutputId {
    pub fn new(chip: impl Into<String>, index: u32) -> Self {
        Self { chip: chip.into(), index }
    }
}

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/pwm{}", self.chip, self.index)
    }
}

/// Likely physical origin of a temperature input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorType {
    Cpu,
    Gpu,
    Nvme,
    Chipset,
    Motherboard,
    Vrm,
    Water,
    Ambient,
    Unknown,
}

impl SensorType {
    /// Short display name, also used as the label prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::Cpu => "CPU",
            SensorType::Gpu => "GPU",
            SensorType::Nvme => "NVMe",
            SensorType::Chipset => "Chipset",
            SensorType::Motherboard => "Motherboard",
            SensorType::Vrm => "VRM",
            SensorType::Water => "Water",
            SensorType::Ambient => "Ambient",
            SensorType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered temperature input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemperaturePoint {
    pub id: SensorId,
    /// Driver name from the chip's `name` file
    pub chip_name: String,
    pub path: PathBuf,
    /// Label as supplied by the chip, or `tempN`
    pub raw_label: String,
    /// Label prefixed with the semantic type
    pub label: String,
    pub sensor_type: SensorType,
    /// Last read value in °C
    pub value: Option<f32>,
}

impl TemperaturePoint {
    /// Re-read the value through the given hardware capability
    pub fn refresh(&mut self, io: &dyn crate::hw::HwmonIo) -> Option<f32> {
        self.value = io.read_temperature(&self.path);
        self.value
    }
}

/// A discovered PWM output
///
/// The `writable` flag can only go from true to false: once the driver
/// reports an unsupported write the output is never written again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PwmOutput {
    pub id: OutputId,
    pub chip_name: String,
    pub pwm_path: PathBuf,
    pub enable_path: Option<PathBuf>,
    pub tach_path: Option<PathBuf>,
    /// Top of the raw duty range (`pwmN_max`, usually 255)
    pub raw_max: u32,
    pub min_percent: f32,
    pub max_percent: f32,
    /// Last duty commanded through the write layer
    pub last_duty: Option<f32>,
    writable: bool,
}

impl PwmOutput {
    pub fn new(id: OutputId, chip_name: impl Into<String>, pwm_path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            chip_name: chip_name.into(),
            pwm_path: pwm_path.into(),
            enable_path: None,
            tach_path: None,
            raw_max: crate::constants::pwm::DEFAULT_RAW_MAX,
            min_percent: 0.0,
            max_percent: 100.0,
            last_duty: None,
            writable: true,
        }
    }

    pub fn with_enable(mut self, path: impl Into<PathBuf>) -> Self {
        self.enable_path = Some(path.into());
        self
    }

    pub fn with_tach(mut self, path: impl Into<PathBuf>) -> Self {
        self.tach_path = Some(path.into());
        self
    }

    pub fn with_raw_max(mut self, raw_max: u32) -> Self {
        if raw_max > 0 {
            self.raw_max = raw_max;
        }
        self
    }

    /// Restrict the duty range this output may be driven in
    pub fn with_bounds(mut self, min_percent: f32, max_percent: f32) -> Self {
        let lo = min_percent.clamp(0.0, 100.0);
        let hi = max_percent.clamp(0.0, 100.0);
        self.min_percent = lo.min(hi);
        self.max_percent = hi.max(lo);
        self
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Permanently downgrade this output to read-only
    pub(crate) fn mark_read_only(&mut self) {
        self.writable = false;
    }

    pub fn percent_from_raw(&self, raw: u32) -> f32 {
        crate::constants::pwm::to_percent(raw, self.raw_max)
    }

    pub fn raw_from_percent(&self, percent: f32) -> u32 {
        crate::constants::pwm::from_percent(percent, self.raw_max)
    }
}

/// How a coupling was established
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CouplingEvidence {
    /// Absolute temperature change observed while boosting, in °C
    Measured { delta_c: f32 },
    /// Picked by type priority among sensors on the output's own chip
    SameChip,
    /// Picked by type priority across the whole inventory
    AnyChip,
}

impl CouplingEvidence {
    /// Numeric confidence for measured couplings
    pub fn confidence(&self) -> Option<f32> {
        match self {
            CouplingEvidence::Measured { delta_c } => Some(*delta_c),
            _ => None,
        }
    }

    pub fn is_measured(&self) -> bool {
        matches!(self, CouplingEvidence::Measured { .. })
    }
}

/// The sensor chosen for one PWM output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouplingRecord {
    pub output: OutputId,
    pub sensor: SensorId,
    pub sensor_label: String,
    pub evidence: CouplingEvidence,
}

/// At most one coupling record per output
///
/// Inserting for an output that already has a record replaces it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CouplingTable {
    records: BTreeMap<OutputId, CouplingRecord>,
}

impl CouplingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: CouplingRecord) -> Option<CouplingRecord> {
        self.records.insert(record.output.clone(), record)
    }

    /// Insert only for outputs without a record yet
    pub fn insert_missing(&mut self, record: CouplingRecord) -> bool {
        if self.records.contains_key(&record.output) {
            return false;
        }
        self.records.insert(record.output.clone(), record);
        true
    }

    pub fn get(&self, output: &OutputId) -> Option<&CouplingRecord> {
        self.records.get(output)
    }

    pub fn contains(&self, output: &OutputId) -> bool {
        self.records.contains_key(output)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CouplingRecord> {
        self.records.values()
    }
}

/// A single control point on a fan curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub temperature: f32,
    pub duty_percent: f32,
}

impl CurvePoint {
    pub const fn new(temperature: f32, duty_percent: f32) -> Self {
        Self { temperature, duty_percent }
    }
}

impl From<(f32, f32)> for CurvePoint {
    fn from((temperature, duty_percent): (f32, f32)) -> Self {
        Self::new(temperature, duty_percent)
    }
}

/// Result of a successful calibration sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub spinup_percent: u32,
    pub min_stable_percent: u32,
    /// Tach reading at the minimum stable duty
    pub rpm_at_min: u32,
}

/// Per-output outcome of a batch operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutputOutcome {
    Ok,
    Skipped { reason: String },
    Aborted,
    Error { reason: String },
}

impl OutputOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped { reason: reason.into() }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self::Error { reason: reason.into() }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, OutputOutcome::Ok)
    }
}
