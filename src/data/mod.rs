//! Data types, configuration, and validation modules

mod config;
mod types;
mod validation;

pub use config::{CalibrationConfig, ControlConfig, CouplingConfig, EngineConfig, FilterConfig};
pub use types::{
    CalibrationResult, CouplingEvidence, CouplingRecord, CouplingTable, CurvePoint, OutputId, OutputOutcome,
    PwmOutput, SensorId, SensorType, TemperaturePoint,
};
pub use validation::{validate_curve_points, validate_percentage, MAX_CURVE_POINTS};
