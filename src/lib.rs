//! Linux Fan Control core library
//!
//! Works out which fan cools which sensor on a machine with unknown
//! topology, calibrates each fan, and drives it from a temperature curve.
//!
//! # Features
//!
//! - **Hardware Inventory**: enumerates hwmon temperature inputs and PWM outputs and classifies sensors
//! - **Coupling Inference**: boosts one fan at a time and watches which sensor reacts
//! - **Calibration**: finds spin-up and minimum stable duty without going below a safety floor
//! - **Control**: piecewise-linear curves through a hysteresis and slew filter
//!
//! # Module Structure
//!
//! - `hw/` - Hardware inventory, file capability, safety/write layer
//! - `detection/` - Coupling inference, fallback heuristic, calibration
//! - `engine/` - Curves, filter, channels, control loop, profiles
//! - `data/` - Data types, configuration, validation
//!
//! The library never installs a `tracing` subscriber; the host does.
//!
//! # Example
//!
//! ```no_run
//! use lfc::{
//!     detect_and_couple, share_outputs, CancelToken, EngineConfig, HwmonInventory, MonotonicClock,
//!     SysfsIo,
//! };
//!
//! let inventory = HwmonInventory::scan_system(&SysfsIo).unwrap();
//! let outputs = share_outputs(inventory.outputs.clone());
//! let report = detect_and_couple(
//!     &SysfsIo,
//!     &MonotonicClock::new(),
//!     &outputs,
//!     &inventory.temperatures,
//!     &EngineConfig::default().coupling,
//!     &CancelToken::new(),
//!     &mut |event| println!("{:?}", event),
//! );
//! ```

// Grouped modules
pub mod data;
pub mod detection;
pub mod engine;
pub mod hw;

// Standalone modules
pub mod constants;
pub mod error;

pub use data::{
    CalibrationConfig, CalibrationResult, ControlConfig, CouplingConfig, CouplingEvidence, CouplingRecord,
    CouplingTable, CurvePoint, EngineConfig, FilterConfig, OutputId, OutputOutcome, PwmOutput, SensorId,
    SensorType, TemperaturePoint,
};

pub use error::{LfcError, Result};

pub use hw::{
    classify_sensor, command_duty, discover_pwm_outputs, discover_temperatures, probe_writable, restore,
    share_outputs, snapshot, suggest_label, Clock, FakeClock, FakeHwmon, HwmonInventory, HwmonIo,
    MonotonicClock, SharedOutput, Snapshot, SysfsIo, TachModel, WriteFailure, WriteRecord,
};

pub use detection::{
    calibrate, calibrate_all, detect_and_couple, heuristic_coupling, infer_coupling, wait_cancellable,
    Calibration, CalibrationReport, CancelToken, CouplingReport, SweepEvent, SweepPhase,
};

pub use engine::{
    Channel, ChannelMode, ChannelTick, ControlLoop, Curve, CurvePreset, FilterState, Profile, ProfileSet,
    SharedTrigger, TickOutcome, Trigger, TriggerSet,
};
