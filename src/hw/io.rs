//! Hardware file capability
//!
//! Every read and write the sweeps and the control loop perform goes
//! through [`HwmonIo`]. The real implementation is [`super::SysfsIo`]; tests
//! use [`super::FakeHwmon`] or the generated `MockHwmonIo`.

use std::path::Path;

use crate::error::Result;

/// Read/write access to hwmon control points
///
/// Reads of sensors and tachometers return `None` when the value is
/// unavailable; a failed reading only affects the step that made it.
#[cfg_attr(test, mockall::automock)]
pub trait HwmonIo: Send + Sync {
    /// Temperature in °C
    fn read_temperature(&self, path: &Path) -> Option<f32>;

    /// Fan speed in RPM
    fn read_rpm(&self, path: &Path) -> Option<u32>;

    /// Raw PWM duty in the output's native range
    fn read_pwm_raw(&self, path: &Path) -> Result<u32>;

    /// Write a raw PWM duty
    ///
    /// Fails with `WriteUnsupported`, `WritePermission` or `PwmWrite`
    /// depending on what the driver reported.
    fn write_pwm_raw(&self, path: &Path, raw: u32) -> Result<()>;

    /// Current enable mode, trimmed
    fn read_enable(&self, path: &Path) -> Option<String>;

    fn write_enable(&self, path: &Path, mode: &str) -> Result<()>;
}
