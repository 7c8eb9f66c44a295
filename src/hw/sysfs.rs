//! Real filesystem implementation of [`HwmonIo`]
//!
//! hwmon reports temperatures in millidegrees Celsius, fan speed in RPM and
//! PWM duty as a plain integer. Write failures are classified by errno so
//! the write layer can tell an unsupported control point from a transient
//! permission problem.

use std::fs;
use std::io;
use std::path::Path;
use tracing::trace;

use super::HwmonIo;
use crate::constants::temperature;
use crate::error::{LfcError, Result};

/// Direct sysfs access
#[derive(Debug, Clone, Copy, Default)]
pub struct SysfsIo;

impl SysfsIo {
    pub fn new() -> Self {
        Self
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(content) => Some(content.trim().to_string()),
        Err(e) => {
            trace!(path = ?path, error = %e, "Read failed");
            None
        }
    }
}

/// Map a failed write to the error kind the write layer acts on
pub(crate) fn classify_write_error(path: &Path, err: io::Error, enable: bool) -> LfcError {
    match err.raw_os_error() {
        Some(code) if code == libc::EOPNOTSUPP || code == libc::ENOTSUP => {
            LfcError::WriteUnsupported { path: path.to_path_buf() }
        }
        Some(code) if code == libc::EPERM || code == libc::EACCES || code == libc::EROFS => {
            LfcError::WritePermission {
                path: path.to_path_buf(),
                reason: err.to_string(),
            }
        }
        _ if err.kind() == io::ErrorKind::PermissionDenied => LfcError::WritePermission {
            path: path.to_path_buf(),
            reason: err.to_string(),
        },
        _ if enable => LfcError::EnableWrite {
            path: path.to_path_buf(),
            reason: err.to_string(),
        },
        _ => LfcError::PwmWrite {
            path: path.to_path_buf(),
            reason: err.to_string(),
        },
    }
}

impl HwmonIo for SysfsIo {
    fn read_temperature(&self, path: &Path) -> Option<f32> {
        let raw = read_trimmed(path)?.parse::<f32>().ok()?;
        Some(temperature::normalize(raw))
    }

    fn read_rpm(&self, path: &Path) -> Option<u32> {
        read_trimmed(path)?.parse::<u32>().ok()
    }

    fn read_pwm_raw(&self, path: &Path) -> Result<u32> {
        let content = fs::read_to_string(path).map_err(|e| LfcError::PwmRead {
            path: path.to_path_buf(),
            reason: format!("Failed to read: {}", e),
        })?;

        content.trim().parse::<u32>().map_err(|e| LfcError::PwmRead {
            path: path.to_path_buf(),
            reason: format!("Failed to parse '{}': {}", content.trim(), e),
        })
    }

    fn write_pwm_raw(&self, path: &Path, raw: u32) -> Result<()> {
        fs::write(path, raw.to_string()).map_err(|e| classify_write_error(path, e, false))
    }

    fn read_enable(&self, path: &Path) -> Option<String> {
        read_trimmed(path)
    }

    fn write_enable(&self, path: &Path, mode: &str) -> Result<()> {
        fs::write(path, mode).map_err(|e| classify_write_error(path, e, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reads_and_normalizes() {
        let dir = TempDir::new().unwrap();
        let temp = dir.path().join("temp1_input");
        let fan = dir.path().join("fan1_input");
        let pwm = dir.path().join("pwm1");
        fs::write(&temp, "42000\n").unwrap();
        fs::write(&fan, "1200\n").unwrap();
        fs::write(&pwm, "128\n").unwrap();

        let io = SysfsIo::new();
        assert!((io.read_temperature(&temp).unwrap() - 42.0).abs() < 1e-4);
        assert_eq!(io.read_rpm(&fan), Some(1200));
        assert_eq!(io.read_pwm_raw(&pwm).unwrap(), 128);
    }

    #[test]
    fn test_celsius_inputs_pass_through() {
        let dir = TempDir::new().unwrap();
        let temp = dir.path().join("temp1_input");
        fs::write(&temp, "55").unwrap();

        assert_eq!(SysfsIo.read_temperature(&temp), Some(55.0));
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let io = SysfsIo::new();

        assert_eq!(io.read_temperature(&dir.path().join("temp9_input")), None);
        assert!(matches!(
            io.read_pwm_raw(&dir.path().join("pwm9")),
            Err(LfcError::PwmRead { .. })
        ));
    }

    #[test]
    fn test_write_round_trip() {
        let dir = TempDir::new().unwrap();
        let pwm = dir.path().join("pwm1");
        let enable = dir.path().join("pwm1_enable");
        fs::write(&pwm, "0").unwrap();
        fs::write(&enable, "2").unwrap();

        let io = SysfsIo::new();
        io.write_pwm_raw(&pwm, 200).unwrap();
        io.write_enable(&enable, "1").unwrap();

        assert_eq!(io.read_pwm_raw(&pwm).unwrap(), 200);
        assert_eq!(io.read_enable(&enable).as_deref(), Some("1"));
    }

    #[test]
    fn test_errno_classification() {
        let path = Path::new("/x/pwm1");
        let unsupported = io::Error::from_raw_os_error(libc::EOPNOTSUPP);
        let denied = io::Error::from_raw_os_error(libc::EACCES);
        let rofs = io::Error::from_raw_os_error(libc::EROFS);
        let busy = io::Error::from_raw_os_error(libc::EBUSY);

        assert!(classify_write_error(path, unsupported, false).is_unsupported());
        assert!(classify_write_error(path, denied, false).is_permission());
        assert!(classify_write_error(path, rofs, false).is_permission());
        assert!(matches!(
            classify_write_error(path, busy, true),
            LfcError::EnableWrite { .. }
        ));
    }
}
