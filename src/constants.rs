//! Constants and configuration defaults
//!
//! Centralizes the magic numbers used by discovery, the sweeps and the
//! control filter. Add new tunables here rather than inline.

use std::time::Duration;

/// System paths
pub mod paths {
    /// Base path for hwmon devices
    pub const HWMON_BASE: &str = "/sys/class/hwmon";
}

/// PWM control constants
pub mod pwm {
    /// Native raw range used when a chip does not expose `pwmN_max`
    pub const DEFAULT_RAW_MAX: u32 = 255;

    /// PWM enable values
    pub mod enable {
        /// Manual PWM control
        pub const MANUAL: &str = "1";
    }

    /// Convert a percentage to a raw duty, rounding to nearest over `raw_max`
    #[inline]
    pub fn from_percent(percent: f32, raw_max: u32) -> u32 {
        ((percent.clamp(0.0, 100.0) / 100.0) * raw_max as f32).round() as u32
    }

    /// Convert a raw duty to a percentage, clamped to 0-100
    #[inline]
    pub fn to_percent(raw: u32, raw_max: u32) -> f32 {
        if raw_max == 0 {
            return 0.0;
        }
        (raw as f32 * 100.0 / raw_max as f32).clamp(0.0, 100.0)
    }
}

/// Temperature constants
pub mod temperature {
    /// Readings whose magnitude exceeds this are millidegrees Celsius
    pub const MILLIDEGREE_THRESHOLD: f32 = 200.0;

    /// Divide millidegree readings by this to get Celsius
    pub const MILLIDEGREE_DIVISOR: f32 = 1000.0;

    /// Normalize a raw hwmon reading to degrees Celsius
    #[inline]
    pub fn normalize(raw: f32) -> f32 {
        if raw.abs() > MILLIDEGREE_THRESHOLD {
            raw / MILLIDEGREE_DIVISOR
        } else {
            raw
        }
    }
}

/// Coupling inference parameters
pub mod coupling {
    use super::*;

    /// Duty the fan is boosted to while measuring
    pub const DEFAULT_HOLD_PERCENT: f32 = 100.0;

    /// How long each boost is held
    pub const DEFAULT_HOLD: Duration = Duration::from_secs(10);

    /// Settle period at baseline duty before the baseline vector is taken
    pub const DEFAULT_SETTLE: Duration = Duration::from_secs(2);

    /// RPM change below this means the fan did not respond to the boost
    pub const DEFAULT_TACH_DELTA_RPM: u32 = 50;

    /// Baseline duty assumed when the current duty cannot be read
    pub const UNKNOWN_DUTY_PERCENT: f32 = 35.0;
}

/// Calibration sweep parameters
pub mod calibration {
    pub const DEFAULT_START_PERCENT: u32 = 0;
    pub const DEFAULT_END_PERCENT: u32 = 100;
    pub const DEFAULT_STEP_PERCENT: u32 = 5;
    pub const DEFAULT_SETTLE_SECS: f32 = 1.0;
    /// Tach readings at or above this count as spinning
    pub const DEFAULT_RPM_THRESHOLD: u32 = 100;
}

/// Safety limits shared by the sweeps
pub mod safety {
    /// Lowest duty any sweep is allowed to command
    pub const DEFAULT_FLOOR_PERCENT: f32 = 20.0;
}

/// Timing constants
pub mod timing {
    use super::*;

    /// Granularity of cancellable waits
    pub const CANCEL_POLL: Duration = Duration::from_millis(100);

    /// Default control loop tick
    pub const DEFAULT_TICK_MS: u64 = 1000;

    /// Longest hold or settle time a config may ask for
    pub const MAX_CONFIG_SECS: f32 = 86_400.0;
}

/// Control filter parameters
pub mod filter {
    /// Hysteresis band used for channels created from a coupling result
    pub const DEFAULT_HYSTERESIS_CELSIUS: f32 = 1.0;

    /// Slew time constant used for channels created from a coupling result
    pub const DEFAULT_TAU_SECS: f32 = 2.0;
}

/// Default fan curve points as (temperature °C, duty %)
pub mod default_curve {
    /// Curve given to channels created by auto-setup
    pub const AUTO_SETUP: [(f32, f32); 4] = [(20.0, 0.0), (35.0, 25.0), (50.0, 50.0), (70.0, 80.0)];

    pub const QUIET: [(f32, f32); 5] = [
        (30.0, 15.0),
        (50.0, 25.0),
        (65.0, 45.0),
        (75.0, 70.0),
        (85.0, 100.0),
    ];

    pub const BALANCED: [(f32, f32); 4] = [(30.0, 20.0), (50.0, 40.0), (70.0, 70.0), (85.0, 100.0)];

    pub const PERFORMANCE: [(f32, f32); 4] = [(30.0, 40.0), (50.0, 60.0), (65.0, 80.0), (75.0, 100.0)];

    pub const FULL_SPEED: [(f32, f32); 2] = [(0.0, 100.0), (100.0, 100.0)];
}
