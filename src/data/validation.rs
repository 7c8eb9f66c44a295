//! Input validation for curves and duty values
//!
//! Hosts hand the engine user-edited curves; these checks run before a
//! curve is accepted so evaluation never sees NaN or an empty table.

use crate::data::CurvePoint;
use crate::error::{LfcError, Result};

/// Maximum number of points accepted for one curve
pub const MAX_CURVE_POINTS: usize = 32;

/// Validates that a percentage is within the valid range (0.0-100.0)
pub fn validate_percentage(value: f32) -> Result<f32> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(LfcError::InvalidPercentage { value });
    }
    Ok(value)
}

/// Validates raw curve points before they are sorted and deduplicated
///
/// Duty values outside 0-100 are not an error here; the curve clamps them.
pub fn validate_curve_points(points: &[CurvePoint]) -> Result<()> {
    if points.len() < 2 {
        return Err(LfcError::InvalidCurve(format!(
            "curve needs at least two points, got {}",
            points.len()
        )));
    }
    if points.len() > MAX_CURVE_POINTS {
        return Err(LfcError::InvalidCurve(format!(
            "too many curve points (max {})",
            MAX_CURVE_POINTS
        )));
    }
    for point in points {
        if !point.temperature.is_finite() || !point.duty_percent.is_finite() {
            return Err(LfcError::InvalidCurve("curve points must be finite".into()));
        }
    }
    Ok(())
}
