//! Piecewise-linear fan curves
//!
//! A curve is a list of (temperature, duty) points kept sorted by
//! temperature with unique temperatures. Evaluation clamps to the first and
//! last points and interpolates linearly in between.

use serde::{Deserialize, Serialize};

use crate::constants::default_curve;
use crate::data::{validate_curve_points, CurvePoint};
use crate::error::Result;

/// Temperature to duty mapping with at least two points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CurvePoint>", into = "Vec<CurvePoint>")]
pub struct Curve {
    points: Vec<CurvePoint>,
}

impl Curve {
    /// Build a curve from unsorted points
    ///
    /// Duty values are clamped to 0-100. For repeated temperatures the
    /// later point wins.
    pub fn new(points: Vec<CurvePoint>) -> Result<Self> {
        validate_curve_points(&points)?;

        let mut sorted = points;
        sorted.sort_by(|a, b| a.temperature.total_cmp(&b.temperature));

        let mut unique: Vec<CurvePoint> = Vec::with_capacity(sorted.len());
        for point in sorted {
            let point = CurvePoint::new(point.temperature, point.duty_percent.clamp(0.0, 100.0));
            match unique.last_mut() {
                Some(last) if last.temperature == point.temperature => *last = point,
                _ => unique.push(point),
            }
        }

        if unique.len() < 2 {
            return Err(crate::error::LfcError::InvalidCurve(
                "curve needs at least two distinct temperatures".into(),
            ));
        }
        Ok(Self { points: unique })
    }

    pub fn from_pairs(pairs: &[(f32, f32)]) -> Result<Self> {
        Self::new(pairs.iter().copied().map(CurvePoint::from).collect())
    }

    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Duty percent for a temperature
    pub fn evaluate(&self, temp: f32) -> f32 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 100.0,
        };

        if temp <= first.temperature {
            return first.duty_percent;
        }
        if temp >= last.temperature {
            return last.duty_percent;
        }

        for window in self.points.windows(2) {
            let (lo, hi) = (&window[0], &window[1]);
            if temp >= lo.temperature && temp <= hi.temperature {
                let ratio = (temp - lo.temperature) / (hi.temperature - lo.temperature);
                return lo.duty_percent + ratio * (hi.duty_percent - lo.duty_percent);
            }
        }

        // NaN input
        last.duty_percent
    }

    fn from_table(table: &[(f32, f32)]) -> Self {
        Self {
            points: table.iter().copied().map(CurvePoint::from).collect(),
        }
    }
}

impl Default for Curve {
    /// Curve given to channels created from a coupling result
    fn default() -> Self {
        Self::from_table(&default_curve::AUTO_SETUP)
    }
}

impl TryFrom<Vec<CurvePoint>> for Curve {
    type Error = crate::error::LfcError;

    fn try_from(points: Vec<CurvePoint>) -> Result<Self> {
        Self::new(points)
    }
}

impl From<Curve> for Vec<CurvePoint> {
    fn from(curve: Curve) -> Self {
        curve.points
    }
}

/// Preset curve profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurvePreset {
    Quiet,
    Balanced,
    Performance,
    FullSpeed,
}

impl CurvePreset {
    pub const ALL: [CurvePreset; 4] = [
        CurvePreset::Quiet,
        CurvePreset::Balanced,
        CurvePreset::Performance,
        CurvePreset::FullSpeed,
    ];

    pub fn points(&self) -> Vec<CurvePoint> {
        self.to_curve().points
    }

    pub fn to_curve(&self) -> Curve {
        match self {
            CurvePreset::Quiet => Curve::from_table(&default_curve::QUIET),
            CurvePreset::Balanced => Curve::from_table(&default_curve::BALANCED),
            CurvePreset::Performance => Curve::from_table(&default_curve::PERFORMANCE),
            CurvePreset::FullSpeed => Curve::from_table(&default_curve::FULL_SPEED),
        }
    }
}
