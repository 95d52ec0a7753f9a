// fusion_core/src/messages.rs

use nalgebra::{DVector, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FilterError;
use crate::types::Timestamp;

// =========================================================================
// == Sensor Identification ==
// =========================================================================

/// The two sensor modalities the filter knows how to fuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// Cartesian position sensor (lidar-like): `z = (px, py)`.
    Position,
    /// Polar sensor (radar-like): `z = (range, bearing, range_rate)`.
    RangeBearing,
}

impl SensorKind {
    pub const ALL: [SensorKind; 2] = [SensorKind::Position, SensorKind::RangeBearing];

    /// Number of raw values a measurement of this kind carries.
    pub fn measurement_dim(self) -> usize {
        match self {
            SensorKind::Position => 2,
            SensorKind::RangeBearing => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SensorKind::Position => "position",
            SensorKind::RangeBearing => "range_bearing",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =========================================================================
// == Core Message and Data Enums ==
// =========================================================================

/// A self-describing container for one sensor reading.
#[derive(Clone, Debug, PartialEq)]
pub enum MeasurementData {
    /// `(px, py)` in meters.
    Position(Vector2<f64>),
    /// `(range [m], bearing [rad], range_rate [m/s])`.
    RangeBearing(Vector3<f64>),
}

impl MeasurementData {
    pub fn kind(&self) -> SensorKind {
        match self {
            MeasurementData::Position(_) => SensorKind::Position,
            MeasurementData::RangeBearing(_) => SensorKind::RangeBearing,
        }
    }

    /// The raw measurement vector `z` in the sensor's native layout.
    pub fn to_vector(&self) -> DVector<f64> {
        match self {
            MeasurementData::Position(v) => DVector::from_column_slice(v.as_slice()),
            MeasurementData::RangeBearing(v) => DVector::from_column_slice(v.as_slice()),
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            MeasurementData::Position(v) => v.iter().all(|c| c.is_finite()),
            MeasurementData::RangeBearing(v) => v.iter().all(|c| c.is_finite()),
        }
    }

    /// The measured position in Cartesian coordinates. Handy for logging
    /// and result files; the filter itself never uses it.
    pub fn cartesian_position(&self) -> Vector2<f64> {
        match self {
            MeasurementData::Position(v) => *v,
            MeasurementData::RangeBearing(v) => {
                let (range, bearing) = (v[0], v[1]);
                Vector2::new(range * bearing.cos(), range * bearing.sin())
            }
        }
    }
}

/// The message that carries sensor data into a `StateEstimator`.
#[derive(Clone, Debug, PartialEq)]
pub struct MeasurementMessage {
    pub timestamp: Timestamp,
    pub data: MeasurementData,
}

impl MeasurementMessage {
    pub fn position(px: f64, py: f64, timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            data: MeasurementData::Position(Vector2::new(px, py)),
        }
    }

    pub fn range_bearing(range: f64, bearing: f64, range_rate: f64, timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            data: MeasurementData::RangeBearing(Vector3::new(range, bearing, range_rate)),
        }
    }

    /// Builds a message from an untyped slice of raw values, rejecting a value
    /// count that does not match the modality and any non-finite value.
    pub fn from_raw(kind: SensorKind, raw: &[f64], timestamp: Timestamp) -> Result<Self, FilterError> {
        let expected = kind.measurement_dim();
        if raw.len() != expected {
            return Err(FilterError::DimensionMismatch {
                sensor: kind,
                expected,
                received: raw.len(),
            });
        }
        if raw.iter().any(|v| !v.is_finite()) {
            return Err(FilterError::NonFiniteMeasurement { sensor: kind });
        }

        let message = match kind {
            SensorKind::Position => Self::position(raw[0], raw[1], timestamp),
            SensorKind::RangeBearing => Self::range_bearing(raw[0], raw[1], raw[2], timestamp),
        };
        Ok(message)
    }

    pub fn kind(&self) -> SensorKind {
        self.data.kind()
    }
}

/// The universal input packet for all `StateEstimator` implementations.
pub enum ModuleInput<'a> {
    /// A sensor reading: initialize on the first one, predict + update afterwards.
    Measurement { message: &'a MeasurementMessage },
    /// A heartbeat: advance the estimate to `timestamp` by prediction only.
    Predict { timestamp: Timestamp },
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_from_raw_accepts_matching_counts() {
        let msg = MeasurementMessage::from_raw(SensorKind::Position, &[1.0, 2.0], 7).unwrap();
        assert_eq!(msg, MeasurementMessage::position(1.0, 2.0, 7));

        let msg =
            MeasurementMessage::from_raw(SensorKind::RangeBearing, &[1.0, 0.5, -0.2], 9).unwrap();
        assert_eq!(msg.kind(), SensorKind::RangeBearing);
        assert_eq!(msg.data.to_vector().as_slice(), &[1.0, 0.5, -0.2]);
    }

    #[test]
    fn test_from_raw_rejects_count_mismatch() {
        let err = MeasurementMessage::from_raw(SensorKind::RangeBearing, &[1.0, 0.5], 0).unwrap_err();
        assert_eq!(
            err,
            FilterError::DimensionMismatch {
                sensor: SensorKind::RangeBearing,
                expected: 3,
                received: 2
            }
        );
    }

    #[test]
    fn test_from_raw_rejects_nan() {
        let err = MeasurementMessage::from_raw(SensorKind::Position, &[f64::NAN, 0.0], 0).unwrap_err();
        assert!(err.is_precondition_violation());
    }

    #[test]
    fn test_cartesian_position_of_range_bearing() {
        let data = MeasurementData::RangeBearing(Vector3::new(2.0, FRAC_PI_2, 0.0));
        let p = data.cartesian_position();
        assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 2.0, epsilon = 1e-12);
    }
}
