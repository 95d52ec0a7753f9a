// fusion_core/src/state.rs

use nalgebra::{DVector, Vector2};

use crate::error::FilterError;
use crate::messages::SensorKind;
use crate::types::{Covariance, State, Timestamp};

pub mod layout;

/// Every variable that can appear in the filter's state vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateVariable {
    // --- Cartesian Position ---
    Px,
    Py,
    // --- Speed magnitude along the heading ---
    Speed,
    // --- Heading and its rate ---
    Yaw,
    YawRate,
}

impl StateVariable {
    /// Circular quantities whose differences must be wrapped into (-pi, pi].
    pub fn is_angular(self) -> bool {
        matches!(self, StateVariable::Yaw)
    }
}

/// Every variable that can appear in a measurement vector, in the sensor's native frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasurementVariable {
    Px,
    Py,
    Range,
    Bearing,
    RangeRate,
}

impl MeasurementVariable {
    pub fn is_angular(self) -> bool {
        matches!(self, MeasurementVariable::Bearing)
    }
}

/// Indices of the angular entries in a layout.
pub fn angular_indices<T: Copy>(layout: &[T], is_angular: impl Fn(T) -> bool) -> Vec<usize> {
    layout
        .iter()
        .enumerate()
        .filter(|(_, var)| is_angular(**var))
        .map(|(i, _)| i)
        .collect()
}

/// The most recent NIS value produced by each sensor modality.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NisByModality {
    pub position: Option<f64>,
    pub range_bearing: Option<f64>,
}

impl NisByModality {
    pub fn get(&self, kind: SensorKind) -> Option<f64> {
        match kind {
            SensorKind::Position => self.position,
            SensorKind::RangeBearing => self.range_bearing,
        }
    }

    pub fn set(&mut self, kind: SensorKind, nis: f64) {
        match kind {
            SensorKind::Position => self.position = Some(nis),
            SensorKind::RangeBearing => self.range_bearing = Some(nis),
        }
    }
}

/// The committed estimate owned by a filter. It bundles the state vector
/// with its schema (the layout), covariance, timestamp and consistency scores.
///
/// A filter only ever replaces this value as a whole, after a cycle has
/// fully succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    /// The ordered "schema" of the state vector.
    pub layout: Vec<StateVariable>,
    /// The actual numerical data vector `x`.
    pub vector: State,
    /// The covariance matrix `P`.
    pub covariance: Covariance,
    /// The timestamp of the last accepted measurement.
    pub last_update_timestamp: Timestamp,
    /// Most recent NIS per modality.
    pub nis: NisByModality,
}

impl FilterState {
    /// Creates a state with a given layout, a zero vector and the given covariance.
    pub fn new(
        layout: Vec<StateVariable>,
        covariance: Covariance,
        timestamp: Timestamp,
    ) -> Result<Self, FilterError> {
        let dim = layout.len();
        if covariance.shape() != (dim, dim) {
            return Err(FilterError::InvalidConfig(format!(
                "covariance is {:?} but the layout has {dim} variables",
                covariance.shape()
            )));
        }
        Ok(Self {
            layout,
            vector: DVector::zeros(dim),
            covariance,
            last_update_timestamp: timestamp,
            nis: NisByModality::default(),
        })
    }

    /// Returns the dimension (number of rows) of the state vector.
    pub fn dim(&self) -> usize {
        self.layout.len()
    }

    /// Finds the index of a specific `StateVariable` in the layout.
    pub fn find_idx(&self, var: StateVariable) -> Option<usize> {
        self.layout.iter().position(|v| *v == var)
    }

    pub fn get(&self, var: StateVariable) -> Option<f64> {
        self.find_idx(var).map(|i| self.vector[i])
    }

    pub fn angular_indices(&self) -> Vec<usize> {
        angular_indices(&self.layout, StateVariable::is_angular)
    }

    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(
            self.get(StateVariable::Px).unwrap_or_default(),
            self.get(StateVariable::Py).unwrap_or_default(),
        )
    }

    /// Cartesian velocity `(v cos(yaw), v sin(yaw))`.
    pub fn velocity(&self) -> Vector2<f64> {
        let v = self.get(StateVariable::Speed).unwrap_or_default();
        let yaw = self.get(StateVariable::Yaw).unwrap_or_default();
        Vector2::new(v * yaw.cos(), v * yaw.sin())
    }

    /// The committed values are usable only if nothing is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.vector.iter().all(|v| v.is_finite()) && self.covariance.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::layout::ctrv_state_layout;
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::DMatrix;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_only_yaw_is_angular_in_ctrv_layout() {
        let state = FilterState::new(ctrv_state_layout(), DMatrix::identity(5, 5), 0).unwrap();
        assert_eq!(state.angular_indices(), vec![3]);
    }

    #[test]
    fn test_covariance_must_match_layout() {
        let err = FilterState::new(ctrv_state_layout(), DMatrix::identity(4, 4), 0).unwrap_err();
        assert!(matches!(err, FilterError::InvalidConfig(_)));
    }

    #[test]
    fn test_velocity_follows_heading() {
        let mut state = FilterState::new(ctrv_state_layout(), DMatrix::identity(5, 5), 0).unwrap();
        state.vector[2] = 2.0;
        state.vector[3] = FRAC_PI_2;
        let v = state.velocity();
        assert_abs_diff_eq!(v.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v.y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_nis_is_tracked_per_modality() {
        let mut nis = NisByModality::default();
        nis.set(SensorKind::RangeBearing, 2.5);
        assert_eq!(nis.get(SensorKind::RangeBearing), Some(2.5));
        assert_eq!(nis.get(SensorKind::Position), None);
    }
}
