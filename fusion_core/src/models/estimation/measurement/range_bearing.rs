// fusion_core/src/models/estimation/measurement/range_bearing.rs

use std::any::Any;

use crate::config::{RangeBearingSensorConfig, DEFAULT_MIN_RANGE};
use crate::messages::SensorKind;
use crate::models::estimation::measurement::Measurement;
use crate::state::layout::{CTRV_STATE_DIM, PX, PY, SPEED, YAW};
use crate::state::MeasurementVariable;
use crate::types::State;
use nalgebra::{DMatrix, DVector};

/// A polar sensor (radar-like) measuring range, bearing and range rate of
/// the target as seen from the origin.
///
/// The bearing is an angle; it is marked as such in the measurement layout so
/// the update wraps every difference taken on it.
#[derive(Debug, Clone)]
pub struct RangeBearingModel {
    /// The 3x3 measurement noise covariance matrix, R.
    pub r_matrix: DMatrix<f64>,
    /// Floor on the range used as the range-rate denominator. A target at the
    /// origin has an undefined range rate; clamping keeps the output finite.
    pub min_range: f64,
}

impl RangeBearingModel {
    pub fn new(config: &RangeBearingSensorConfig) -> Self {
        Self {
            r_matrix: config.noise_covariance(),
            min_range: DEFAULT_MIN_RANGE,
        }
    }

    pub fn with_min_range(mut self, min_range: f64) -> Self {
        self.min_range = min_range;
        self
    }
}

impl Measurement for RangeBearingModel {
    fn kind(&self) -> SensorKind {
        SensorKind::RangeBearing
    }

    fn get_measurement_layout(&self) -> Vec<MeasurementVariable> {
        vec![
            MeasurementVariable::Range,
            MeasurementVariable::Bearing,
            MeasurementVariable::RangeRate,
        ]
    }

    fn get_r(&self) -> &DMatrix<f64> {
        &self.r_matrix
    }

    fn predict_measurement(&self, x: &DVector<f64>) -> DVector<f64> {
        let p_x = x[PX];
        let p_y = x[PY];
        let v = x[SPEED];
        let yaw = x[YAW];
        let vx = v * yaw.cos();
        let vy = v * yaw.sin();

        let range = p_x.hypot(p_y);
        let bearing = p_y.atan2(p_x);
        let range_rate = (p_x * vx + p_y * vy) / range.max(self.min_range);

        DVector::from_vec(vec![range, bearing, range_rate])
    }

    fn state_from_measurement(&self, z: &DVector<f64>) -> State {
        let (range, bearing, range_rate) = (z[0], z[1], z[2]);

        // The radial velocity says nothing about the tangential one, so the
        // best first guess of the speed magnitude is |range_rate|.
        let vx = range_rate * bearing.cos();
        let vy = range_rate * bearing.sin();

        let mut x = DVector::zeros(CTRV_STATE_DIM);
        x[PX] = range * bearing.cos();
        x[PY] = range * bearing.sin();
        x[SPEED] = vx.hypot(vy);
        x
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
