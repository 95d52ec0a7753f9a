// fusion_core/src/models/estimation/measurement/position.rs

use std::any::Any;

use crate::config::PositionSensorConfig;
use crate::messages::SensorKind;
use crate::models::estimation::measurement::Measurement;
use crate::state::layout::{CTRV_STATE_DIM, PX, PY};
use crate::state::MeasurementVariable;
use crate::types::State;
use nalgebra::{DMatrix, DVector};

/// A Cartesian position sensor (lidar-like). The measurement is a direct,
/// linear read-out of the first two state components.
#[derive(Debug, Clone)] // Make sure it's cloneable for the dyn-clone
pub struct PositionSensorModel {
    // The R matrix for this sensor
    pub noise_covariance: DMatrix<f64>,
}

impl PositionSensorModel {
    pub fn new(config: &PositionSensorConfig) -> Self {
        Self {
            noise_covariance: config.noise_covariance(),
        }
    }
}

impl Measurement for PositionSensorModel {
    fn kind(&self) -> SensorKind {
        SensorKind::Position
    }

    fn get_measurement_layout(&self) -> Vec<MeasurementVariable> {
        vec![MeasurementVariable::Px, MeasurementVariable::Py]
    }

    fn get_r(&self) -> &DMatrix<f64> {
        &self.noise_covariance
    }

    fn predict_measurement(&self, x: &DVector<f64>) -> DVector<f64> {
        DVector::from_vec(vec![x[PX], x[PY]])
    }

    fn state_from_measurement(&self, z: &DVector<f64>) -> State {
        let mut x = DVector::zeros(CTRV_STATE_DIM);
        x[PX] = z[0];
        x[PY] = z[1];
        x
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
