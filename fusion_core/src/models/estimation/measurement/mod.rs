// fusion_core/src/models/estimation/measurement/mod.rs

use crate::messages::SensorKind;
use crate::state::{angular_indices, MeasurementVariable};
use crate::types::State;
use dyn_clone::DynClone;
use nalgebra::{DMatrix, DVector};
use std::any::Any;
use std::fmt::Debug;

// --- MEASUREMENT MODEL TRAIT ---
// Represents the mathematical model of a sensor. `z = h(x) + v`
pub trait Measurement: DynClone + Debug + Send + Sync {
    /// Which incoming messages this model handles.
    fn kind(&self) -> SensorKind;

    /// Describes the layout of the measurement vector `z` in the SENSOR'S NATIVE FRAME.
    fn get_measurement_layout(&self) -> Vec<MeasurementVariable>;

    fn get_measurement_dim(&self) -> usize {
        self.get_measurement_layout().len()
    }

    /// Indices of `z` whose differences must be wrapped into (-pi, pi].
    fn get_angular_indices(&self) -> Vec<usize> {
        angular_indices(&self.get_measurement_layout(), MeasurementVariable::is_angular)
    }

    /// Returns the measurement noise covariance matrix `R`.
    fn get_r(&self) -> &DMatrix<f64>;

    /// Predicts the ideal measurement `z_pred = h(x)` from one state-space point.
    fn predict_measurement(&self, x: &DVector<f64>) -> DVector<f64>;

    /// Builds a first state estimate from a single measurement. Components the
    /// sensor cannot observe are left at zero.
    fn state_from_measurement(&self, z: &DVector<f64>) -> State;

    fn as_any(&self) -> &dyn Any;
}

// This macro automatically generates the implementation of `Clone` for `Box<dyn Measurement>`.
dyn_clone::clone_trait_object!(Measurement);

pub mod position;
pub mod range_bearing;
