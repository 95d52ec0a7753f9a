// fusion_core/src/models/estimation/dynamics/mod.rs

use crate::state::StateVariable;
use crate::types::State;
use dyn_clone::DynClone;
use nalgebra::{DMatrix, DVector};
use std::fmt::Debug;

/// A trait for process models used within sigma-point estimators.
///
/// The filter never integrates derivatives itself. It hands each augmented
/// sigma point (state followed by the process-noise inputs) to the model and
/// gets back a point in state space, so noise that enters nonlinearly is
/// captured by the same transform as the dynamics.
pub trait EstimationDynamics: DynClone + Debug + Send + Sync {
    /// Returns the complete layout of the state vector for this specific model.
    /// The order of this Vec defines the indices for the state vector `x`.
    fn get_state_layout(&self) -> Vec<StateVariable>;

    /// Returns the total number of states (the length of the state vector `x`).
    fn get_state_dim(&self) -> usize {
        self.get_state_layout().len()
    }

    /// Number of process-noise inputs appended to the state during augmentation.
    fn get_noise_dim(&self) -> usize;

    /// Covariance of the process-noise inputs (`noise_dim x noise_dim`).
    fn get_process_noise_covariance(&self) -> DMatrix<f64>;

    /// Maps one augmented point `[x; nu]` over `dt` seconds to a predicted state.
    ///
    /// # Arguments
    /// * `x_aug`: Augmented vector of length `state_dim + noise_dim`.
    /// * `dt`: Time step in seconds. Zero is allowed and must be an identity map.
    fn propagate_augmented(&self, x_aug: &DVector<f64>, dt: f64) -> State;

    /// Propagates a plain state with every noise input held at zero.
    fn propagate(&self, x: &State, dt: f64) -> State {
        let mut x_aug = DVector::zeros(self.get_state_dim() + self.get_noise_dim());
        x_aug.rows_mut(0, x.nrows()).copy_from(x);
        self.propagate_augmented(&x_aug, dt)
    }
}

// This macro automatically generates the implementation of `Clone` for `Box<dyn EstimationDynamics>`.
dyn_clone::clone_trait_object!(EstimationDynamics);

pub mod ctrv;
