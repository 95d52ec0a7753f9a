// fusion_core/src/models/estimation/dynamics/ctrv.rs

use nalgebra::{DMatrix, DVector};

use crate::config::{UkfConfig, DEFAULT_YAW_RATE_THRESHOLD};
use crate::models::estimation::dynamics::EstimationDynamics;
use crate::state::layout::{
    ctrv_state_layout, CTRV_AUGMENTED_DIM, CTRV_NOISE_DIM, CTRV_STATE_DIM, NU_ACCEL, NU_YAW_ACCEL,
    PX, PY, SPEED, YAW, YAW_RATE,
};
use crate::state::StateVariable;
use crate::types::State;

/// Constant turn-rate and velocity (CTRV) motion.
///
/// Speed and turn rate are constant between updates; the object moves on a
/// circular arc (or a straight line when the turn rate vanishes). The two
/// process-noise inputs are a longitudinal acceleration `nu_a` and a yaw
/// acceleration `nu_yawdd`, both held constant over `dt`.
#[derive(Debug, Clone, PartialEq)]
pub struct CtrvModel {
    /// Standard deviation of `nu_a` in m/s^2.
    pub accel_noise_stddev: f64,
    /// Standard deviation of `nu_yawdd` in rad/s^2.
    pub yaw_accel_noise_stddev: f64,
    /// Turn rates at or below this magnitude use the straight-line limit.
    /// It guards the removable singularity of `v / yaw_rate`; it is a tuning
    /// knob, not a physical boundary.
    pub yaw_rate_threshold: f64,
}

impl CtrvModel {
    pub fn new(accel_noise_stddev: f64, yaw_accel_noise_stddev: f64) -> Self {
        Self {
            accel_noise_stddev,
            yaw_accel_noise_stddev,
            yaw_rate_threshold: DEFAULT_YAW_RATE_THRESHOLD,
        }
    }

    pub fn from_config(config: &UkfConfig) -> Self {
        Self {
            accel_noise_stddev: config.process_noise.accel_stddev,
            yaw_accel_noise_stddev: config.process_noise.yaw_accel_stddev,
            yaw_rate_threshold: config.yaw_rate_threshold,
        }
    }
}

impl EstimationDynamics for CtrvModel {
    fn get_state_layout(&self) -> Vec<StateVariable> {
        ctrv_state_layout()
    }

    fn get_noise_dim(&self) -> usize {
        CTRV_NOISE_DIM
    }

    fn get_process_noise_covariance(&self) -> DMatrix<f64> {
        DMatrix::from_diagonal(&DVector::from_vec(vec![
            self.accel_noise_stddev.powi(2),
            self.yaw_accel_noise_stddev.powi(2),
        ]))
    }

    fn propagate_augmented(&self, x_aug: &DVector<f64>, dt: f64) -> State {
        debug_assert_eq!(x_aug.nrows(), CTRV_AUGMENTED_DIM);

        // --- Extract from the augmented vector ---
        let p_x = x_aug[PX];
        let p_y = x_aug[PY];
        let v = x_aug[SPEED];
        let yaw = x_aug[YAW];
        let yawd = x_aug[YAW_RATE];
        let nu_a = x_aug[NU_ACCEL];
        let nu_yawdd = x_aug[NU_YAW_ACCEL];

        // --- 1. Deterministic CTRV motion ---
        let (mut px_p, mut py_p) = if yawd.abs() > self.yaw_rate_threshold {
            let yaw_end = yaw + yawd * dt;
            (
                p_x + v / yawd * (yaw_end.sin() - yaw.sin()),
                p_y + v / yawd * (yaw.cos() - yaw_end.cos()),
            )
        } else {
            (p_x + v * dt * yaw.cos(), p_y + v * dt * yaw.sin())
        };
        let mut v_p = v;
        let mut yaw_p = yaw + yawd * dt;
        let mut yawd_p = yawd;

        // --- 2. Additive process noise ---
        let half_dt2 = 0.5 * dt * dt;
        px_p += half_dt2 * nu_a * yaw.cos();
        py_p += half_dt2 * nu_a * yaw.sin();
        v_p += nu_a * dt;
        yaw_p += half_dt2 * nu_yawdd;
        yawd_p += nu_yawdd * dt;

        let mut x_pred = DVector::zeros(CTRV_STATE_DIM);
        x_pred[PX] = px_p;
        x_pred[PY] = py_p;
        x_pred[SPEED] = v_p;
        x_pred[YAW] = yaw_p;
        x_pred[YAW_RATE] = yawd_p;
        x_pred
    }
}
