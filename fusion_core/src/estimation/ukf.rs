// fusion_core/src/estimation/ukf.rs

use nalgebra::{Cholesky, DMatrix, DVector};

use crate::error::FilterError;
use crate::estimation::sigma_points::augmented_sigma_points;
use crate::models::estimation::dynamics::EstimationDynamics;
use crate::models::estimation::measurement::Measurement;
use crate::state::FilterState;
use crate::utils::angles::{normalize_components, weighted_mean};
use crate::utils::linalg;

/// A container for parameters needed by the UKF prediction step.
pub struct UkfPredictParams<'a> {
    pub dynamics: &'a dyn EstimationDynamics,
    /// Covariance of the process-noise inputs, see
    /// `EstimationDynamics::get_process_noise_covariance`.
    pub process_noise_q: &'a DMatrix<f64>,
}

/// A container for parameters needed by the UKF update step.
pub struct UkfMeasurementParams<'a> {
    pub model: &'a dyn Measurement,
    pub z: &'a DVector<f64>,
    /// Innovation covariances with a larger condition number are rejected.
    pub max_condition_number: f64,
}

/// The predicted Gaussian together with the propagated sigma points it was
/// reconstructed from. The update reuses the same points.
#[derive(Debug, Clone)]
pub struct Prediction {
    /// Predicted mean and covariance. The timestamp is still the one of the
    /// input state; the caller stamps it when committing.
    pub state: FilterState,
    /// `state_dim x (2 n_aug + 1)` propagated sigma points.
    pub sigma_points: DMatrix<f64>,
    pub weights: DVector<f64>,
}

/// The output of one measurement update.
#[derive(Debug, Clone)]
pub struct Correction {
    /// Corrected state with the NIS of this update recorded for the sensor.
    pub state: FilterState,
    pub nis: f64,
    /// `y = z - z_pred`, angular components wrapped.
    pub innovation: DVector<f64>,
    pub innovation_covariance: DMatrix<f64>,
    /// State/measurement cross covariance `Tc`.
    pub cross_covariance: DMatrix<f64>,
    pub predicted_measurement: DVector<f64>,
}

/// PURE FUNCTION: Performs one UKF prediction step over `dt` seconds.
///
/// The state is augmented with the process-noise inputs, one sigma set is
/// drawn from the augmented Gaussian, and every column is pushed through the
/// nonlinear dynamics. Mean and covariance are recovered with the sigma
/// weights. Headings are averaged on the unit circle and angular differences
/// are wrapped before the outer products.
pub fn ukf_predict(
    current_state: &FilterState,
    params: &UkfPredictParams,
    dt: f64,
) -> Result<Prediction, FilterError> {
    let n_x = current_state.dim();

    // --- 1. Generate augmented sigma points ---
    let sigma = augmented_sigma_points(
        &current_state.vector,
        &current_state.covariance,
        params.process_noise_q,
    )?;
    let n_sig = sigma.count();

    // --- 2. Propagate each point through the NON-LINEAR dynamics model ---
    let mut propagated = DMatrix::zeros(n_x, n_sig);
    for i in 0..n_sig {
        let point = sigma.points.column(i).into_owned();
        let x_next = params.dynamics.propagate_augmented(&point, dt);
        propagated.column_mut(i).copy_from(&x_next);
    }

    // --- 3. Recover the predicted mean and covariance ---
    let angular = current_state.angular_indices();
    let x_pred = weighted_mean(&propagated, &sigma.weights, &angular);

    let mut p_pred = DMatrix::zeros(n_x, n_x);
    for i in 0..n_sig {
        let mut diff = propagated.column(i) - &x_pred;
        normalize_components(&mut diff, &angular);
        p_pred += sigma.weights[i] * &diff * diff.transpose();
    }
    let p_pred = linalg::symmetrize(&p_pred);

    if x_pred.iter().any(|v| !v.is_finite()) || !linalg::is_finite(&p_pred) {
        return Err(FilterError::NonFinite { stage: "prediction" });
    }

    Ok(Prediction {
        state: FilterState {
            layout: current_state.layout.clone(),
            vector: x_pred,
            covariance: p_pred,
            last_update_timestamp: current_state.last_update_timestamp,
            nis: current_state.nis,
        },
        sigma_points: propagated,
        weights: sigma.weights,
    })
}

/// PURE FUNCTION: Performs one UKF measurement update step.
///
/// Written once against the `Measurement` trait, so every sensor modality
/// goes through the same arithmetic. Angular components of both the state
/// and the measurement are wrapped wherever a difference is taken.
pub fn ukf_update(
    prediction: &Prediction,
    params: &UkfMeasurementParams,
) -> Result<Correction, FilterError> {
    let model = params.model;
    let sensor = model.kind();
    let n_z = model.get_measurement_dim();
    if params.z.nrows() != n_z {
        return Err(FilterError::DimensionMismatch {
            sensor,
            expected: n_z,
            received: params.z.nrows(),
        });
    }

    let x_pred = &prediction.state.vector;
    let p_pred = &prediction.state.covariance;
    let sigma_points = &prediction.sigma_points;
    let weights = &prediction.weights;
    let n_sig = sigma_points.ncols();
    let state_angular = prediction.state.angular_indices();
    let meas_angular = model.get_angular_indices();

    // --- 1. Transform the sigma points into measurement space ---
    let mut z_sig = DMatrix::zeros(n_z, n_sig);
    for i in 0..n_sig {
        let point = sigma_points.column(i).into_owned();
        z_sig.column_mut(i).copy_from(&model.predict_measurement(&point));
    }

    // --- 2. Predicted measurement, innovation and cross covariances ---
    let z_pred = weighted_mean(&z_sig, weights, &meas_angular);

    let mut s_cov = DMatrix::zeros(n_z, n_z);
    let mut t_cov = DMatrix::zeros(x_pred.nrows(), n_z);
    for i in 0..n_sig {
        let mut z_diff = z_sig.column(i) - &z_pred;
        normalize_components(&mut z_diff, &meas_angular);

        let mut x_diff = sigma_points.column(i) - x_pred;
        normalize_components(&mut x_diff, &state_angular);

        s_cov += weights[i] * &z_diff * z_diff.transpose();
        t_cov += weights[i] * &x_diff * z_diff.transpose();
    }
    s_cov += model.get_r();
    let s_cov = linalg::symmetrize(&s_cov);

    if !linalg::is_finite(&s_cov) || !linalg::is_finite(&t_cov) {
        return Err(FilterError::NonFinite {
            stage: "innovation covariance",
        });
    }

    // --- 3. Check S before inverting it ---
    let s_chol = Cholesky::new(s_cov.clone()).ok_or(FilterError::NotPositiveDefinite {
        stage: "innovation covariance",
    })?;
    let condition_number = linalg::condition_number(&s_cov);
    if condition_number > params.max_condition_number {
        return Err(FilterError::IllConditioned {
            condition_number,
            limit: params.max_condition_number,
        });
    }
    let s_inv = s_chol.inverse();

    // --- 4. Kalman gain, innovation and NIS ---
    let k_gain = &t_cov * &s_inv;

    let mut innovation = params.z - &z_pred;
    normalize_components(&mut innovation, &meas_angular);

    let nis = innovation.dot(&(&s_inv * &innovation));

    // --- 5. Update state and covariance ---
    let mut new_x = x_pred + &k_gain * &innovation;
    normalize_components(&mut new_x, &state_angular);
    let new_p = linalg::symmetrize(&(p_pred - &k_gain * &s_cov * k_gain.transpose()));

    if !nis.is_finite() || new_x.iter().any(|v| !v.is_finite()) || !linalg::is_finite(&new_p) {
        return Err(FilterError::NonFinite { stage: "update" });
    }

    let mut nis_by_modality = prediction.state.nis;
    nis_by_modality.set(sensor, nis);

    Ok(Correction {
        state: FilterState {
            layout: prediction.state.layout.clone(),
            vector: new_x,
            covariance: new_p,
            last_update_timestamp: prediction.state.last_update_timestamp,
            nis: nis_by_modality,
        },
        nis,
        innovation,
        innovation_covariance: s_cov,
        cross_covariance: t_cov,
        predicted_measurement: z_pred,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PositionSensorConfig, RangeBearingSensorConfig};
    use crate::models::estimation::dynamics::ctrv::CtrvModel;
    use crate::models::estimation::measurement::position::PositionSensorModel;
    use crate::models::estimation::measurement::range_bearing::RangeBearingModel;
    use crate::state::layout::{ctrv_state_layout, PX, PY, SPEED, YAW};
    use crate::utils::angles::normalize_angle;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn state(x: [f64; 5], p_diag: [f64; 5]) -> FilterState {
        let mut s = FilterState::new(
            ctrv_state_layout(),
            DMatrix::from_diagonal(&DVector::from_column_slice(&p_diag)),
            0,
        )
        .unwrap();
        s.vector = DVector::from_column_slice(&x);
        s
    }

    fn predict(s: &FilterState, dt: f64) -> Prediction {
        let model = CtrvModel::new(2.0, 0.5);
        let q = model.get_process_noise_covariance();
        let params = UkfPredictParams {
            dynamics: &model,
            process_noise_q: &q,
        };
        ukf_predict(s, &params, dt).unwrap()
    }

    #[test]
    fn test_zero_dt_prediction_is_identity() {
        let s = state([1.0, 2.0, 3.0, 0.5, 0.1], [0.15, 0.15, 1.0, 1.0, 1.0]);
        let prediction = predict(&s, 0.0);
        assert_abs_diff_eq!(prediction.state.vector, s.vector, epsilon = 1e-9);
        assert_abs_diff_eq!(prediction.state.covariance, s.covariance, epsilon = 1e-9);
    }

    #[test]
    fn test_predicted_mean_follows_noise_free_motion() {
        // With a (nearly) certain heading and turn rate the map is linear over
        // the spread, and the noise columns cancel pairwise.
        let s = state([1.0, 2.0, 4.0, 0.3, 0.2], [0.5, 0.5, 1.0, 1e-12, 1e-12]);
        let dt = 0.1;
        let prediction = predict(&s, dt);
        let expected = CtrvModel::new(2.0, 0.5).propagate(&s.vector, dt);
        assert_abs_diff_eq!(prediction.state.vector, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_central_sigma_point_is_noise_free_propagation() {
        let s = state([1.0, 2.0, 4.0, 0.3, 0.2], [0.15, 0.15, 1.0, 1.0, 1.0]);
        let prediction = predict(&s, 0.25);
        let expected = CtrvModel::new(2.0, 0.5).propagate(&s.vector, 0.25);
        assert_abs_diff_eq!(
            prediction.sigma_points.column(0).into_owned(),
            expected,
            epsilon = 1e-12
        );
        assert_eq!(prediction.sigma_points.shape(), (5, 15));
    }

    #[test]
    fn test_prediction_grows_uncertainty() {
        let s = state([0.0, 0.0, 5.0, 0.0, 0.0], [0.15, 0.15, 1.0, 1.0, 1.0]);
        let prediction = predict(&s, 0.1);
        assert!(prediction.state.covariance[(PX, PX)] > s.covariance[(PX, PX)]);
        assert!(prediction.state.covariance[(SPEED, SPEED)] > s.covariance[(SPEED, SPEED)]);
    }

    #[test]
    fn test_position_update_pulls_towards_measurement() {
        let s = state([1.0, 1.0, 0.0, 0.0, 0.0], [0.15, 0.15, 1.0, 1.0, 1.0]);
        let prediction = predict(&s, 0.1);
        let model = PositionSensorModel::new(&PositionSensorConfig::default());
        let z = DVector::from_vec(vec![1.1, 1.02]);
        let correction = ukf_update(
            &prediction,
            &UkfMeasurementParams {
                model: &model,
                z: &z,
                max_condition_number: 1e12,
            },
        )
        .unwrap();

        let x = &correction.state.vector;
        assert!(x[PX] > 1.0 && x[PX] < 1.1);
        assert!(x[PY] > 1.0 && x[PY] < 1.02);
        assert!(correction.nis >= 0.0);
        assert_eq!(correction.state.nis.position, Some(correction.nis));
        assert!(correction.state.covariance[(PX, PX)] < prediction.state.covariance[(PX, PX)]);
        assert_eq!(linalg::asymmetry(&correction.state.covariance), 0.0);
    }

    #[test]
    fn test_bearing_innovation_is_wrapped() {
        // Target just across the -x axis: predicted bearing near +pi, measured near -pi.
        let s = state([-5.0, 0.2, 0.0, 0.0, 0.0], [0.001, 0.001, 0.1, 0.1, 0.1]);
        let prediction = predict(&s, 0.0);
        let model = RangeBearingModel::new(&RangeBearingSensorConfig::default());
        let z = DVector::from_vec(vec![5.0, -PI + 0.02, 0.0]);
        let correction = ukf_update(
            &prediction,
            &UkfMeasurementParams {
                model: &model,
                z: &z,
                max_condition_number: 1e12,
            },
        )
        .unwrap();

        assert!(correction.innovation[1].abs() < 0.1);
        assert!(correction.nis < 10.0);
        assert!(correction.state.vector[YAW] > -PI && correction.state.vector[YAW] <= PI);
    }

    /// Covariance rebuilt column by column with wrapped differences.
    fn wrapped_covariance(
        a: &DMatrix<f64>,
        a_mean: &DVector<f64>,
        a_angular: &[usize],
        b: &DMatrix<f64>,
        b_mean: &DVector<f64>,
        b_angular: &[usize],
        weights: &DVector<f64>,
    ) -> DMatrix<f64> {
        let mut cov = DMatrix::zeros(a.nrows(), b.nrows());
        for i in 0..a.ncols() {
            let mut da = a.column(i) - a_mean;
            let mut db = b.column(i) - b_mean;
            for &k in a_angular {
                da[k] = normalize_angle(da[k]);
            }
            for &k in b_angular {
                db[k] = normalize_angle(db[k]);
            }
            cov += weights[i] * &da * db.transpose();
        }
        cov
    }

    #[test]
    fn test_heading_spread_across_pi_keeps_covariance_wrapped() {
        // Yaw sigma points at (pi - 0.05) +- sqrt(12) land on both sides of the branch cut.
        let yaw = PI - 0.05;
        let s = state([1.0, 1.0, 1.0, yaw, 0.0], [0.01, 0.01, 0.01, 4.0, 0.01]);
        let prediction = predict(&s, 0.1);
        let mean = &prediction.state.vector;
        let p = &prediction.state.covariance;

        assert_abs_diff_eq!(normalize_angle(mean[YAW] - yaw), 0.0, epsilon = 1e-6);
        assert!(mean[YAW] > -PI && mean[YAW] <= PI);

        let reference = wrapped_covariance(
            &prediction.sigma_points,
            mean,
            &[YAW],
            &prediction.sigma_points,
            mean,
            &[YAW],
            &prediction.weights,
        );
        assert!(linalg::is_finite(p));
        assert_abs_diff_eq!(p, &reference, epsilon = 1e-9);

        // The two yaw columns sit 2 pi - sqrt(12) from the mean once wrapped;
        // without wrapping the variance would come back as the prior 4.0.
        let wrapped_offset = 2.0 * PI - 12.0_f64.sqrt();
        assert_abs_diff_eq!(p[(YAW, YAW)], wrapped_offset.powi(2) / 3.0, epsilon = 0.01);
        assert!(p[(YAW, YAW)] < 3.0);
        assert_eq!(linalg::asymmetry(p), 0.0);
    }

    #[test]
    fn test_bearing_spread_across_pi_keeps_innovation_covariance_wrapped() {
        // Target on the -x axis with a wide lateral spread: sigma bearings
        // fall on both sides of +-pi around a true mean of pi.
        let s = state([-5.0, 0.0, 1.0, 0.0, 0.0], [0.01, 0.5, 0.01, 0.01, 0.01]);
        let prediction = predict(&s, 0.0);
        let model = RangeBearingModel::new(&RangeBearingSensorConfig::default());
        let z = DVector::from_vec(vec![5.0, -PI + 0.01, -1.0]);
        let correction = ukf_update(
            &prediction,
            &UkfMeasurementParams {
                model: &model,
                z: &z,
                max_condition_number: 1e12,
            },
        )
        .unwrap();

        let z_pred = &correction.predicted_measurement;
        assert_abs_diff_eq!(normalize_angle(z_pred[1] - PI), 0.0, epsilon = 1e-9);

        // The py columns sit at bearing +-(pi - b); wrapped, each is b away from pi.
        let b = 1.5_f64.sqrt().atan2(5.0);
        let s_cov = &correction.innovation_covariance;
        let t_cov = &correction.cross_covariance;
        assert_abs_diff_eq!(s_cov[(1, 1)], b * b / 3.0 + model.get_r()[(1, 1)], epsilon = 1e-9);
        assert!(s_cov[(1, 1)] < 0.1);
        assert_abs_diff_eq!(t_cov[(PY, 1)], -1.5_f64.sqrt() * b / 3.0, epsilon = 1e-9);

        let mut z_sig = DMatrix::zeros(3, prediction.sigma_points.ncols());
        for i in 0..z_sig.ncols() {
            let point = prediction.sigma_points.column(i).into_owned();
            z_sig.column_mut(i).copy_from(&model.predict_measurement(&point));
        }
        let s_reference = wrapped_covariance(
            &z_sig,
            z_pred,
            &[1],
            &z_sig,
            z_pred,
            &[1],
            &prediction.weights,
        ) + model.get_r();
        let t_reference = wrapped_covariance(
            &prediction.sigma_points,
            &prediction.state.vector,
            &[YAW],
            &z_sig,
            z_pred,
            &[1],
            &prediction.weights,
        );
        assert_abs_diff_eq!(s_cov, &s_reference, epsilon = 1e-9);
        assert_abs_diff_eq!(t_cov, &t_reference, epsilon = 1e-9);

        assert_abs_diff_eq!(correction.innovation[1], 0.01, epsilon = 1e-9);
        assert!(correction.nis.is_finite() && correction.nis < 5.0);
        assert!(correction.state.is_finite());
    }

    #[test]
    fn test_target_at_origin_gives_finite_update() {
        let s = state([0.0, 0.0, 0.0, 0.0, 0.0], [1e-8, 1e-8, 1.0, 1.0, 1.0]);
        let prediction = predict(&s, 0.0);
        let model = RangeBearingModel::new(&RangeBearingSensorConfig::default());
        let z = DVector::from_vec(vec![0.01, 0.3, 0.0]);
        let correction = ukf_update(
            &prediction,
            &UkfMeasurementParams {
                model: &model,
                z: &z,
                max_condition_number: 1e12,
            },
        )
        .unwrap();
        assert!(correction.state.is_finite());
        assert!(correction.nis.is_finite());
    }

    #[test]
    fn test_wrong_measurement_length_is_rejected() {
        let s = state([1.0, 1.0, 0.0, 0.0, 0.0], [0.15, 0.15, 1.0, 1.0, 1.0]);
        let prediction = predict(&s, 0.1);
        let model = PositionSensorModel::new(&PositionSensorConfig::default());
        let z = DVector::from_vec(vec![1.0, 1.0, 1.0]);
        let err = ukf_update(
            &prediction,
            &UkfMeasurementParams {
                model: &model,
                z: &z,
                max_condition_number: 1e12,
            },
        )
        .unwrap_err();
        assert!(err.is_precondition_violation());
    }

    #[test]
    fn test_condition_limit_is_enforced() {
        let s = state([1.0, 1.0, 0.0, 0.0, 0.0], [0.15, 0.15, 1.0, 1.0, 1.0]);
        let prediction = predict(&s, 0.1);
        let model = RangeBearingModel::new(&RangeBearingSensorConfig::default());
        let z = DVector::from_vec(vec![1.4, 0.78, 0.0]);
        let err = ukf_update(
            &prediction,
            &UkfMeasurementParams {
                model: &model,
                z: &z,
                max_condition_number: 1.0,
            },
        )
        .unwrap_err();
        assert!(matches!(err, FilterError::IllConditioned { .. }));
    }

    #[test]
    fn test_non_positive_definite_prior_fails_prediction() {
        let mut s = state([1.0, 1.0, 0.0, 0.0, 0.0], [0.15, 0.15, 1.0, 1.0, 1.0]);
        s.covariance[(2, 2)] = -1.0;
        let model = CtrvModel::new(2.0, 0.5);
        let q = model.get_process_noise_covariance();
        let err = ukf_predict(
            &s,
            &UkfPredictParams {
                dynamics: &model,
                process_noise_q: &q,
            },
            0.1,
        )
        .unwrap_err();
        assert!(matches!(err, FilterError::NotPositiveDefinite { .. }));
    }
}
