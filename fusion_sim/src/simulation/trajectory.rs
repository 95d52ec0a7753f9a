// fusion_sim/src/simulation/trajectory.rs

use nalgebra::DVector;
use rand_distr::{Distribution, Normal};

use fusion_core::models::estimation::dynamics::ctrv::CtrvModel;
use fusion_core::models::estimation::dynamics::EstimationDynamics;
use fusion_core::utils::angles::normalize_angle;

use crate::simulation::config::TrajectoryConfig;
use crate::simulation::core::prng::SimulationRng;
use crate::simulation::error::ScenarioError;

/// One ground-truth sample: time since the start of the run and the CTRV
/// state `[px, py, v, yaw, yaw_rate]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruthSample {
    pub time_seconds: f64,
    pub state: [f64; 5],
}

/// Generates a ground-truth trajectory.
///
/// Over every step the longitudinal and yaw accelerations are held at values
/// drawn from zero-mean normals, and the state is advanced with the same CTRV
/// map the filter uses. A filter tuned with the same standard deviations, and
/// fed measurements on these samples, therefore sees exactly its own process
/// model.
pub fn generate_trajectory(
    config: &TrajectoryConfig,
    rng: &mut SimulationRng,
) -> Result<Vec<TruthSample>, ScenarioError> {
    let accel_dist = normal(config.accel_noise_stddev, "trajectory.accel_noise_stddev")?;
    let yaw_accel_dist = normal(
        config.yaw_accel_noise_stddev,
        "trajectory.yaw_accel_noise_stddev",
    )?;

    let model = CtrvModel::new(config.accel_noise_stddev, config.yaw_accel_noise_stddev);
    let dt = config.step_seconds;
    // The epsilon keeps e.g. 25 s / 0.05 s from flooring to 499.
    let steps = (config.duration_seconds / dt + 1e-9).floor() as usize;

    let mut samples = Vec::with_capacity(steps + 1);
    let mut state = config.initial;
    samples.push(TruthSample {
        time_seconds: 0.0,
        state,
    });

    for k in 1..=steps {
        let nu_a = accel_dist.sample(&mut rng.0);
        let nu_yawdd = yaw_accel_dist.sample(&mut rng.0);
        let x_aug = DVector::from_vec(vec![
            state[0], state[1], state[2], state[3], state[4], nu_a, nu_yawdd,
        ]);
        let next = model.propagate_augmented(&x_aug, dt);

        state = [next[0], next[1], next[2], normalize_angle(next[3]), next[4]];
        samples.push(TruthSample {
            time_seconds: k as f64 * dt,
            state,
        });
    }
    Ok(samples)
}

pub(crate) fn normal(stddev: f64, name: &str) -> Result<Normal<f64>, ScenarioError> {
    Normal::new(0.0, stddev)
        .map_err(|e| ScenarioError::Invalid(format!("{name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_noise_free_trajectory_is_a_circle() {
        let config = TrajectoryConfig {
            initial: [0.0, 0.0, 2.0, 0.0, 0.5],
            duration_seconds: 1.0,
            step_seconds: 0.1,
            accel_noise_stddev: 0.0,
            yaw_accel_noise_stddev: 0.0,
        };
        let samples = generate_trajectory(&config, &mut SimulationRng::new(Some(1))).unwrap();
        assert_eq!(samples.len(), 11);

        // Centre of the turn is at (0, v / yaw_rate) = (0, 4).
        for sample in &samples {
            let [px, py, v, _, yaw_rate] = sample.state;
            assert_abs_diff_eq!((px * px + (py - 4.0).powi(2)).sqrt(), 4.0, epsilon = 1e-9);
            assert_eq!(v, 2.0);
            assert_eq!(yaw_rate, 0.5);
        }
        assert_abs_diff_eq!(samples[10].time_seconds, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let config = TrajectoryConfig::default();
        let a = generate_trajectory(&config, &mut SimulationRng::new(Some(5))).unwrap();
        let b = generate_trajectory(&config, &mut SimulationRng::new(Some(5))).unwrap();
        let c = generate_trajectory(&config, &mut SimulationRng::new(Some(6))).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.iter().all(|s| s.state[3] > -std::f64::consts::PI && s.state[3] <= std::f64::consts::PI));
    }
}
