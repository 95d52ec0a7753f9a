// fusion_sim/src/simulation/sensors.rs

use nalgebra::DVector;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use fusion_core::config::{PositionSensorConfig, RangeBearingSensorConfig};
use fusion_core::messages::MeasurementMessage;
use fusion_core::models::estimation::measurement::position::PositionSensorModel;
use fusion_core::models::estimation::measurement::range_bearing::RangeBearingModel;
use fusion_core::models::estimation::measurement::Measurement;
use fusion_core::types::Timestamp;
use fusion_core::utils::angles::normalize_angle;

use crate::simulation::config::{PositionSimConfig, RangeBearingSimConfig, SensorSimConfig};
use crate::simulation::core::prng::SimulationRng;
use crate::simulation::core::records::{GroundTruth, LogRecord};
use crate::simulation::error::ScenarioError;
use crate::simulation::trajectory::{normal, TruthSample};

// =========================================================================
// == Simulated Sensors ==
// =========================================================================

/// Number of ground-truth samples between two readings of a sensor at
/// `rate_hz`. The truth grid must divide the sensor period exactly, otherwise
/// the effective rate would differ from the configured one.
pub(crate) fn sample_stride(
    name: &str,
    rate_hz: f64,
    step_seconds: f64,
) -> Result<usize, ScenarioError> {
    let ratio = 1.0 / (rate_hz * step_seconds);
    if !ratio.is_finite() || ratio < 1.0 - 1e-9 || (ratio - ratio.round()).abs() > 1e-6 {
        let max_rate = 1.0 / step_seconds;
        return Err(ScenarioError::Invalid(format!(
            "sensors.{name}.rate_hz = {rate_hz} is not reachable on a {step_seconds} s truth grid; \
             use {max_rate} Hz divided by a whole number"
        )));
    }
    Ok(ratio.round() as usize)
}

/// A sensor fires on every `stride`-th ground-truth sample, starting at `offset`.
#[derive(Debug, Clone, Copy)]
struct Schedule {
    stride: usize,
    offset: usize,
}

impl Schedule {
    fn new(
        name: &str,
        rate_hz: f64,
        step_seconds: f64,
        offset: usize,
    ) -> Result<Self, ScenarioError> {
        let stride = sample_stride(name, rate_hz, step_seconds)?;
        debug!("{} sensor fires every {} truth samples ({} Hz)", name, stride, rate_hz);
        Ok(Self {
            stride,
            offset: offset % stride,
        })
    }

    fn fires(&self, k: usize) -> bool {
        k >= self.offset && (k - self.offset) % self.stride == 0
    }
}

/// Lidar-like sensor: the true position plus independent Gaussian noise.
struct PositionSensor {
    model: PositionSensorModel,
    noise: [Normal<f64>; 2],
    schedule: Schedule,
}

impl PositionSensor {
    fn new(config: &PositionSimConfig, step_seconds: f64) -> Result<Self, ScenarioError> {
        Ok(Self {
            model: PositionSensorModel::new(&PositionSensorConfig {
                px_stddev: config.px_stddev,
                py_stddev: config.py_stddev,
            }),
            noise: [
                normal(config.px_stddev, "sensors.position.px_stddev")?,
                normal(config.py_stddev, "sensors.position.py_stddev")?,
            ],
            schedule: Schedule::new("position", config.rate_hz, step_seconds, 0)?,
        })
    }

    fn measure(&self, x: &DVector<f64>, timestamp: Timestamp, rng: &mut SimulationRng) -> MeasurementMessage {
        let z = self.model.predict_measurement(x);
        MeasurementMessage::position(
            z[0] + self.noise[0].sample(&mut rng.0),
            z[1] + self.noise[1].sample(&mut rng.0),
            timestamp,
        )
    }
}

/// Radar-like sensor: the true range, bearing and range rate plus
/// independent Gaussian noise. The noisy bearing is wrapped into (-pi, pi].
struct RangeBearingSensor {
    model: RangeBearingModel,
    noise: [Normal<f64>; 3],
    schedule: Schedule,
}

impl RangeBearingSensor {
    fn new(config: &RangeBearingSimConfig, step_seconds: f64, offset: usize) -> Result<Self, ScenarioError> {
        Ok(Self {
            model: RangeBearingModel::new(&RangeBearingSensorConfig {
                range_stddev: config.range_stddev,
                bearing_stddev: config.bearing_stddev,
                range_rate_stddev: config.range_rate_stddev,
            }),
            noise: [
                normal(config.range_stddev, "sensors.range_bearing.range_stddev")?,
                normal(config.bearing_stddev, "sensors.range_bearing.bearing_stddev")?,
                normal(config.range_rate_stddev, "sensors.range_bearing.range_rate_stddev")?,
            ],
            schedule: Schedule::new("range_bearing", config.rate_hz, step_seconds, offset)?,
        })
    }

    fn measure(&self, x: &DVector<f64>, timestamp: Timestamp, rng: &mut SimulationRng) -> MeasurementMessage {
        let z = self.model.predict_measurement(x);
        MeasurementMessage::range_bearing(
            z[0] + self.noise[0].sample(&mut rng.0),
            normalize_angle(z[1] + self.noise[1].sample(&mut rng.0)),
            z[2] + self.noise[2].sample(&mut rng.0),
            timestamp,
        )
    }
}

// =========================================================================
// == Measurement Synthesis ==
// =========================================================================

/// Samples every enabled sensor along a ground-truth trajectory.
///
/// Records come out in timestamp order, each carrying the truth it was
/// generated from. When both sensors run at the same rate, the range/bearing
/// sensor is shifted by half a period so the two interleave.
pub fn synthesize_measurements(
    truth: &[TruthSample],
    config: &SensorSimConfig,
    step_seconds: f64,
    start_timestamp: Timestamp,
    rng: &mut SimulationRng,
) -> Result<Vec<LogRecord>, ScenarioError> {
    let position = if config.position.enabled {
        Some(PositionSensor::new(&config.position, step_seconds)?)
    } else {
        None
    };
    let range_bearing = if config.range_bearing.enabled {
        let offset = position.as_ref().map_or(0, |p| p.schedule.stride / 2);
        Some(RangeBearingSensor::new(&config.range_bearing, step_seconds, offset)?)
    } else {
        None
    };

    let mut records = Vec::new();
    for (k, sample) in truth.iter().enumerate() {
        let timestamp = start_timestamp + (sample.time_seconds * 1e6).round() as Timestamp;
        let x = DVector::from_column_slice(&sample.state);
        let ground_truth = Some(GroundTruth::from_ctrv(&sample.state));

        if let Some(sensor) = position.as_ref().filter(|s| s.schedule.fires(k)) {
            records.push(LogRecord {
                message: sensor.measure(&x, timestamp, rng),
                ground_truth,
            });
        }
        if let Some(sensor) = range_bearing.as_ref().filter(|s| s.schedule.fires(k)) {
            records.push(LogRecord {
                message: sensor.measure(&x, timestamp, rng),
                ground_truth,
            });
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::config::TrajectoryConfig;
    use crate::simulation::trajectory::generate_trajectory;
    use fusion_core::messages::{MeasurementData, SensorKind};

    fn truth() -> Vec<TruthSample> {
        generate_trajectory(&TrajectoryConfig::default(), &mut SimulationRng::new(Some(3))).unwrap()
    }

    #[test]
    fn test_sensors_interleave_in_time_order() {
        let truth = truth();
        let records = synthesize_measurements(
            &truth,
            &SensorSimConfig::default(),
            0.05,
            1_000,
            &mut SimulationRng::new(Some(3)),
        )
        .unwrap();

        // 10 Hz each on a 20 Hz truth grid: one measurement per sample, alternating.
        assert_eq!(records.len(), truth.len());
        assert_eq!(records[0].message.kind(), SensorKind::Position);
        assert_eq!(records[1].message.kind(), SensorKind::RangeBearing);
        assert_eq!(records[0].message.timestamp, 1_000);
        assert_eq!(records[1].message.timestamp, 51_000);
        assert!(records
            .windows(2)
            .all(|w| w[0].message.timestamp <= w[1].message.timestamp));
        assert!(records.iter().all(|r| r.ground_truth.is_some()));
    }

    #[test]
    fn test_disabled_sensor_produces_nothing() {
        let mut config = SensorSimConfig::default();
        config.position.enabled = false;
        let records =
            synthesize_measurements(&truth(), &config, 0.05, 0, &mut SimulationRng::new(Some(3)))
                .unwrap();
        assert!(records
            .iter()
            .all(|r| r.message.kind() == SensorKind::RangeBearing));
    }

    #[test]
    fn test_zero_noise_reproduces_truth() {
        let mut config = SensorSimConfig::default();
        config.position.px_stddev = 0.0;
        config.position.py_stddev = 0.0;
        config.range_bearing.range_stddev = 0.0;
        config.range_bearing.bearing_stddev = 0.0;
        config.range_bearing.range_rate_stddev = 0.0;

        let records =
            synthesize_measurements(&truth(), &config, 0.05, 0, &mut SimulationRng::new(Some(3)))
                .unwrap();
        for record in &records {
            let gt = record.ground_truth.unwrap();
            match &record.message.data {
                MeasurementData::Position(z) => {
                    assert_eq!(z.x, gt.px);
                    assert_eq!(z.y, gt.py);
                }
                MeasurementData::RangeBearing(z) => {
                    assert!((z.x - gt.px.hypot(gt.py)).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_stride_must_divide_the_truth_grid() {
        assert_eq!(sample_stride("position", 10.0, 0.05).unwrap(), 2);
        assert_eq!(sample_stride("position", 20.0, 0.05).unwrap(), 1);
        assert_eq!(sample_stride("position", 5.0, 0.1).unwrap(), 2);
        // 3 Hz on a 20 Hz grid would silently run at 2.86 Hz.
        assert!(sample_stride("position", 3.0, 0.05).is_err());
        // Faster than the truth grid.
        assert!(sample_stride("range_bearing", 30.0, 0.05).is_err());
    }

    #[test]
    fn test_unreachable_rate_fails_synthesis() {
        let mut config = SensorSimConfig::default();
        config.range_bearing.rate_hz = 7.0;
        let err =
            synthesize_measurements(&truth(), &config, 0.05, 0, &mut SimulationRng::new(Some(3)))
                .unwrap_err();
        assert!(matches!(
            err,
            ScenarioError::Invalid(msg) if msg.contains("sensors.range_bearing.rate_hz")
        ));
    }
}
