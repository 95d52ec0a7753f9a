// fusion_core/src/estimation/filters/ukf.rs

use nalgebra::{DMatrix, DVector};
use std::any::Any;
use std::collections::HashMap;
use tracing::{debug, trace};

// --- Core Library Imports ---
use crate::config::UkfConfig;
use crate::error::FilterError;
use crate::estimation::sink::{NisRecord, NisSink, TracingNisSink};
use crate::estimation::ukf::{ukf_predict, ukf_update, UkfMeasurementParams, UkfPredictParams};
use crate::estimation::{FilterPhase, StateEstimator, UpdateOutcome};
use crate::messages::{MeasurementMessage, ModuleInput, SensorKind};
use crate::models::estimation::dynamics::ctrv::CtrvModel;
use crate::models::estimation::dynamics::EstimationDynamics;
use crate::models::estimation::measurement::position::PositionSensorModel;
use crate::models::estimation::measurement::range_bearing::RangeBearingModel;
use crate::models::estimation::measurement::Measurement;
use crate::state::layout::{ctrv_state_layout, PX, PY};
use crate::state::FilterState;
use crate::types::Timestamp;
use crate::utils::angles::normalize_components;

/// An Unscented Kalman Filter over the CTRV motion model that fuses any
/// number of registered measurement models (one per `SensorKind`).
///
/// The filter owns a single committed `FilterState`. Every cycle works on
/// copies and the result is committed only once prediction and update have
/// both succeeded, so an `Err` from `process` leaves the estimate untouched.
/// NIS values of committed updates are handed to the sink `S`.
pub struct UnscentedKalmanFilter<S: NisSink = TracingNisSink> {
    config: UkfConfig,
    /// Zero state with the configured prior covariance, before any measurement.
    prior: FilterState,
    state: FilterState,
    phase: FilterPhase,
    dynamics_model: Box<dyn EstimationDynamics>,
    process_noise_q: DMatrix<f64>,
    measurement_models: HashMap<SensorKind, Box<dyn Measurement>>,
    sink: S,
}

impl UnscentedKalmanFilter<TracingNisSink> {
    /// Builds the standard lidar/radar CTRV filter, logging NIS through `tracing`.
    pub fn from_config(config: UkfConfig) -> Result<Self, FilterError> {
        Self::with_sink(config, TracingNisSink)
    }
}

impl<S: NisSink> UnscentedKalmanFilter<S> {
    /// Builds the standard lidar/radar CTRV filter with a custom NIS sink.
    pub fn with_sink(config: UkfConfig, sink: S) -> Result<Self, FilterError> {
        config.validate()?;

        let dynamics = CtrvModel::from_config(&config);
        let models: Vec<Box<dyn Measurement>> = vec![
            Box::new(PositionSensorModel::new(&config.position_sensor)),
            Box::new(
                RangeBearingModel::new(&config.range_bearing_sensor)
                    .with_min_range(config.min_range),
            ),
        ];
        Self::new(config, Box::new(dynamics), models, sink)
    }

    /// Assembles a filter from explicit models. A later model with the same
    /// `SensorKind` replaces an earlier one.
    ///
    /// The measurement models read and seed the CTRV state, so the dynamics
    /// model must use the CTRV layout and a square process-noise covariance.
    pub fn new(
        config: UkfConfig,
        dynamics_model: Box<dyn EstimationDynamics>,
        measurement_models: Vec<Box<dyn Measurement>>,
        sink: S,
    ) -> Result<Self, FilterError> {
        let layout = dynamics_model.get_state_layout();
        if layout != ctrv_state_layout() {
            return Err(FilterError::InvalidConfig(format!(
                "dynamics model must use the CTRV state layout, got {layout:?}"
            )));
        }
        let process_noise_q = dynamics_model.get_process_noise_covariance();
        let noise_dim = dynamics_model.get_noise_dim();
        if process_noise_q.shape() != (noise_dim, noise_dim) {
            return Err(FilterError::InvalidConfig(format!(
                "process noise covariance is {:?}, expected {noise_dim}x{noise_dim}",
                process_noise_q.shape()
            )));
        }
        let measurement_models = measurement_models
            .into_iter()
            .map(|model| (model.kind(), model))
            .collect();
        let prior = FilterState::new(layout, config.initial_covariance(), 0)?;

        Ok(Self {
            config,
            state: prior.clone(),
            prior,
            phase: FilterPhase::Uninitialized,
            dynamics_model,
            process_noise_q,
            measurement_models,
            sink,
        })
    }

    pub fn phase(&self) -> FilterPhase {
        self.phase
    }

    /// The committed estimate.
    pub fn get_state(&self) -> &FilterState {
        &self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn measurement_model(&self, kind: SensorKind) -> Option<&dyn Measurement> {
        self.measurement_models.get(&kind).map(|model| model.as_ref())
    }

    /// Forgets the track. The next accepted measurement initializes again.
    pub fn reset(&mut self) {
        self.state = self.prior.clone();
        self.phase = FilterPhase::Uninitialized;
    }

    /// Feeds one measurement: initializes on the first accepted one, runs a
    /// full predict + update cycle afterwards.
    pub fn process_measurement(
        &mut self,
        message: &MeasurementMessage,
    ) -> Result<Option<UpdateOutcome>, FilterError> {
        let sensor = message.kind();
        if !self.config.is_enabled(sensor) {
            trace!(%sensor, timestamp = message.timestamp, "sensor disabled, measurement ignored");
            return Ok(None);
        }
        if !message.data.is_finite() {
            return Err(FilterError::NonFiniteMeasurement { sensor });
        }
        let model = self
            .measurement_models
            .get(&sensor)
            .ok_or(FilterError::NoModelForSensor { sensor })?;
        let z = message.data.to_vector();

        match self.phase {
            FilterPhase::Uninitialized => {
                let state = self.initial_state(model.as_ref(), &z, message.timestamp);
                debug!(
                    %sensor,
                    timestamp = message.timestamp,
                    px = state.vector[PX],
                    py = state.vector[PY],
                    "track initialized"
                );
                self.state = state;
                self.phase = FilterPhase::Tracking;
                Ok(Some(UpdateOutcome::Initialized {
                    sensor,
                    timestamp: message.timestamp,
                }))
            }
            FilterPhase::Tracking => {
                let dt = self.elapsed_seconds(message.timestamp)?;

                // --- 1. Predict ---
                let prediction = ukf_predict(
                    &self.state,
                    &UkfPredictParams {
                        dynamics: self.dynamics_model.as_ref(),
                        process_noise_q: &self.process_noise_q,
                    },
                    dt,
                )?;

                // --- 2. Update ---
                let correction = ukf_update(
                    &prediction,
                    &UkfMeasurementParams {
                        model: model.as_ref(),
                        z: &z,
                        max_condition_number: self.config.max_innovation_condition,
                    },
                )?;

                // --- 3. Commit ---
                let mut state = correction.state;
                state.last_update_timestamp = message.timestamp;
                self.state = state;

                let record = NisRecord {
                    sensor,
                    timestamp: message.timestamp,
                    nis: correction.nis,
                };
                self.sink.record(&record);

                Ok(Some(UpdateOutcome::Updated {
                    sensor,
                    timestamp: message.timestamp,
                    dt,
                    nis: correction.nis,
                }))
            }
        }
    }

    /// Advances the committed estimate to `timestamp` without a measurement.
    pub fn predict_to(&mut self, timestamp: Timestamp) -> Result<UpdateOutcome, FilterError> {
        if self.phase == FilterPhase::Uninitialized {
            return Err(FilterError::NotInitialized);
        }
        let dt = self.elapsed_seconds(timestamp)?;
        let prediction = ukf_predict(
            &self.state,
            &UkfPredictParams {
                dynamics: self.dynamics_model.as_ref(),
                process_noise_q: &self.process_noise_q,
            },
            dt,
        )?;

        let mut state = prediction.state;
        let angular = state.angular_indices();
        normalize_components(&mut state.vector, &angular);
        state.last_update_timestamp = timestamp;
        self.state = state;
        Ok(UpdateOutcome::Predicted { timestamp, dt })
    }

    /// Seconds between the committed state and `timestamp`. Equal timestamps
    /// give zero; going backwards is rejected.
    fn elapsed_seconds(&self, timestamp: Timestamp) -> Result<f64, FilterError> {
        let last = self.state.last_update_timestamp;
        if timestamp < last {
            return Err(FilterError::NonMonotonicTimestamp {
                last,
                received: timestamp,
            });
        }
        Ok((timestamp - last) as f64 / self.config.timestamp_units_per_second)
    }

    fn initial_state(
        &self,
        model: &dyn Measurement,
        z: &DVector<f64>,
        timestamp: Timestamp,
    ) -> FilterState {
        let mut state = self.prior.clone();
        state.vector = model.state_from_measurement(z);

        // A track at the exact origin gives the first sigma spread no direction.
        let min = self.config.min_initial_position;
        if state.vector[PX].abs() < min && state.vector[PY].abs() < min {
            state.vector[PX] = min;
            state.vector[PY] = min;
        }
        state.last_update_timestamp = timestamp;
        state
    }
}

impl<S: NisSink + 'static> StateEstimator for UnscentedKalmanFilter<S> {
    fn process(&mut self, input: &ModuleInput) -> Result<Option<UpdateOutcome>, FilterError> {
        match input {
            ModuleInput::Measurement { message } => self.process_measurement(message),
            ModuleInput::Predict { timestamp } => self.predict_to(*timestamp).map(Some),
        }
    }

    fn get_state(&self) -> &FilterState {
        &self.state
    }

    fn phase(&self) -> FilterPhase {
        self.phase
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
