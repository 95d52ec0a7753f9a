// fusion_sim/src/simulation/config/mod.rs

//! This module handles loading and validating scenario configuration from
//! disk, and discovering measurement logs to replay.

mod catalog;

pub mod structs;

use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use std::path::Path;
use tracing::info;

use crate::simulation::error::ScenarioError;
use crate::simulation::sensors::sample_stride;
pub use catalog::discover_logs;
pub use structs::{
    PositionSimConfig, RangeBearingSimConfig, ScenarioConfig, SensorSimConfig, Simulation,
    TrajectoryConfig,
};

/// Builds the scenario from the defaults, overridden by the TOML file at
/// `path` if one is given.
pub fn load_scenario(path: Option<&Path>) -> Result<ScenarioConfig, ScenarioError> {
    let mut figment = Figment::from(Serialized::defaults(ScenarioConfig::default()));
    if let Some(path) = path {
        if !path.exists() {
            return Err(ScenarioError::Invalid(format!(
                "scenario file {} does not exist",
                path.display()
            )));
        }
        info!("Loading scenario from: {}", path.display());
        figment = figment.merge(Toml::file(path));
    }

    let config: ScenarioConfig = figment.extract()?;
    validate(&config)?;
    Ok(config)
}

/// Parses a scenario from TOML text layered over the defaults.
pub fn scenario_from_str(toml_text: &str) -> Result<ScenarioConfig, ScenarioError> {
    let config: ScenarioConfig = Figment::from(Serialized::defaults(ScenarioConfig::default()))
        .merge(Toml::string(toml_text))
        .extract()?;
    validate(&config)?;
    Ok(config)
}

/// Renders the resolved configuration back to TOML.
pub fn scenario_to_toml(config: &ScenarioConfig) -> Result<String, ScenarioError> {
    toml::to_string_pretty(config).map_err(|e| ScenarioError::Invalid(e.to_string()))
}

fn validate(config: &ScenarioConfig) -> Result<(), ScenarioError> {
    config.filter.validate()?;

    let trajectory = &config.trajectory;
    if !(trajectory.step_seconds > 0.0 && trajectory.step_seconds.is_finite()) {
        return Err(ScenarioError::Invalid(format!(
            "trajectory.step_seconds must be positive, got {}",
            trajectory.step_seconds
        )));
    }
    if !(trajectory.duration_seconds >= 0.0 && trajectory.duration_seconds.is_finite()) {
        return Err(ScenarioError::Invalid(format!(
            "trajectory.duration_seconds must be non-negative, got {}",
            trajectory.duration_seconds
        )));
    }
    if trajectory.initial.iter().any(|v| !v.is_finite()) {
        return Err(ScenarioError::Invalid(
            "trajectory.initial must be finite".to_string(),
        ));
    }

    let noise = [
        ("trajectory.accel_noise_stddev", trajectory.accel_noise_stddev),
        ("trajectory.yaw_accel_noise_stddev", trajectory.yaw_accel_noise_stddev),
        ("sensors.position.px_stddev", config.sensors.position.px_stddev),
        ("sensors.position.py_stddev", config.sensors.position.py_stddev),
        ("sensors.range_bearing.range_stddev", config.sensors.range_bearing.range_stddev),
        ("sensors.range_bearing.bearing_stddev", config.sensors.range_bearing.bearing_stddev),
        (
            "sensors.range_bearing.range_rate_stddev",
            config.sensors.range_bearing.range_rate_stddev,
        ),
    ];
    for (name, value) in noise {
        if !(value >= 0.0 && value.is_finite()) {
            return Err(ScenarioError::Invalid(format!(
                "{name} must be a non-negative standard deviation, got {value}"
            )));
        }
    }

    for (name, enabled, rate) in [
        ("position", config.sensors.position.enabled, config.sensors.position.rate_hz),
        (
            "range_bearing",
            config.sensors.range_bearing.enabled,
            config.sensors.range_bearing.rate_hz,
        ),
    ] {
        if !enabled {
            continue;
        }
        if !(rate > 0.0 && rate.is_finite()) {
            return Err(ScenarioError::Invalid(format!(
                "sensors.{name}.rate_hz must be positive, got {rate}"
            )));
        }
        sample_stride(name, rate, trajectory.step_seconds)?;
    }

    if config.simulation.runs == 0 {
        return Err(ScenarioError::Invalid(
            "simulation.runs must be at least 1".to_string(),
        ));
    }
    Ok(())
}
