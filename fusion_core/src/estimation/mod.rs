// fusion_core/src/estimation/mod.rs

use crate::error::FilterError;
use crate::messages::{ModuleInput, SensorKind};
use crate::state::FilterState;
use crate::types::Timestamp;
use std::any::Any;

/// Lifecycle of a filter. There is no terminal phase; `reset` goes back to
/// `Uninitialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterPhase {
    /// No measurement accepted yet. The state holds construction defaults.
    Uninitialized,
    /// The state has been seeded by a measurement and is being propagated.
    Tracking,
}

/// What a successful call to `StateEstimator::process` did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpdateOutcome {
    /// The first accepted measurement seeded the state. No prediction ran.
    Initialized {
        sensor: SensorKind,
        timestamp: Timestamp,
    },
    /// A full predict + update cycle was committed.
    Updated {
        sensor: SensorKind,
        timestamp: Timestamp,
        /// Elapsed time in seconds since the previous committed state.
        dt: f64,
        nis: f64,
    },
    /// The state was advanced by prediction only.
    Predicted { timestamp: Timestamp, dt: f64 },
}

impl UpdateOutcome {
    pub fn nis(&self) -> Option<f64> {
        match self {
            UpdateOutcome::Updated { nis, .. } => Some(*nis),
            _ => None,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            UpdateOutcome::Initialized { timestamp, .. }
            | UpdateOutcome::Updated { timestamp, .. }
            | UpdateOutcome::Predicted { timestamp, .. } => *timestamp,
        }
    }
}

/// The contract for any algorithm that performs the "State Estimator" role.
/// Its sole responsibility is to estimate the state of one object.
pub trait StateEstimator: Send {
    /// The single, unified method for processing all types of input data.
    ///
    /// Returns `Ok(None)` when the input was deliberately ignored (for example
    /// a measurement from a disabled sensor). On `Err` the committed state is
    /// exactly what it was before the call.
    fn process(&mut self, input: &ModuleInput) -> Result<Option<UpdateOutcome>, FilterError>;

    /// Returns a reference to the current best estimate of the state.
    fn get_state(&self) -> &FilterState;

    fn phase(&self) -> FilterPhase;

    /// Allows for dynamic downcasting to access algorithm-specific methods if needed.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub mod filters;
pub mod sigma_points;
pub mod sink;
pub mod ukf;
