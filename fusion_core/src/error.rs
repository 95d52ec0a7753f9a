// fusion_core/src/error.rs

use thiserror::Error;

use crate::messages::SensorKind;
use crate::types::Timestamp;

/// Coarse classification of a `FilterError`, used by callers that only care
/// about whether the failure came from the numbers or from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A factorization or inversion failed, or the math produced NaN/Inf.
    NumericalInstability,
    /// The input violated a documented precondition and was rejected before
    /// any matrix operation ran.
    PreconditionViolation,
    /// The filter was constructed with parameters it cannot run with.
    Configuration,
}

/// Every way a filter cycle can fail. A failed cycle never touches the
/// committed `FilterState`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    // --- Numerical instability ---
    #[error("covariance is not positive definite ({stage})")]
    NotPositiveDefinite { stage: &'static str },

    #[error(
        "innovation covariance is ill-conditioned: condition number {condition_number:e} exceeds {limit:e}"
    )]
    IllConditioned { condition_number: f64, limit: f64 },

    #[error("non-finite value produced during {stage}")]
    NonFinite { stage: &'static str },

    // --- Precondition violations ---
    #[error("timestamp {received} precedes the last processed timestamp {last}")]
    NonMonotonicTimestamp {
        last: Timestamp,
        received: Timestamp,
    },

    #[error("{sensor} measurement expects {expected} values, received {received}")]
    DimensionMismatch {
        sensor: SensorKind,
        expected: usize,
        received: usize,
    },

    #[error("{sensor} measurement contains a non-finite value")]
    NonFiniteMeasurement { sensor: SensorKind },

    #[error("no measurement model registered for {sensor} measurements")]
    NoModelForSensor { sensor: SensorKind },

    #[error("filter has not been initialized by a measurement yet")]
    NotInitialized,

    // --- Configuration ---
    #[error("invalid filter configuration: {0}")]
    InvalidConfig(String),
}

impl FilterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FilterError::NotPositiveDefinite { .. }
            | FilterError::IllConditioned { .. }
            | FilterError::NonFinite { .. } => ErrorKind::NumericalInstability,
            FilterError::NonMonotonicTimestamp { .. }
            | FilterError::DimensionMismatch { .. }
            | FilterError::NonFiniteMeasurement { .. }
            | FilterError::NoModelForSensor { .. }
            | FilterError::NotInitialized => ErrorKind::PreconditionViolation,
            FilterError::InvalidConfig(_) => ErrorKind::Configuration,
        }
    }

    pub fn is_numerical_instability(&self) -> bool {
        self.kind() == ErrorKind::NumericalInstability
    }

    pub fn is_precondition_violation(&self) -> bool {
        self.kind() == ErrorKind::PreconditionViolation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_classified() {
        assert!(FilterError::NotPositiveDefinite { stage: "sigma points" }.is_numerical_instability());
        assert!(FilterError::IllConditioned {
            condition_number: 1e15,
            limit: 1e12
        }
        .is_numerical_instability());
        assert!(FilterError::NonMonotonicTimestamp { last: 10, received: 5 }
            .is_precondition_violation());
        assert!(FilterError::DimensionMismatch {
            sensor: SensorKind::RangeBearing,
            expected: 3,
            received: 2
        }
        .is_precondition_violation());
        assert_eq!(
            FilterError::InvalidConfig("bad".into()).kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn test_error_messages_name_the_sensor() {
        let err = FilterError::DimensionMismatch {
            sensor: SensorKind::Position,
            expected: 2,
            received: 3,
        };
        assert_eq!(
            err.to_string(),
            "position measurement expects 2 values, received 3"
        );
    }
}
