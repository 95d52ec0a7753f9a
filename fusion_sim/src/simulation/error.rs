// fusion_sim/src/simulation/error.rs

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use fusion_core::error::FilterError;

/// A measurement log line that could not be turned into a record.
#[derive(Debug, Error)]
pub enum LogParseError {
    #[error("failed to read measurement log: {0}")]
    Io(#[from] io::Error),

    /// `line` is 1-based.
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

impl LogParseError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        LogParseError::Malformed {
            line,
            reason: reason.into(),
        }
    }
}

/// Everything that can stop a replay or a synthetic run before it starts.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to load scenario configuration: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("invalid scenario: {0}")]
    Invalid(String),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path}: {source}")]
    Log {
        path: PathBuf,
        #[source]
        source: LogParseError,
    },

    #[error(transparent)]
    Filter(#[from] FilterError),
}

impl From<figment::Error> for ScenarioError {
    fn from(err: figment::Error) -> Self {
        ScenarioError::Config(Box::new(err))
    }
}
