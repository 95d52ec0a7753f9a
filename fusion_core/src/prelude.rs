// fusion_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::estimation::sink::NisSink;
pub use crate::estimation::StateEstimator;
pub use crate::messages::{MeasurementData, MeasurementMessage, ModuleInput, SensorKind};
pub use crate::models::estimation::dynamics::EstimationDynamics;
pub use crate::models::estimation::measurement::Measurement;
pub use crate::types::{Covariance, State, Timestamp};

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::config::UkfConfig;
pub use crate::error::{ErrorKind, FilterError};
pub use crate::estimation::sink::{chi_square_95, NisRecord, TracingNisSink};
pub use crate::estimation::{FilterPhase, UpdateOutcome};
pub use crate::state::{FilterState, MeasurementVariable, NisByModality, StateVariable};

// --- Estimation Algorithms ---
pub use crate::estimation::filters::ukf::UnscentedKalmanFilter;
pub use crate::estimation::ukf::{
    ukf_predict, ukf_update, Correction, Prediction, UkfMeasurementParams, UkfPredictParams,
};

// --- Concrete Model Implementations (Export common ones for convenience) ---
pub use crate::models::estimation::dynamics::ctrv::CtrvModel;
pub use crate::models::estimation::measurement::position::PositionSensorModel;
pub use crate::models::estimation::measurement::range_bearing::RangeBearingModel;
pub use crate::utils::angles::normalize_angle;
