// fusion_core/src/types.rs

use nalgebra::{DMatrix, DVector};

// --- Core Type Aliases ---
pub type State = DVector<f64>;
pub type Covariance = DMatrix<f64>;

/// Measurement timestamps are integer ticks of a fixed unit. The filter converts
/// elapsed ticks to seconds with `UkfConfig::timestamp_units_per_second`
/// (microseconds by default).
pub type Timestamp = i64;
