// fusion_core/src/state/layout.rs
use crate::state::StateVariable;

/// The dimension of the CTRV state vector.
pub const CTRV_STATE_DIM: usize = 5;
/// Number of process-noise inputs appended when the state is augmented.
pub const CTRV_NOISE_DIM: usize = 2;
/// The dimension of the augmented state.
pub const CTRV_AUGMENTED_DIM: usize = CTRV_STATE_DIM + CTRV_NOISE_DIM;

// --- Fixed indices into the CTRV state vector ---
pub const PX: usize = 0;
pub const PY: usize = 1;
pub const SPEED: usize = 2;
pub const YAW: usize = 3;
pub const YAW_RATE: usize = 4;

// --- Fixed indices of the noise inputs in the augmented vector ---
pub const NU_ACCEL: usize = 5;
pub const NU_YAW_ACCEL: usize = 6;

/// Returns the 5-dimensional constant turn-rate and velocity (CTRV) state layout.
///
/// The state is composed of:
/// - Position (2) in the world frame
/// - Speed magnitude along the heading
/// - Heading (yaw), circular
/// - Heading rate (yaw rate)
pub fn ctrv_state_layout() -> Vec<StateVariable> {
    vec![
        StateVariable::Px,      // index 0
        StateVariable::Py,      // index 1
        StateVariable::Speed,   // index 2
        StateVariable::Yaw,     // index 3
        StateVariable::YawRate, // index 4
    ]
}
