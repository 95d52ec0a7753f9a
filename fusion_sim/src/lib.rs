// fusion_sim/src/lib.rs

//! Offline driver for the fusion_core UKF: replays recorded measurement logs
//! and runs seeded synthetic scenarios to measure accuracy and consistency.

// This prelude is for convenience for other files WITHIN the fusion_sim crate.
pub mod prelude;

pub mod cli;
pub mod simulation;
