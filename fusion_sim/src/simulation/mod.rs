// fusion_sim/src/simulation/mod.rs

pub mod config;
pub mod core;
pub mod error;
pub mod evaluation;
pub mod log_reader;
pub mod output;
pub mod replay;
pub mod scenario;
pub mod sensors;
pub mod trajectory;
