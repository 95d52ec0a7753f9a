// fusion_core/src/models/estimation/mod.rs

// Models as the estimator sees them: process models that map augmented sigma
// points over time, and sensor models that map states into measurement space.
pub mod dynamics;
pub mod measurement;
