// fusion_sim/examples/01_full_pipeline.rs

//! A full end-to-end example of the fusion pipeline.
//!
//! This example demonstrates how to:
//! 1. Load a scenario from a TOML file.
//! 2. Generate a seeded ground-truth trajectory with position and range/bearing measurements.
//! 3. Drive an `UnscentedKalmanFilter` by hand, collecting NIS values through a channel.
//! 4. Compare the estimates against ground truth.
//!
//! To run this example:
//! `cargo run --example 01_full_pipeline`

use anyhow::Result;
use std::path::Path;
use std::sync::mpsc;

// --- Project-Specific Imports ---
use fusion_sim::prelude::*;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // --- 1. Load Scenario Configuration ---
    let scenario_path = Path::new("assets/scenarios/00_matched_noise.toml");
    let scenario = if scenario_path.exists() {
        load_scenario(Some(scenario_path))?
    } else {
        load_scenario(None)?
    };

    // --- 2. Generate One Synthetic Run ---
    let mut rng = SimulationRng::for_run(scenario.simulation.seed.or(Some(42)), 0);
    let records = generate_run(&scenario, &mut rng)?;
    println!("Generated {} measurements", records.len());

    // --- 3. Run the Filter ---
    let (tx, rx) = mpsc::channel();
    let mut ukf = UnscentedKalmanFilter::with_sink(scenario.filter.clone(), tx)?;
    let mut rmse = RmseAccumulator::default();

    for record in &records {
        match ukf.process_measurement(&record.message) {
            Ok(Some(_)) => {
                if let Some(truth) = &record.ground_truth {
                    let state = ukf.get_state();
                    rmse.add(state.position(), state.velocity(), truth);
                }
            }
            Ok(None) => {}
            Err(err) => println!("t={}: {}", record.message.timestamp, err),
        }
    }

    // --- 4. Report ---
    let state = ukf.get_state();
    println!("Final state: {:?}", state.vector.as_slice());
    if let Some(rmse) = rmse.finish() {
        println!(
            "RMSE px={:.3} py={:.3} vx={:.3} vy={:.3}",
            rmse.px, rmse.py, rmse.vx, rmse.vy
        );
    }

    drop(ukf);
    let nis: Vec<NisRecord> = rx.iter().collect();
    for summary in summarize_nis(&nis) {
        println!(
            "{}: mean NIS {:.3}, {:.1}% above the 95% bound",
            summary.sensor,
            summary.mean,
            100.0 * summary.fraction_above_95
        );
    }
    Ok(())
}
