// fusion_sim/src/main.rs

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use fusion_sim::cli::{Cli, Command, ReplayArgs, SensorToggles, SimulateArgs};
use fusion_sim::prelude::*;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Replay(args) => run_replay(args),
        Command::Simulate(args) => run_simulate(args),
        Command::PrintConfig { scenario } => {
            let config = load_scenario(scenario.as_deref())?;
            print!("{}", scenario_to_toml(&config)?);
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    if verbose {
        subscriber.with_max_level(tracing::Level::DEBUG).init();
        info!("Verbose logging enabled (DEBUG level)");
    } else {
        subscriber.with_max_level(tracing::Level::INFO).init();
    }
}

fn apply_toggles(config: &mut UkfConfig, toggles: &SensorToggles) {
    if toggles.no_position {
        config.use_position_sensor = false;
    }
    if toggles.no_range_bearing {
        config.use_range_bearing_sensor = false;
    }
}

// =========================================================================
// == Replay ==
// =========================================================================

fn run_replay(args: ReplayArgs) -> Result<()> {
    let mut scenario = load_scenario(args.scenario.as_deref())?;
    apply_toggles(&mut scenario.filter, &args.sensors);

    let logs = discover_logs(&args.input);
    if logs.is_empty() {
        bail!("no measurement logs found at {}", args.input.display());
    }
    let single = logs.len() == 1 && args.input.is_file();

    let mut reports = Vec::with_capacity(logs.len());
    for log in &logs {
        let records = load_log_file(log)?;
        info!("Replaying {} measurements from {}", records.len(), log.display());
        let report = replay(&records, &scenario.filter, TracingNisSink)?;
        log_report(&log.display().to_string(), &report);

        if let Some(output) = &args.output {
            let path = if single {
                output.clone()
            } else {
                output.join(estimate_file_name(log))
            };
            write_estimates_file(&path, &report.rows)?;
            info!("Estimates written to {}", path.display());
        }
        reports.push(report);
    }

    if reports.len() > 1 {
        log_batch(&BatchSummary::from_reports(&reports, 0));
    }
    Ok(())
}

fn estimate_file_name(log: &Path) -> PathBuf {
    let stem = log
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "log".to_string());
    PathBuf::from(format!("{stem}_estimates.tsv"))
}

// =========================================================================
// == Simulate ==
// =========================================================================

fn run_simulate(args: SimulateArgs) -> Result<()> {
    let mut scenario = load_scenario(args.scenario.as_deref())?;
    if let Some(runs) = args.runs {
        scenario.simulation.runs = runs;
    }
    if args.seed.is_some() {
        scenario.simulation.seed = args.seed;
    }
    if scenario.simulation.runs == 0 {
        bail!("at least one run is required");
    }
    apply_toggles(&mut scenario.filter, &args.sensors);

    let results = simulate(&scenario)?;

    if let Some(dir) = &args.output {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        for result in &results {
            let path = dir.join(format!("run_{:03}_estimates.tsv", result.run));
            write_estimates_file(&path, &result.report.rows)?;
            if args.save_logs {
                let log_path = dir.join(format!("run_{:03}.txt", result.run));
                let file = File::create(&log_path)
                    .with_context(|| format!("failed to create {}", log_path.display()))?;
                write_log(BufWriter::new(file), &result.records)
                    .with_context(|| format!("failed to write {}", log_path.display()))?;
            }
        }
        info!("Wrote {} runs to {}", results.len(), dir.display());
    }

    for result in &results {
        log_report(&format!("run {}", result.run), &result.report);
    }
    log_batch(&BatchSummary::from_reports(
        results.iter().map(|r| &r.report),
        args.warm_up,
    ));
    Ok(())
}

// =========================================================================
// == Reporting ==
// =========================================================================

fn log_report(label: &str, report: &ReplayReport) {
    if report.errors > 0 {
        warn!("{}: {} measurements rejected", label, report.errors);
    }
    match report.rmse() {
        Some(rmse) => info!(
            "{}: {} estimates, RMSE px={:.4} py={:.4} vx={:.4} vy={:.4}",
            label,
            report.rows.len(),
            rmse.px,
            rmse.py,
            rmse.vx,
            rmse.vy
        ),
        None => info!("{}: {} estimates, no ground truth", label, report.rows.len()),
    }
}

fn log_batch(summary: &BatchSummary) {
    info!(
        "{} runs, {} updates, {} rejected",
        summary.runs, summary.updates, summary.errors
    );
    if let Some(rmse) = summary.rmse {
        info!(
            "Pooled RMSE px={:.4} py={:.4} vx={:.4} vy={:.4}",
            rmse.px, rmse.py, rmse.vx, rmse.vy
        );
    }
    for nis in &summary.nis {
        info!(
            "NIS {}: n={} mean={:.3} (dof {}), {:.1}% above {:.3}",
            nis.sensor,
            nis.count,
            nis.mean,
            nis.sensor.measurement_dim(),
            100.0 * nis.fraction_above_95,
            nis.threshold_95
        );
    }
}
