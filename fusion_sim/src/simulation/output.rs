// fusion_sim/src/simulation/output.rs

//! Tab-separated estimate files, one row per accepted measurement.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::simulation::error::ScenarioError;
use crate::simulation::replay::EstimateRow;

pub const HEADER: [&str; 14] = [
    "time_stamp",
    "px_state",
    "py_state",
    "v_state",
    "yaw_angle_state",
    "yaw_rate_state",
    "sensor_type",
    "NIS",
    "px_measured",
    "py_measured",
    "px_ground_truth",
    "py_ground_truth",
    "vx_ground_truth",
    "vy_ground_truth",
];

/// Writes the header and one line per row. Missing NIS or ground-truth
/// values are left as empty fields.
pub fn write_estimates<W: Write>(mut writer: W, rows: &[EstimateRow]) -> std::io::Result<()> {
    writeln!(writer, "{}", HEADER.join("\t"))?;
    for row in rows {
        let [px, py, v, yaw, yaw_rate] = row.state;
        write!(
            writer,
            "{}\t{px}\t{py}\t{v}\t{yaw}\t{yaw_rate}\t{}\t",
            row.timestamp, row.sensor
        )?;
        if let Some(nis) = row.nis {
            write!(writer, "{nis}")?;
        }
        write!(writer, "\t{}\t{}", row.measured.x, row.measured.y)?;
        match &row.ground_truth {
            Some(gt) => writeln!(writer, "\t{}\t{}\t{}\t{}", gt.px, gt.py, gt.vx, gt.vy)?,
            None => writeln!(writer, "\t\t\t\t")?,
        }
    }
    writer.flush()
}

/// Creates `path` (and its parent directories) and writes the estimates to it.
pub fn write_estimates_file(path: &Path, rows: &[EstimateRow]) -> Result<(), ScenarioError> {
    let io_error = |source| ScenarioError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let file = File::create(path).map_err(io_error)?;
    write_estimates(BufWriter::new(file), rows).map_err(io_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::core::records::GroundTruth;
    use fusion_core::messages::SensorKind;
    use nalgebra::Vector2;

    fn row(nis: Option<f64>, ground_truth: Option<GroundTruth>) -> EstimateRow {
        EstimateRow {
            timestamp: 50,
            sensor: SensorKind::RangeBearing,
            state: [1.0, 2.0, 3.0, 0.5, 0.25],
            nis,
            measured: Vector2::new(1.5, 2.5),
            ground_truth,
        }
    }

    #[test]
    fn test_every_line_has_every_column() {
        let gt = GroundTruth {
            px: 1.0,
            py: 2.0,
            vx: 3.0,
            vy: 4.0,
            yaw: None,
            yaw_rate: None,
        };
        let mut buffer = Vec::new();
        write_estimates(&mut buffer, &[row(None, None), row(Some(0.75), Some(gt))]).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.split('\t').count() == HEADER.len()));
        assert!(lines[0].starts_with("time_stamp\tpx_state"));
        assert_eq!(lines[1], "50\t1\t2\t3\t0.5\t0.25\trange_bearing\t\t1.5\t2.5\t\t\t\t");
        assert_eq!(lines[2], "50\t1\t2\t3\t0.5\t0.25\trange_bearing\t0.75\t1.5\t2.5\t1\t2\t3\t4");
    }
}
