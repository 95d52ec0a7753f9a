// fusion_sim/src/simulation/log_reader.rs

//! Reader (and writer) for whitespace-separated measurement logs:
//!
//! ```text
//! L  px  py              timestamp  [gt_px gt_py gt_vx gt_vy [gt_yaw gt_yaw_rate]]
//! R  rho phi rho_dot     timestamp  [gt_px gt_py gt_vx gt_vy [gt_yaw gt_yaw_rate]]
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Timestamps are
//! integer microseconds.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use fusion_core::messages::{MeasurementData, MeasurementMessage, SensorKind};
use fusion_core::types::Timestamp;

use crate::simulation::core::records::{GroundTruth, LogRecord};
use crate::simulation::error::{LogParseError, ScenarioError};

const POSITION_TAG: &str = "L";
const RANGE_BEARING_TAG: &str = "R";

fn tag(kind: SensorKind) -> &'static str {
    match kind {
        SensorKind::Position => POSITION_TAG,
        SensorKind::RangeBearing => RANGE_BEARING_TAG,
    }
}

/// Parses one line. `line_no` is 1-based and only used for error messages.
pub fn parse_line(line: &str, line_no: usize) -> Result<Option<LogRecord>, LogParseError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let mut tokens = trimmed.split_whitespace();
    let kind = match tokens.next() {
        Some(POSITION_TAG) => SensorKind::Position,
        Some(RANGE_BEARING_TAG) => SensorKind::RangeBearing,
        Some(other) => {
            return Err(LogParseError::malformed(
                line_no,
                format!("unknown sensor tag '{other}', expected 'L' or 'R'"),
            ))
        }
        None => return Ok(None),
    };
    let rest: Vec<&str> = tokens.collect();

    let dim = kind.measurement_dim();
    if rest.len() < dim + 1 {
        return Err(LogParseError::malformed(
            line_no,
            format!(
                "{kind} record needs {} values and a timestamp, found {} fields",
                dim,
                rest.len()
            ),
        ));
    }

    let values = rest[..dim]
        .iter()
        .map(|token| parse_f64(token, line_no))
        .collect::<Result<Vec<_>, _>>()?;
    let timestamp: Timestamp = rest[dim].parse().map_err(|_| {
        LogParseError::malformed(line_no, format!("invalid timestamp '{}'", rest[dim]))
    })?;
    let message = MeasurementMessage::from_raw(kind, &values, timestamp)
        .map_err(|err| LogParseError::malformed(line_no, err.to_string()))?;

    let truth = rest[dim + 1..]
        .iter()
        .map(|token| parse_f64(token, line_no))
        .collect::<Result<Vec<_>, _>>()?;
    let ground_truth = match truth.as_slice() {
        [] => None,
        [px, py, vx, vy] => Some(GroundTruth {
            px: *px,
            py: *py,
            vx: *vx,
            vy: *vy,
            yaw: None,
            yaw_rate: None,
        }),
        [px, py, vx, vy, yaw, yaw_rate] => Some(GroundTruth {
            px: *px,
            py: *py,
            vx: *vx,
            vy: *vy,
            yaw: Some(*yaw),
            yaw_rate: Some(*yaw_rate),
        }),
        other => {
            return Err(LogParseError::malformed(
                line_no,
                format!("expected 0, 4 or 6 ground-truth values, found {}", other.len()),
            ))
        }
    };

    Ok(Some(LogRecord {
        message,
        ground_truth,
    }))
}

fn parse_f64(token: &str, line_no: usize) -> Result<f64, LogParseError> {
    token
        .parse::<f64>()
        .map_err(|_| LogParseError::malformed(line_no, format!("invalid number '{token}'")))
}

/// Reads every record of a log. Stops at the first malformed line.
pub fn read_log<R: BufRead>(reader: R) -> Result<Vec<LogRecord>, LogParseError> {
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        if let Some(record) = parse_line(&line?, index + 1)? {
            records.push(record);
        }
    }
    Ok(records)
}

pub fn load_log_file(path: &Path) -> Result<Vec<LogRecord>, ScenarioError> {
    let file = File::open(path).map_err(|source| ScenarioError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_log(BufReader::new(file)).map_err(|source| ScenarioError::Log {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes records in the same format `read_log` accepts.
pub fn write_log<W: Write>(mut writer: W, records: &[LogRecord]) -> std::io::Result<()> {
    for record in records {
        let message = &record.message;
        write!(writer, "{}", tag(message.kind()))?;
        match &message.data {
            MeasurementData::Position(z) => write!(writer, "\t{}\t{}", z.x, z.y)?,
            MeasurementData::RangeBearing(z) => write!(writer, "\t{}\t{}\t{}", z.x, z.y, z.z)?,
        }
        write!(writer, "\t{}", message.timestamp)?;
        if let Some(gt) = &record.ground_truth {
            write!(writer, "\t{}\t{}\t{}\t{}", gt.px, gt.py, gt.vx, gt.vy)?;
            if let (Some(yaw), Some(yaw_rate)) = (gt.yaw, gt.yaw_rate) {
                write!(writer, "\t{}\t{}", yaw, yaw_rate)?;
            }
        }
        writeln!(writer)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# sensor  measurement...  timestamp  ground truth...
L\t3.122427e-01\t5.803398e-01\t1477010443000000\t6.000000e-01\t6.000000e-01\t5.199937e+00\t0\t0\t6.911322e-03

R\t1.014892e+00\t5.543292e-01\t4.892807e+00\t1477010443050000\t8.599968e-01\t6.000449e-01\t5.199747e+00\t1.796856e-03\t3.455661e-04\t1.382155e-02
L 1.0 2.0 1477010443100000
";

    #[test]
    fn test_reads_both_sensor_kinds() {
        let records = read_log(SAMPLE.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);

        let first = &records[0];
        assert_eq!(first.message.kind(), SensorKind::Position);
        assert_eq!(first.message.timestamp, 1_477_010_443_000_000);
        let gt = first.ground_truth.unwrap();
        assert_eq!(gt.px, 0.6);
        assert_eq!(gt.vx, 5.199937);
        assert_eq!(gt.yaw, Some(0.0));
        assert_eq!(gt.yaw_rate, Some(6.911322e-03));

        let second = &records[1];
        assert_eq!(second.message.kind(), SensorKind::RangeBearing);
        assert_eq!(
            second.message.data.to_vector().as_slice(),
            &[1.014892, 0.5543292, 4.892807]
        );

        assert!(records[2].ground_truth.is_none());
    }

    #[test]
    fn test_four_value_ground_truth_has_no_heading() {
        let record = parse_line("L 1 2 10 1 2 3 4", 1).unwrap().unwrap();
        let gt = record.ground_truth.unwrap();
        assert_eq!(gt.vy, 4.0);
        assert_eq!(gt.yaw, None);
    }

    #[test]
    fn test_malformed_lines_report_line_number() {
        let err = read_log("L 1 2 0\nR 1.0 0.5 0\n".as_bytes()).unwrap_err();
        assert!(matches!(err, LogParseError::Malformed { line: 2, .. }));

        let err = parse_line("X 1 2 3", 7).unwrap_err();
        assert_eq!(
            err.to_string(),
            "line 7: unknown sensor tag 'X', expected 'L' or 'R'"
        );

        assert!(parse_line("L 1 abc 0", 1).is_err());
        assert!(parse_line("L 1 2 0.5", 1).is_err());
        assert!(parse_line("L 1 2 0 1 2 3", 1).is_err());
        assert!(parse_line("L NaN 2 0", 1).is_err());
    }

    #[test]
    fn test_written_log_reads_back() {
        let records = read_log(SAMPLE.as_bytes()).unwrap();
        let mut buffer = Vec::new();
        write_log(&mut buffer, &records).unwrap();
        assert_eq!(read_log(buffer.as_slice()).unwrap(), records);
    }
}
