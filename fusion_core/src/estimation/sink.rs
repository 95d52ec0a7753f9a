// fusion_core/src/estimation/sink.rs

use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::messages::SensorKind;
use crate::types::Timestamp;

/// 95th percentile of the chi-square distribution for 1 to 3 degrees of freedom.
const CHI_SQUARE_95: [f64; 3] = [3.841, 5.991, 7.815];

/// The value a consistent filter's NIS exceeds 5 % of the time for a
/// measurement of `dof` components. `None` beyond the tabulated range.
pub fn chi_square_95(dof: usize) -> Option<f64> {
    dof.checked_sub(1).and_then(|i| CHI_SQUARE_95.get(i)).copied()
}

/// One consistency score, emitted after every successful update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NisRecord {
    pub sensor: SensorKind,
    pub timestamp: Timestamp,
    pub nis: f64,
}

impl NisRecord {
    /// True if the score lies above the 95 % chi-square bound for the sensor's dimension.
    pub fn exceeds_95(&self) -> bool {
        chi_square_95(self.sensor.measurement_dim()).is_some_and(|limit| self.nis > limit)
    }
}

/// Receives the NIS of every committed update. The filter never prints.
pub trait NisSink: Send {
    fn record(&mut self, record: &NisRecord);
}

impl<F> NisSink for F
where
    F: FnMut(&NisRecord) + Send,
{
    fn record(&mut self, record: &NisRecord) {
        self(record)
    }
}

impl NisSink for Vec<NisRecord> {
    fn record(&mut self, record: &NisRecord) {
        self.push(*record);
    }
}

impl NisSink for Sender<NisRecord> {
    fn record(&mut self, record: &NisRecord) {
        // A dropped receiver only means nobody is listening anymore.
        let _ = self.send(*record);
    }
}

/// Default sink: one `tracing` event per score at DEBUG level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNisSink;

impl NisSink for TracingNisSink {
    fn record(&mut self, record: &NisRecord) {
        debug!(
            sensor = %record.sensor,
            timestamp = record.timestamp,
            nis = record.nis,
            above_95 = record.exceeds_95(),
            "NIS"
        );
    }
}
