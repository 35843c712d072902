use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;

/// One input row: field name to value, in source order.
pub type Record = Map<String, Value>;

/// Field attached to forum rows holding the DOIs found in their text.
pub const DOIS_FIELD: &str = "DOIs";

/// Aggregate statistics of a single bulk load run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadSummary {
    pub mutation: String,
    pub batch_size: usize,
    pub batches_done: u64,
    #[serde(serialize_with = "as_secs")]
    pub batch_time: Duration,
    #[serde(serialize_with = "as_secs")]
    pub total_time: Duration,
    pub records: u64,
    /// Sum of the counts reported by the store; `None` if it never reported one.
    pub affected: Option<u64>,
    pub malformed: u64,
    pub cancelled: bool,
}

impl LoadSummary {
    pub fn new(mutation: &str, batch_size: usize) -> Self {
        Self {
            mutation: mutation.to_string(),
            batch_size,
            ..Self::default()
        }
    }

    pub fn record_batch(&mut self, rows: usize, affected: Option<u64>, elapsed: Duration) {
        self.batches_done += 1;
        self.records += rows as u64;
        self.batch_time = elapsed;
        if let Some(count) = affected {
            self.affected = Some(self.affected.unwrap_or(0) + count);
        }
    }
}

fn as_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}
