use crate::config::MALFORMED_LOG_LIMIT;
use crate::error::{LoadError, Result};
use crate::models::Record;
use bzip2::read::BzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};

/// A lazy stream of records read from some backing resource.
///
/// Sources cannot be rewound; reading the same data twice means opening it
/// again.
pub trait RecordSource: Iterator<Item = Record> {
    /// Short label used in logs and progress output.
    fn name(&self) -> &str;

    /// Lines or rows skipped because they could not be parsed.
    fn malformed(&self) -> u64;

    /// The read error that ended the stream early, if any. A source that
    /// fails this way yields `None` as if exhausted, so callers check here
    /// once iteration stops.
    fn take_failure(&mut self) -> Option<LoadError> {
        None
    }
}

/// Opens an input file, decompressing `.bz2` transparently.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).map_err(|source| LoadError::MissingResource {
        path: path.to_path_buf(),
        source,
    })?;

    if path.extension().is_some_and(|ext| ext == "bz2") {
        Ok(Box::new(BufReader::with_capacity(
            256 * 1024,
            BzDecoder::new(file),
        )))
    } else {
        Ok(Box::new(BufReader::with_capacity(256 * 1024, file)))
    }
}

/// Counts malformed input and logs only the first few occurrences.
#[derive(Debug, Default)]
pub struct MalformedTracker {
    count: u64,
    logged: u64,
    reported: bool,
}

impl MalformedTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one malformed line or row. Returns whether it was logged.
    pub fn record(&mut self, source: &str, err: &LoadError) -> bool {
        self.count += 1;
        if self.count > MALFORMED_LOG_LIMIT {
            return false;
        }

        warn!(source, error = %err, "Skipping malformed record");
        self.logged += 1;
        if self.count == MALFORMED_LOG_LIMIT {
            warn!(
                source,
                "{MALFORMED_LOG_LIMIT} malformed records encountered, suppressing further errors"
            );
        }
        true
    }

    /// Counts a malformed record the caller has already reported.
    pub fn count_only(&mut self) {
        self.count += 1;
    }

    /// Logs the final count once, when the stream ends.
    pub fn finish(&mut self, source: &str) {
        if self.reported {
            return;
        }
        self.reported = true;
        if self.count > 0 {
            warn!(source, malformed = self.count, "Finished with malformed records");
        } else {
            info!(source, "Finished reading");
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn logged(&self) -> u64 {
        self.logged
    }
}

/// Records held in memory, e.g. the list of boards to create.
pub struct MemorySource {
    name: String,
    records: std::vec::IntoIter<Record>,
}

impl MemorySource {
    pub fn new(name: &str, records: Vec<Record>) -> Self {
        Self {
            name: name.to_string(),
            records: records.into_iter(),
        }
    }
}

impl Iterator for MemorySource {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        self.records.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

impl RecordSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn malformed(&self) -> u64 {
        0
    }
}
