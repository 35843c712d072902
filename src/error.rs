use std::path::PathBuf;
use thiserror::Error;

/// Boxed error returned by graph store clients.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Failures raised while streaming records into the graph store.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A single line or row that could not be turned into a record. Sources
    /// count and log these; they never abort a run.
    #[error("malformed record at {location}: {reason}")]
    MalformedRecord { location: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("cannot open {}", path.display())]
    MissingResource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input stopped being readable partway through, e.g. a truncated
    /// `.bz2` or a disk error. Unlike a malformed record this ends the run.
    #[error("cannot read {source_name} past {location}")]
    ReadFailure {
        source_name: String,
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("mutation '{mutation}' failed on batch {batch}")]
    SubmissionFailure {
        mutation: String,
        batch: u64,
        #[source]
        source: StoreError,
    },
}

pub type Result<T, E = LoadError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn missing_resource_names_path() {
        let err = LoadError::MissingResource {
            path: PathBuf::from("data/ai/Posts.xml"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(err.to_string(), "cannot open data/ai/Posts.xml");
        assert!(err.source().is_some());
    }

    #[test]
    fn read_failure_names_source_and_position() {
        let err = LoadError::ReadFailure {
            source_name: "papers.txt.bz2".to_string(),
            location: "line 41".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::UnexpectedEof),
        };
        assert_eq!(err.to_string(), "cannot read papers.txt.bz2 past line 41");
        assert!(err.source().is_some());
    }

    #[test]
    fn submission_failure_keeps_cause() {
        let err = LoadError::SubmissionFailure {
            mutation: "posts".to_string(),
            batch: 3,
            source: "connection reset".into(),
        };
        assert_eq!(err.to_string(), "mutation 'posts' failed on batch 3");
        assert_eq!(err.source().unwrap().to_string(), "connection reset");
    }
}
