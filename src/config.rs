/// Records per bulk mutation when no batch size is given
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Batch size for the paper and citation passes
pub const PAPER_BATCH_SIZE: usize = 1000;

/// Malformed records logged individually before the source goes quiet
pub const MALFORMED_LOG_LIMIT: u64 = 10;

/// Number of records in the DBLP v11 dump, used only to size progress bars
pub const EXPECTED_PAPER_COUNT: u64 = 4_107_341;

pub const DEFAULT_BOLT_URI: &str = "bolt://localhost:7687";

pub const DEFAULT_USER: &str = "neo4j";

/// Root directory holding `<board>/<Table>.xml` exports
pub const DEFAULT_DATA_DIR: &str = "data";

pub const DEFAULT_BOARDS: &[&str] = &["ai", "cstheory", "datascience", "stats"];

/// Attempts made to reach Neo4j before giving up
pub const CONNECT_MAX_RETRIES: u32 = 10;

pub const CONNECT_RETRY_DELAY_SECS: u64 = 3;

/// Progress bar redraw interval
pub const PROGRESS_TICK_MS: u64 = 100;
