//! Citegraph: DBLP citation and StackExchange forum loader for Neo4j
//!
//! This crate streams two offline corpora into a single graph:
//!
//! 1. **Papers** -- a JSON-lines DBLP dump, loaded in two passes: papers with
//!    their authors, then CITES edges between papers once all of them exist
//! 2. **Boards** -- per-board StackExchange XML exports (`Posts`, `Comments`,
//!    `PostLinks`), with DOIs pulled from post bodies and comment text and
//!    linked to the papers they identify
//!
//! # Architecture
//!
//! Every load follows the same one-way pipeline:
//!
//! - **Record sources** -- lazy readers yielding one record at a time; malformed
//!   lines or rows are counted and skipped, never fatal
//! - **Batcher** -- fixed-size chunks in source order, one chunk buffered at a time
//! - **Bulk loader** -- submits each chunk as one parameterized mutation, strictly
//!   in order, and accounts for timing and affected counts
//! - **Graph store** -- a trait; [`store::Neo4jStore`] speaks Bolt
//!
//! Mutations are MERGE-based, so re-running a load after a failure is safe.
//!
//! # Key Modules
//!
//! - [`source`] -- The `RecordSource` trait, input opening, malformed accounting
//! - [`jsonl`] -- JSON-lines paper records
//! - [`parser`] -- Streaming `<row>` reader for StackExchange exports
//! - [`extract`] -- DOI extraction and the comment drop rule
//! - [`batch`] -- Chunking of record streams
//! - [`loader`] -- Batched submission, cancellation, load summaries
//! - [`store`] -- Graph store trait and the Neo4j client
//! - [`mutations`] -- Cypher templates for papers, citations, boards and forum rows
//! - [`pipeline`] -- Ordered paper and board loads
//! - [`queries`] -- Read-side use cases over the loaded graph
//! - [`schema`] -- Constraints and indexes
//! - [`progress`] -- Progress bars
//! - [`error`] -- Load error taxonomy
//! - [`config`] -- Defaults
//!
//! # Example Usage
//!
//! ```bash
//! citegraph schema --password secret
//! citegraph papers -i dblp_papers_v11.txt --password secret
//! citegraph boards --data-dir data --board ai --board stats --password secret
//! citegraph query citing-posts --title backprop --password secret
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod extract;
pub mod jsonl;
pub mod loader;
pub mod models;
pub mod mutations;
pub mod parser;
pub mod pipeline;
pub mod progress;
pub mod queries;
pub mod schema;
pub mod source;
pub mod store;
