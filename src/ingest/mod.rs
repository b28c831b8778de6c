//! End-of-day trade file ingestion
//!
//! [`orchestrator::process_directory`] is the entry point. It resolves the
//! files for the last business days, then runs one worker per file inside a
//! [`group::TaskGroup`]; each worker streams its file through
//! [`parser::parse_file`] into a [`store::TradeStore`].

pub mod group;
pub mod orchestrator;
pub mod parser;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use orchestrator::{process_directory, FileOutcome, IngestOptions, IngestReport};
pub use parser::{parse_file, DEFAULT_BATCH_SIZE};
pub use store::TradeStore;
