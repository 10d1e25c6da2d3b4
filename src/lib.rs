//! Canon FTS Indexer - full-text index builder for a paged canonical corpus.
//!
//! The corpus is a set of JSON documents (pages of Pali and Sinhala
//! entries) plus a section tree whose nodes are anchored at
//! `(page, entry)` positions inside those documents. One run produces a
//! contentless token index and a metadata table that share record ids,
//! where each metadata row records the section that contains the entry.
//!
//! # Quick Start
//!
//! ```no_run
//! use canon_fts_indexer::{config::Config, indexer::CorpusIndexer};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let indexer = CorpusIndexer::new(config)?;
//!     let summary = indexer.run()?;
//!
//!     println!(
//!         "indexed {} entries from {} files",
//!         summary.entries_indexed, summary.files_processed
//!     );
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **AnchorIndex**: per-file section anchors, sorted by position
//! - **resolver**: floor search from a position to its containing section
//! - **EntryStream**: cleans, numbers and places the entries of one document
//! - **RecordStore**: atomic batch append over the token and metadata stores
//! - **CorpusIndexer**: the full run, file by file

pub mod config;
pub mod document;
pub mod error;
pub mod indexer;
pub mod persistence;
pub mod resolver;
pub mod store;
pub mod stream;
pub mod suggestions;
pub mod text;
pub mod tree;

// Re-export commonly used types
pub use config::Config;
pub use document::{Language, SourceDocument};
pub use error::{IndexError, Result};
pub use indexer::{CorpusIndexer, IndexSummary};
pub use persistence::{IndexDatabase, load_database, save_database};
pub use store::RecordStore;
pub use stream::{EntryStream, IdAllocator, IndexRecord, RecordId};
pub use tree::{Anchor, AnchorIndex, Position};
