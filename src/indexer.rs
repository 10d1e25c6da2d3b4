//! Corpus indexer - runs the whole pipeline once.
//!
//! 1. Load the section tree into per-file sorted anchors
//! 2. Visit every `*.json` document in the input folder, in name order
//! 3. Stream each document's entries into records (cleaned, numbered, placed)
//! 4. Commit records to the token index and metadata table in atomic batches
//! 5. Write the finished database over the previous artifact
//!
//! A document that cannot be read, lacks pages or fails to commit is skipped
//! with a warning, and any of its batches already committed are rolled back.
//! Only startup problems abort the run.

use crate::config::Config;
use crate::document::SourceDocument;
use crate::error::{IndexError, Result};
use crate::persistence::{self, IndexDatabase};
use crate::store::{MetadataStore, RecordStore, TokenStore};
use crate::stream::{EntryStream, IdAllocator, IndexRecord};
use crate::suggestions::WordFrequency;
use crate::tree::AnchorIndex;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A document left out of the index, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub file: String,
    pub reason: String,
}

/// What a run did.
#[derive(Debug, Clone, Default)]
pub struct IndexSummary {
    pub files_found: usize,
    pub files_processed: usize,
    pub entries_indexed: usize,
    /// Entries with no text left after cleaning.
    pub entries_dropped: usize,
    pub batches_committed: usize,
    pub skipped: Vec<SkippedFile>,
    pub suggestions: usize,
    pub elapsed: Duration,
}

/// Per-file outcome before it is folded into the summary.
struct FileOutcome {
    indexed: usize,
    dropped: usize,
}

/// Drives one full indexing run.
pub struct CorpusIndexer {
    config: Config,
    anchors: AnchorIndex,
}

impl CorpusIndexer {
    /// Validate the configuration and load the tree.
    ///
    /// Every error here is fatal and happens before any output exists.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let anchors = AnchorIndex::load(&config.paths.tree)?;
        info!(
            files = anchors.file_count(),
            anchors = anchors.anchor_count(),
            "loaded tree index"
        );
        Ok(Self { config, anchors })
    }

    /// Run the pipeline and write the database to the configured output.
    pub fn run(&self) -> Result<IndexSummary> {
        let files = list_documents(&self.config.paths.input_dir)?;
        let (db, summary) = self.build(&files);
        persistence::save_database(&db, &self.config.paths.output)?;
        info!(output = %self.config.paths.output.display(), "index written");
        Ok(summary)
    }

    /// Index `files` into fresh in-memory stores and assemble the database.
    pub fn build(&self, files: &[PathBuf]) -> (IndexDatabase, IndexSummary) {
        let (store, frequency, mut summary) = self.index_files(files, RecordStore::new());
        let (fts, meta) = store.into_parts();

        let suggestions = frequency.map(|f| f.into_table(&self.config.suggestions));
        summary.suggestions = suggestions.as_ref().map_or(0, |s| s.len());

        let db = IndexDatabase {
            edition_id: self.config.edition.id.clone(),
            edition_name: self.config.edition.name.clone(),
            fts,
            meta,
            suggestions,
        };

        (db, summary)
    }

    /// Index every file into `store`; per-file failures are recorded, not returned.
    pub fn index_files<T: TokenStore, M: MetadataStore>(
        &self,
        files: &[PathBuf],
        mut store: RecordStore<T, M>,
    ) -> (RecordStore<T, M>, Option<WordFrequency>, IndexSummary) {
        let start = Instant::now();
        let mut ids = IdAllocator::new();
        let mut frequency = self
            .config
            .suggestions
            .enabled
            .then(WordFrequency::new);
        let mut summary = IndexSummary {
            files_found: files.len(),
            ..Default::default()
        };

        info!(files = files.len(), "indexing documents");

        for path in files {
            let name = crate::document::file_key(path);

            let savepoint = store.savepoint();
            let mut words = frequency.is_some().then(WordFrequency::new);

            match self.index_file(path, &mut ids, &mut store, words.as_mut()) {
                Ok(outcome) => {
                    if let (Some(frequency), Some(words)) = (frequency.as_mut(), words) {
                        frequency.merge(words);
                    }

                    summary.files_processed += 1;
                    summary.entries_indexed += outcome.indexed;
                    summary.entries_dropped += outcome.dropped;
                    debug!(file = %name, entries = outcome.indexed, "indexed file");

                    if summary.files_processed % self.config.indexing.progress_interval.max(1) == 0 {
                        info!(
                            "progress: {}/{} files ({} entries)",
                            summary.files_processed,
                            files.len(),
                            summary.entries_indexed
                        );
                    }
                }
                Err(err) => {
                    let removed = store.rollback_to(savepoint);
                    warn!(file = %name, error = %err, rolled_back = removed, "skipping file");
                    summary.skipped.push(SkippedFile {
                        file: name,
                        reason: err.to_string(),
                    });
                }
            }
        }

        summary.batches_committed = store.batches();
        summary.elapsed = start.elapsed();

        info!(
            entries = summary.entries_indexed,
            files = summary.files_processed,
            skipped = summary.skipped.len(),
            "indexing finished"
        );

        (store, frequency, summary)
    }

    /// Index one document, committing in batches.
    ///
    /// On error the caller rolls back whatever this file committed.
    fn index_file<T: TokenStore, M: MetadataStore>(
        &self,
        path: &Path,
        ids: &mut IdAllocator,
        store: &mut RecordStore<T, M>,
        mut frequency: Option<&mut WordFrequency>,
    ) -> Result<FileOutcome> {
        let document = SourceDocument::load(path)?;
        let anchors = self.anchors.anchors_for(&document.name);
        if anchors.is_empty() {
            debug!(file = %document.name, "no tree anchors for file");
        }

        let batch_size = self.config.indexing.batch_size.unwrap_or(usize::MAX);
        let mut stream = EntryStream::new(&document, anchors, ids);
        let mut batch: Vec<IndexRecord> = Vec::new();
        let mut indexed = 0;

        for record in stream.by_ref() {
            batch.push(record);

            if batch.len() >= batch_size {
                indexed += commit(store, &batch, frequency.as_deref_mut())?;
                batch.clear();
            }
        }

        indexed += commit(store, &batch, frequency.as_deref_mut())?;

        Ok(FileOutcome {
            indexed,
            dropped: stream.dropped(),
        })
    }
}

/// Append a batch, counting its words only once it is committed.
fn commit<T: TokenStore, M: MetadataStore>(
    store: &mut RecordStore<T, M>,
    batch: &[IndexRecord],
    frequency: Option<&mut WordFrequency>,
) -> Result<usize> {
    let committed = store.append(batch)?;
    if let Some(frequency) = frequency {
        for record in batch {
            frequency.add(record.language, &record.clean_text);
        }
    }
    Ok(committed)
}

/// The `*.json` documents directly inside `dir`, sorted by file name.
pub fn list_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IndexError::InputDirNotFound(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            IndexError::io(path, e.into())
        })?;

        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path.to_path_buf());
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
