//! Token index and metadata stores, and the atomic record append over both.
//!
//! The token index never sees the text again after tokenising it; the
//! metadata table carries the location of each record. Both are keyed by the
//! same [`RecordId`], which is the join key at query time.
//!
//! [`RecordStore::append`] applies a batch in two phases: every record is
//! checked against both stores first, and only if all checks pass is the
//! batch inserted. Inserts after a successful check cannot fail, so a batch
//! is either fully visible in both stores or not visible at all.
//!
//! Several batches can be grouped under a [`Savepoint`]; rolling back to it
//! removes everything appended since, so a file split into batches is still
//! all-or-nothing.

use crate::document::Language;
use crate::error::{IndexError, Result};
use crate::stream::{IndexRecord, RecordId};
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

/// Contentless full-text side: `insert(id, text)`.
pub trait TokenStore {
    /// Check that `insert(id, text)` would succeed, without mutating.
    fn check_insert(&self, id: RecordId, text: &str) -> Result<()>;

    /// Insert a record that passed [`TokenStore::check_insert`].
    fn insert(&mut self, id: RecordId, text: &str);

    /// Undo an earlier `insert(id, text)`.
    fn remove(&mut self, id: RecordId, text: &str);
}

/// Metadata side, primary-keyed by record id.
pub trait MetadataStore {
    /// Check that `insert(row)` would succeed, without mutating.
    fn check_insert(&self, row: &MetadataRow) -> Result<()>;

    /// Insert a row that passed [`MetadataStore::check_insert`].
    fn insert(&mut self, row: MetadataRow);

    /// Undo an earlier insert of the row with this id.
    fn remove(&mut self, id: RecordId);
}

/// One row of the metadata table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct MetadataRow {
    pub id: RecordId,
    pub filename: String,
    /// `"page-entry"`.
    pub position_label: String,
    pub language: Language,
    pub category: String,
    pub level: u32,
    pub node_key: String,
}

impl From<&IndexRecord> for MetadataRow {
    fn from(record: &IndexRecord) -> Self {
        Self {
            id: record.id,
            filename: record.filename.clone(),
            position_label: record.position_label(),
            language: record.language,
            category: record.category.clone(),
            level: record.level,
            node_key: record.node_key.clone(),
        }
    }
}

/// Split text into index terms: Unicode words, lowercased.
///
/// Word segmentation keeps combining marks and joiners attached, so
/// Sinhala syllables with vowel signs stay whole.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.unicode_words().map(str::to_lowercase)
}

/// Postings-only text index.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Encode, Decode)]
pub struct ContentlessIndex {
    postings: BTreeMap<String, Vec<RecordId>>,
    documents: u64,
    tokens: u64,
}

impl ContentlessIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of records containing `term`, ascending.
    pub fn postings(&self, term: &str) -> &[RecordId] {
        self.postings
            .get(&term.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn document_count(&self) -> u64 {
        self.documents
    }

    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    pub fn token_count(&self) -> u64 {
        self.tokens
    }
}

impl TokenStore for ContentlessIndex {
    fn check_insert(&self, id: RecordId, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(IndexError::StoreRejected {
                id,
                reason: "empty text".to_string(),
            });
        }
        Ok(())
    }

    fn insert(&mut self, id: RecordId, text: &str) {
        let mut seen = BTreeSet::new();
        for term in tokenize(text) {
            self.tokens += 1;
            if seen.insert(term.clone()) {
                self.postings.entry(term).or_default().push(id);
            }
        }
        self.documents += 1;
    }

    fn remove(&mut self, id: RecordId, text: &str) {
        let mut seen = BTreeSet::new();
        for term in tokenize(text) {
            self.tokens = self.tokens.saturating_sub(1);
            if !seen.insert(term.clone()) {
                continue;
            }
            if let Some(ids) = self.postings.get_mut(&term) {
                ids.retain(|posted| *posted != id);
                if ids.is_empty() {
                    self.postings.remove(&term);
                }
            }
        }
        self.documents = self.documents.saturating_sub(1);
    }
}

/// Metadata rows with secondary lookups by filename and language.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Encode, Decode)]
pub struct MetaTable {
    rows: BTreeMap<RecordId, MetadataRow>,
    by_filename: BTreeMap<String, Vec<RecordId>>,
    by_language: BTreeMap<Language, Vec<RecordId>>,
}

impl MetaTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: RecordId) -> Option<&MetadataRow> {
        self.rows.get(&id)
    }

    pub fn ids_for_filename(&self, filename: &str) -> &[RecordId] {
        self.by_filename
            .get(filename)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn ids_for_language(&self, language: Language) -> &[RecordId] {
        self.by_language
            .get(&language)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.by_filename.len()
    }

    pub fn rows(&self) -> impl Iterator<Item = &MetadataRow> {
        self.rows.values()
    }
}

impl MetadataStore for MetaTable {
    fn check_insert(&self, row: &MetadataRow) -> Result<()> {
        if self.rows.contains_key(&row.id) {
            return Err(IndexError::DuplicateId(row.id));
        }
        Ok(())
    }

    fn insert(&mut self, row: MetadataRow) {
        self.by_filename
            .entry(row.filename.clone())
            .or_default()
            .push(row.id);
        self.by_language.entry(row.language).or_default().push(row.id);
        self.rows.insert(row.id, row);
    }

    fn remove(&mut self, id: RecordId) {
        let Some(row) = self.rows.remove(&id) else {
            return;
        };
        remove_id(&mut self.by_filename, &row.filename, id);
        remove_id(&mut self.by_language, &row.language, id);
    }
}

fn remove_id<K: Ord>(lookup: &mut BTreeMap<K, Vec<RecordId>>, key: &K, id: RecordId) {
    if let Some(ids) = lookup.get_mut(key) {
        ids.retain(|kept| *kept != id);
        if ids.is_empty() {
            lookup.remove(key);
        }
    }
}

/// State of a [`RecordStore`] to roll back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Savepoint {
    last_id: Option<RecordId>,
    batches: usize,
}

/// Both stores behind one append operation.
#[derive(Debug, Default)]
pub struct RecordStore<T = ContentlessIndex, M = MetaTable> {
    tokens: T,
    metadata: M,
    last_id: Option<RecordId>,
    batches: usize,
    /// Records appended since the last savepoint, when one is open.
    journal: Option<Vec<(RecordId, String)>>,
}

impl RecordStore {
    /// Empty in-memory stores.
    pub fn new() -> Self {
        Self::with_stores(ContentlessIndex::new(), MetaTable::new())
    }
}

impl<T: TokenStore, M: MetadataStore> RecordStore<T, M> {
    pub fn with_stores(tokens: T, metadata: M) -> Self {
        Self {
            tokens,
            metadata,
            last_id: None,
            batches: 0,
            journal: None,
        }
    }

    /// Append a batch to both stores as one unit.
    ///
    /// Ids must be strictly increasing within the batch and continue after
    /// the last committed id. On error nothing from the batch is applied.
    pub fn append(&mut self, batch: &[IndexRecord]) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut rows = Vec::with_capacity(batch.len());
        let mut previous = self.last_id;

        for record in batch {
            if let Some(previous) = previous {
                if record.id <= previous {
                    return Err(IndexError::IdOrder {
                        id: record.id,
                        previous,
                    });
                }
            }

            let row = MetadataRow::from(record);
            self.tokens.check_insert(record.id, &record.clean_text)?;
            self.metadata.check_insert(&row)?;

            rows.push(row);
            previous = Some(record.id);
        }

        for (record, row) in batch.iter().zip(rows) {
            self.tokens.insert(record.id, &record.clean_text);
            self.metadata.insert(row);
            if let Some(journal) = self.journal.as_mut() {
                journal.push((record.id, record.clean_text.clone()));
            }
        }

        self.last_id = previous;
        self.batches += 1;
        debug!(records = batch.len(), last_id = ?self.last_id, "committed batch");

        Ok(batch.len())
    }

    /// Start tracking appends so they can be undone together.
    ///
    /// Opening a savepoint releases the previous one.
    pub fn savepoint(&mut self) -> Savepoint {
        self.journal = Some(Vec::new());
        Savepoint {
            last_id: self.last_id,
            batches: self.batches,
        }
    }

    /// Remove every record appended since `savepoint` from both stores.
    ///
    /// Returns the number of records removed.
    pub fn rollback_to(&mut self, savepoint: Savepoint) -> usize {
        let journal = self.journal.take().unwrap_or_default();
        for (id, text) in journal.iter().rev() {
            self.tokens.remove(*id, text);
            self.metadata.remove(*id);
        }

        self.last_id = savepoint.last_id;
        self.batches = savepoint.batches;
        debug!(records = journal.len(), last_id = ?self.last_id, "rolled back");

        journal.len()
    }

    /// Last committed id, if any.
    pub fn last_id(&self) -> Option<RecordId> {
        self.last_id
    }

    /// Number of non-empty batches committed.
    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn tokens(&self) -> &T {
        &self.tokens
    }

    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    pub fn into_parts(self) -> (T, M) {
        (self.tokens, self.metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Position;

    fn record(id: RecordId, text: &str) -> IndexRecord {
        IndexRecord {
            id,
            filename: "dn-1".to_string(),
            position: Position::new(0, id as u32),
            language: Language::Pali,
            category: "paragraph".to_string(),
            level: 0,
            node_key: "dn-1".to_string(),
            clean_text: text.to_string(),
        }
    }

    /// Token store that rejects one specific id.
    struct RejectingTokens {
        inner: ContentlessIndex,
        reject: RecordId,
    }

    impl TokenStore for RejectingTokens {
        fn check_insert(&self, id: RecordId, text: &str) -> Result<()> {
            if id == self.reject {
                return Err(IndexError::StoreRejected {
                    id,
                    reason: "simulated failure".to_string(),
                });
            }
            self.inner.check_insert(id, text)
        }

        fn insert(&mut self, id: RecordId, text: &str) {
            self.inner.insert(id, text);
        }

        fn remove(&mut self, id: RecordId, text: &str) {
            self.inner.remove(id, text);
        }
    }

    #[test]
    fn test_append_aligns_ids() {
        let mut store = RecordStore::new();
        store
            .append(&[record(1, "evaṃ me sutaṃ"), record(2, "ekaṃ samayaṃ bhagavā")])
            .unwrap();

        let (tokens, meta) = store.into_parts();
        assert_eq!(tokens.document_count(), 2);
        assert_eq!(meta.len(), 2);
        assert_eq!(tokens.postings("sutaṃ"), &[1]);
        assert_eq!(tokens.postings("Bhagavā"), &[2]);
        assert_eq!(meta.get(2).unwrap().position_label, "0-2");
    }

    #[test]
    fn test_failure_mid_batch_applies_nothing() {
        let tokens = RejectingTokens {
            inner: ContentlessIndex::new(),
            reject: 3,
        };
        let mut store = RecordStore::with_stores(tokens, MetaTable::new());

        store.append(&[record(1, "first")]).unwrap();

        let err = store
            .append(&[record(2, "second"), record(3, "third"), record(4, "fourth")])
            .unwrap_err();
        assert!(matches!(err, IndexError::StoreRejected { id: 3, .. }));

        assert_eq!(store.last_id(), Some(1));
        assert_eq!(store.batches(), 1);
        assert_eq!(store.tokens().inner.document_count(), 1);
        assert!(store.tokens().inner.postings("second").is_empty());
        assert_eq!(store.metadata().len(), 1);
        assert!(store.metadata().get(2).is_none());

        store.append(&[record(5, "fifth")]).unwrap();
        assert_eq!(store.metadata().len(), 2);
    }

    #[test]
    fn test_ids_must_increase() {
        let mut store = RecordStore::new();
        store.append(&[record(5, "five")]).unwrap();

        assert!(matches!(
            store.append(&[record(5, "again")]),
            Err(IndexError::IdOrder { id: 5, previous: 5 })
        ));
        assert!(matches!(
            store.append(&[record(7, "seven"), record(6, "six")]),
            Err(IndexError::IdOrder { id: 6, previous: 7 })
        ));
        assert_eq!(store.metadata().len(), 1);
    }

    #[test]
    fn test_duplicate_primary_key_rejected() {
        let mut meta = MetaTable::new();
        let row = MetadataRow::from(&record(1, "x"));
        meta.check_insert(&row).unwrap();
        meta.insert(row.clone());
        assert!(matches!(
            meta.check_insert(&row),
            Err(IndexError::DuplicateId(1))
        ));
    }

    #[test]
    fn test_secondary_lookups() {
        let mut store = RecordStore::new();
        let mut sinh = record(2, "නමෝ තස්ස");
        sinh.language = Language::Sinh;
        sinh.filename = "dn-2".to_string();
        store.append(&[record(1, "namo tassa"), sinh]).unwrap();

        let meta = store.metadata();
        assert_eq!(meta.ids_for_filename("dn-1"), &[1]);
        assert_eq!(meta.ids_for_filename("dn-2"), &[2]);
        assert_eq!(meta.ids_for_language(Language::Sinh), &[2]);
        assert_eq!(meta.file_count(), 2);
        assert_eq!(store.tokens().postings("නමෝ"), &[2]);
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let mut store = RecordStore::new();
        assert_eq!(store.append(&[]).unwrap(), 0);
        assert_eq!(store.batches(), 0);
    }

    #[test]
    fn test_rollback_removes_batches_since_savepoint() {
        let mut store = RecordStore::new();
        store.append(&[record(1, "evaṃ me sutaṃ")]).unwrap();

        let savepoint = store.savepoint();
        store.append(&[record(2, "sutaṃ sutaṃ"), record(3, "bhagavā")]).unwrap();
        store.append(&[record(4, "rājagahe")]).unwrap();

        assert_eq!(store.rollback_to(savepoint), 3);
        assert_eq!(store.last_id(), Some(1));
        assert_eq!(store.batches(), 1);

        let tokens = store.tokens();
        assert_eq!(tokens.document_count(), 1);
        assert_eq!(tokens.token_count(), 3);
        assert_eq!(tokens.postings("sutaṃ"), &[1]);
        assert!(tokens.postings("bhagavā").is_empty());
        assert_eq!(tokens.term_count(), 3);

        let meta = store.metadata();
        assert_eq!(meta.len(), 1);
        assert_eq!(meta.ids_for_filename("dn-1"), &[1]);
        assert!(meta.get(4).is_none());

        // Ids after the savepoint can be appended again.
        store.append(&[record(2, "ekaṃ samayaṃ")]).unwrap();
        assert_eq!(store.metadata().len(), 2);
    }

    #[test]
    fn test_rollback_without_appends() {
        let mut store = RecordStore::new();
        store.append(&[record(1, "namo")]).unwrap();
        let savepoint = store.savepoint();
        assert_eq!(store.rollback_to(savepoint), 0);
        assert_eq!(store.metadata().len(), 1);
    }

    #[test]
    fn test_repeated_terms_posted_once() {
        let mut index = ContentlessIndex::new();
        index.insert(1, "iti iti pi so");
        assert_eq!(index.postings("iti"), &[1]);
        assert_eq!(index.token_count(), 4);
        assert_eq!(index.term_count(), 3);
    }
}
