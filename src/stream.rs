//! Entry stream: turns a source document into index records.
//!
//! Pages are visited in order; within a page the Pali track comes before
//! the Sinhala track, and entries keep their source order. Each entry is
//! cleaned, and if anything is left it receives the next id from the
//! run's [`IdAllocator`] and the key of the section that contains it.

use crate::document::{Language, SourceDocument, SourceEntry};
use crate::resolver;
use crate::text;
use crate::tree::{Anchor, Position};
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Identifier shared by a token-index entry and its metadata row.
pub type RecordId = u64;

/// Hands out strictly increasing record ids for one run.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: RecordId,
}

impl IdAllocator {
    /// Ids start at 1.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: RecordId) -> Self {
        Self { next: first }
    }

    pub fn allocate(&mut self) -> RecordId {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Id the next allocation will return.
    pub fn peek(&self) -> RecordId {
        self.next
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// The unit committed to both stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct IndexRecord {
    pub id: RecordId,
    pub filename: String,
    pub position: Position,
    pub language: Language,
    pub category: String,
    pub level: u32,
    /// Containing section; empty only when the file has no anchors.
    pub node_key: String,
    pub clean_text: String,
}

impl IndexRecord {
    /// `"page-entry"` label stored in the metadata table.
    pub fn position_label(&self) -> String {
        self.position.label()
    }
}

/// Lazy iterator of [`IndexRecord`]s for one document.
pub struct EntryStream<'a> {
    document: &'a SourceDocument,
    anchors: &'a [Anchor],
    ids: &'a mut IdAllocator,
    page: usize,
    language: usize,
    entry: usize,
    dropped: usize,
}

impl<'a> EntryStream<'a> {
    pub fn new(
        document: &'a SourceDocument,
        anchors: &'a [Anchor],
        ids: &'a mut IdAllocator,
    ) -> Self {
        Self {
            document,
            anchors,
            ids,
            page: 0,
            language: 0,
            entry: 0,
            dropped: 0,
        }
    }

    /// Entries skipped so far because nothing was left after cleaning.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Next raw entry with its language and position, advancing the cursor.
    fn next_entry(&mut self) -> Option<(Language, Position, &'a SourceEntry)> {
        let document: &'a SourceDocument = self.document;
        let pages = &document.pages;

        while self.page < pages.len() {
            let page = &pages[self.page];

            while self.language < Language::ALL.len() {
                let language = Language::ALL[self.language];
                let entries = page.track(language);

                if self.entry < entries.len() {
                    let position = Position::new(to_u32(self.page), to_u32(self.entry));
                    let entry = &entries[self.entry];
                    self.entry += 1;
                    return Some((language, position, entry));
                }

                self.language += 1;
                self.entry = 0;
            }

            self.page += 1;
            self.language = 0;
        }

        None
    }
}

impl Iterator for EntryStream<'_> {
    type Item = IndexRecord;

    fn next(&mut self) -> Option<IndexRecord> {
        loop {
            let (language, position, entry) = self.next_entry()?;

            let clean_text = text::clean_for_indexing(entry.raw_text());
            if clean_text.is_empty() {
                self.dropped += 1;
                continue;
            }

            return Some(IndexRecord {
                id: self.ids.allocate(),
                filename: self.document.name.clone(),
                position,
                language,
                category: entry.category().to_string(),
                level: entry.level(),
                node_key: resolver::resolve(self.anchors, position).to_string(),
                clean_text,
            });
        }
    }
}

fn to_u32(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}
