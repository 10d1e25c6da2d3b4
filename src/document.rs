//! Source document representation.
//!
//! Each corpus file is a JSON document holding an ordered list of pages.
//! A page carries up to two language tracks (Pali and Sinhala), and each
//! track is an ordered list of entries `{text, type?, level?}`.

use crate::error::{IndexError, Result};
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Entry category used when the source omits one.
pub const DEFAULT_CATEGORY: &str = "paragraph";

/// Language of a text track.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Encode, Decode,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Pali,
    Sinh,
}

impl Language {
    /// Tracks in the order they are indexed within a page.
    pub const ALL: [Language; 2] = [Language::Pali, Language::Sinh];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Pali => "pali",
            Language::Sinh => "sinh",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry as it appears in a source file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Raw text with formatting markers.
    #[serde(default)]
    pub text: Option<String>,

    /// Entry category (paragraph, heading, gatha, ...).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Nesting depth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
}

impl SourceEntry {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn raw_text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Category, defaulting to [`DEFAULT_CATEGORY`].
    pub fn category(&self) -> &str {
        self.category
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY)
    }

    pub fn level(&self) -> u32 {
        self.level.unwrap_or(0)
    }
}

/// Entries of one language on one page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub entries: Option<Vec<SourceEntry>>,
}

impl Track {
    pub fn new(entries: Vec<SourceEntry>) -> Self {
        Self {
            entries: Some(entries),
        }
    }

    pub fn entries(&self) -> &[SourceEntry] {
        self.entries.as_deref().unwrap_or(&[])
    }
}

/// A single page in a source document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pali: Option<Track>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sinh: Option<Track>,
}

impl Page {
    pub fn new(pali: Vec<SourceEntry>, sinh: Vec<SourceEntry>) -> Self {
        Self {
            pali: Some(Track::new(pali)),
            sinh: Some(Track::new(sinh)),
        }
    }

    /// Entries of a language track; empty when the page lacks the track.
    pub fn track(&self, language: Language) -> &[SourceEntry] {
        let track = match language {
            Language::Pali => self.pali.as_ref(),
            Language::Sinh => self.sinh.as_ref(),
        };
        track.map(Track::entries).unwrap_or(&[])
    }
}

/// Raw on-disk shape; `pages` is validated after parsing.
#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    pages: Option<Vec<Page>>,
}

/// A source document: one corpus file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    /// File key (file name without the `.json` extension).
    pub name: String,
    /// Pages in document order.
    pub pages: Vec<Page>,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            name: name.into(),
            pages,
        }
    }

    /// Parse a document from JSON text.
    pub fn from_json(name: &str, json: &str) -> Result<Self> {
        let raw: RawDocument = serde_json::from_str(json)
            .map_err(|e| IndexError::malformed_document(name, e.to_string()))?;

        let pages = raw
            .pages
            .ok_or_else(|| IndexError::malformed_document(name, "no pages array found"))?;

        Ok(Self::new(name, pages))
    }

    /// Load a document file; the file key is its stem.
    pub fn load(path: &Path) -> Result<Self> {
        let name = file_key(path);
        let content = std::fs::read_to_string(path).map_err(|e| IndexError::io(path, e))?;
        Self::from_json(&name, &content)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Total entries across all pages and tracks, before cleaning.
    pub fn entry_count(&self) -> usize {
        self.pages
            .iter()
            .map(|p| Language::ALL.iter().map(|l| p.track(*l).len()).sum::<usize>())
            .sum()
    }
}

/// File key used to join documents with the tree definition.
pub fn file_key(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("untitled")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document() {
        let json = r#"{
            "filename": "dn-1",
            "pages": [
                {
                    "pageNum": 1,
                    "pali": {"entries": [{"text": "namo", "type": "centered", "level": 2}]},
                    "sinh": {"entries": [{"text": "නමෝ"}]}
                },
                {"pali": {"entries": []}}
            ]
        }"#;

        let doc = SourceDocument::from_json("dn-1", json).unwrap();
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.entry_count(), 2);

        let first = &doc.pages[0].track(Language::Pali)[0];
        assert_eq!(first.raw_text(), "namo");
        assert_eq!(first.category(), "centered");
        assert_eq!(first.level(), 2);

        let sinh = &doc.pages[0].track(Language::Sinh)[0];
        assert_eq!(sinh.category(), DEFAULT_CATEGORY);
        assert_eq!(sinh.level(), 0);

        assert!(doc.pages[1].track(Language::Sinh).is_empty());
    }

    #[test]
    fn test_missing_pages_is_malformed() {
        let err = SourceDocument::from_json("x", r#"{"text": []}"#).unwrap_err();
        assert!(matches!(err, IndexError::MalformedDocument { .. }));
        assert!(err.to_string().contains("no pages array"));
    }

    #[test]
    fn test_unparsable_is_malformed() {
        let err = SourceDocument::from_json("x", "{ pages: ").unwrap_err();
        assert!(matches!(err, IndexError::MalformedDocument { .. }));

        let err = SourceDocument::from_json("x", r#"{"pages": [null]}"#).unwrap_err();
        assert!(matches!(err, IndexError::MalformedDocument { .. }));
    }

    #[test]
    fn test_entry_without_text() {
        let doc = SourceDocument::from_json("x", r#"{"pages": [{"pali": {"entries": [{}]}}]}"#)
            .unwrap();
        assert_eq!(doc.pages[0].track(Language::Pali)[0].raw_text(), "");
    }

    #[test]
    fn test_file_key() {
        assert_eq!(file_key(Path::new("assets/text/mn-1-1.json")), "mn-1-1");
    }

    #[test]
    fn test_language_names() {
        assert_eq!(Language::Pali.to_string(), "pali");
        assert_eq!(Language::Sinh.as_str(), "sinh");
        assert_eq!(serde_json::to_string(&Language::Sinh).unwrap(), "\"sinh\"");
    }
}
