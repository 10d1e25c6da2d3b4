//! Section tree loading and per-file anchor ordering.
//!
//! The tree definition maps every node key to a positional record
//! `[pali, sinh, level, [pageIndex, entryIndex], parent, filename]`.
//! Only the filename and the position pair matter here: each node that
//! owns content becomes an [`Anchor`] marking where its section starts
//! inside that file. Anchors are grouped per file and sorted so the
//! resolver can answer "which section contains this entry" with a floor
//! search.

use crate::error::{IndexError, Result};
use crate::resolver;
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Index of the `[pageIndex, entryIndex]` slot in a node record.
const POSITION_SLOT: usize = 3;

/// Index of the filename slot in a node record.
const FILENAME_SLOT: usize = 5;

/// Location of an entry inside a source file.
///
/// Ordering is lexicographic: page first, then entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Encode, Decode,
)]
pub struct Position {
    /// Zero-based page index.
    pub page: u32,
    /// Zero-based entry index within the page's language track.
    pub entry: u32,
}

impl Position {
    pub const fn new(page: u32, entry: u32) -> Self {
        Self { page, entry }
    }

    /// Debug-readable label stored in the metadata table (`"page-entry"`).
    pub fn label(&self) -> String {
        format!("{}-{}", self.page, self.entry)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.page, self.entry)
    }
}

/// A tree node's claimed starting position within one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    /// Node key from the tree definition.
    pub key: String,
    /// Where the node's section starts.
    pub position: Position,
}

impl Anchor {
    pub fn new(key: impl Into<String>, position: Position) -> Self {
        Self {
            key: key.into(),
            position,
        }
    }
}

/// Anchors grouped by file, each group sorted ascending by position.
#[derive(Debug, Clone, Default)]
pub struct AnchorIndex {
    files: HashMap<String, Vec<Anchor>>,
}

impl AnchorIndex {
    /// Build the index from an in-memory tree definition.
    ///
    /// The definition must be a JSON object of node records. Nodes without
    /// a filename are structural and skipped; a content node whose position
    /// cannot be read makes the whole definition malformed.
    pub fn build(definition: &Value) -> Result<Self> {
        let nodes = definition.as_object().ok_or_else(|| {
            IndexError::MalformedTree("top level is not an object of node records".to_string())
        })?;

        let mut files: HashMap<String, Vec<Anchor>> = HashMap::new();

        for (key, record) in nodes {
            let fields = record.as_array().ok_or_else(|| {
                IndexError::MalformedTree(format!("node '{}' is not an array record", key))
            })?;

            let Some(filename) = node_filename(fields) else {
                continue;
            };

            let position = node_position(fields).ok_or_else(|| {
                IndexError::MalformedTree(format!(
                    "node '{}' has no valid [pageIndex, entryIndex] pair",
                    key
                ))
            })?;

            files
                .entry(filename.to_string())
                .or_default()
                .push(Anchor::new(key.as_str(), position));
        }

        for anchors in files.values_mut() {
            anchors.sort_by_key(|a| a.position);
        }

        Ok(Self { files })
    }

    /// Parse a tree definition from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let definition: Value = serde_json::from_str(json)
            .map_err(|e| IndexError::MalformedTree(e.to_string()))?;
        Self::build(&definition)
    }

    /// Load the tree definition file.
    ///
    /// A missing file is reported as [`IndexError::TreeNotFound`]; both
    /// outcomes are fatal for a run.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(IndexError::TreeNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|e| IndexError::io(path, e))?;
        Self::from_json(&content)
    }

    /// Sorted anchors for a file; empty when the tree knows nothing about it.
    pub fn anchors_for(&self, filename: &str) -> &[Anchor] {
        self.files.get(filename).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Containing node key for a position in a file.
    pub fn node_key_for(&self, filename: &str, position: Position) -> &str {
        resolver::resolve(self.anchors_for(filename), position)
    }

    /// Number of files that own at least one anchor.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Total number of anchors across all files.
    pub fn anchor_count(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }
}

fn node_filename(fields: &[Value]) -> Option<&str> {
    fields
        .get(FILENAME_SLOT)
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
}

fn node_position(fields: &[Value]) -> Option<Position> {
    let pair = fields.get(POSITION_SLOT)?.as_array()?;
    if pair.len() < 2 {
        return None;
    }
    let page = u32::try_from(pair[0].as_u64()?).ok()?;
    let entry = u32::try_from(pair[1].as_u64()?).ok()?;
    Some(Position::new(page, entry))
}
