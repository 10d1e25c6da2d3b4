//! Persistence layer for the finished index artifact.
//!
//! Supports both JSON (human-readable) and bincode (efficient binary) formats.
//! Every run recreates the artifact from scratch: the new database is
//! written next to the target and renamed over it.

use crate::error::{IndexError, Result};
use crate::store::{ContentlessIndex, MetaTable};
use crate::suggestions::SuggestionTable;
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Save format for index artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    /// JSON format (human-readable, larger).
    Json,
    /// Bincode format (binary, compact).
    Bincode,
}

impl SaveFormat {
    /// Determine format from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => SaveFormat::Json,
            _ => SaveFormat::Bincode,
        }
    }
}

/// Everything one run produces for an edition.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct IndexDatabase {
    pub edition_id: String,
    pub edition_name: String,
    /// Contentless full-text index.
    pub fts: ContentlessIndex,
    /// Location and section of every indexed record.
    pub meta: MetaTable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<SuggestionTable>,
}

/// Save an index database, replacing any previous artifact at `path`.
pub fn save_database(db: &IndexDatabase, path: &Path) -> Result<()> {
    let format = SaveFormat::from_path(path);
    save_database_with_format(db, path, format)
}

/// Save an index database with specific format.
pub fn save_database_with_format(db: &IndexDatabase, path: &Path, format: SaveFormat) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| IndexError::io(parent, e))?;
        }
    }

    let data = match format {
        SaveFormat::Json => serde_json::to_string_pretty(db)
            .map_err(|e| IndexError::Serialization(e.to_string()))?
            .into_bytes(),
        SaveFormat::Bincode => {
            let config = bincode::config::standard();
            bincode::encode_to_vec(db, config)
                .map_err(|e| IndexError::Serialization(e.to_string()))?
        }
    };

    let staging = staging_path(path);
    fs::write(&staging, &data).map_err(|e| IndexError::io(&staging, e))?;
    if let Err(e) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(IndexError::io(path, e));
    }

    Ok(())
}

/// Load an index database from a file.
pub fn load_database(path: &Path) -> Result<IndexDatabase> {
    if !path.exists() {
        return Err(IndexError::IndexNotFound(path.to_path_buf()));
    }

    let format = SaveFormat::from_path(path);
    load_database_with_format(path, format)
}

/// Load an index database with specific format.
pub fn load_database_with_format(path: &Path, format: SaveFormat) -> Result<IndexDatabase> {
    let data = fs::read(path).map_err(|e| IndexError::io(path, e))?;

    let db: IndexDatabase = match format {
        SaveFormat::Json => serde_json::from_slice(&data)
            .map_err(|e| IndexError::Serialization(e.to_string()))?,
        SaveFormat::Bincode => {
            let config = bincode::config::standard();
            let (db, _): (IndexDatabase, usize) = bincode::decode_from_slice(&data, config)
                .map_err(|e| IndexError::Serialization(e.to_string()))?;
            db
        }
    };

    Ok(db)
}

/// Get the size of an index file in bytes.
pub fn database_size(path: &Path) -> Result<u64> {
    let metadata = fs::metadata(path).map_err(|e| IndexError::io(path, e))?;
    Ok(metadata.len())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Language;
    use crate::store::RecordStore;
    use crate::stream::IndexRecord;
    use crate::tree::Position;
    use tempfile::TempDir;

    fn create_test_database() -> IndexDatabase {
        let mut store = RecordStore::new();
        store
            .append(&[IndexRecord {
                id: 1,
                filename: "dn-1".to_string(),
                position: Position::new(0, 3),
                language: Language::Pali,
                category: "heading".to_string(),
                level: 2,
                node_key: "dn-1-1".to_string(),
                clean_text: "brahmajālasuttaṃ".to_string(),
            }])
            .unwrap();
        let (fts, meta) = store.into_parts();

        IndexDatabase {
            edition_id: "bjt".to_string(),
            edition_name: "Buddha Jayanti Tripitaka".to_string(),
            fts,
            meta,
            suggestions: None,
        }
    }

    #[test]
    fn test_save_and_load_bincode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.bin");

        save_database(&create_test_database(), &path).unwrap();
        let loaded = load_database(&path).unwrap();

        assert_eq!(loaded.edition_id, "bjt");
        assert_eq!(loaded.meta.get(1).unwrap().node_key, "dn-1-1");
        assert_eq!(loaded.fts.postings("brahmajālasuttaṃ"), &[1]);
    }

    #[test]
    fn test_save_and_load_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/index.json");

        save_database(&create_test_database(), &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("dn-1-1"));
        assert!(!content.contains("\"clean_text\""));

        let loaded = load_database(&path).unwrap();
        assert_eq!(loaded.meta.len(), 1);
    }

    #[test]
    fn test_save_replaces_previous_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.bin");
        fs::write(&path, b"stale bytes").unwrap();

        save_database(&create_test_database(), &path).unwrap();

        assert!(load_database(&path).is_ok());
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn test_failed_replace_removes_staging_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.bin");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), b"x").unwrap();

        let result = save_database(&create_test_database(), &path);

        assert!(matches!(result, Err(IndexError::Io { .. })));
        assert!(!staging_path(&path).exists());
        assert!(path.join("occupied").exists());
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(SaveFormat::from_path(Path::new("x.json")), SaveFormat::Json);
        assert_eq!(SaveFormat::from_path(Path::new("x.bin")), SaveFormat::Bincode);
        assert_eq!(SaveFormat::from_path(Path::new("x.db")), SaveFormat::Bincode);
    }

    #[test]
    fn test_load_nonexistent() {
        let result = load_database(Path::new("/nonexistent/index.bin"));
        assert!(matches!(result, Err(IndexError::IndexNotFound(_))));
    }

    #[test]
    fn test_database_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.bin");
        save_database(&create_test_database(), &path).unwrap();
        assert!(database_size(&path).unwrap() > 0);
    }
}
