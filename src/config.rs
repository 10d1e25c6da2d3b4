//! Configuration for the corpus indexer.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values, and
//! command-line flags take precedence over both.

use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Input and output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Section tree definition (node key -> positional record).
    pub tree: PathBuf,

    /// Folder holding one JSON document per corpus file.
    pub input_dir: PathBuf,

    /// Index artifact to (re)create.
    pub output: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            tree: PathBuf::from("assets/data/tree.json"),
            input_dir: PathBuf::from("assets/text"),
            output: PathBuf::from("assets/databases/fts-index.bin"),
        }
    }
}

/// Edition identity stored in the artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditionConfig {
    pub id: String,
    pub name: String,
}

impl Default for EditionConfig {
    fn default() -> Self {
        Self {
            id: "bjt".to_string(),
            name: "Buddha Jayanti Tripitaka".to_string(),
        }
    }
}

/// Batching and progress reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Records per atomic batch; `None` commits one batch per file.
    pub batch_size: Option<usize>,

    /// Log a progress line every this many files.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
}

fn default_progress_interval() -> usize {
    50
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            batch_size: None,
            progress_interval: default_progress_interval(),
        }
    }
}

/// Auto-complete word table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionsConfig {
    pub enabled: bool,

    /// Words seen fewer times than this are dropped.
    #[serde(default = "default_min_frequency")]
    pub min_frequency: u64,

    #[serde(default = "default_max_per_language")]
    pub max_per_language: usize,
}

fn default_min_frequency() -> u64 {
    3
}

fn default_max_per_language() -> usize {
    50_000
}

impl Default for SuggestionsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_frequency: default_min_frequency(),
            max_per_language: default_max_per_language(),
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub paths: PathsConfig,
    pub edition: EditionConfig,
    pub indexing: IndexingConfig,
    pub suggestions: SuggestionsConfig,
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    paths: Option<PathsFileSection>,
    edition: Option<EditionFileSection>,
    indexing: Option<IndexingFileSection>,
    suggestions: Option<SuggestionsFileSection>,
}

#[derive(Debug, Deserialize)]
struct PathsFileSection {
    tree: Option<PathBuf>,
    input_dir: Option<PathBuf>,
    output: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct EditionFileSection {
    id: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IndexingFileSection {
    batch_size: Option<usize>,
    progress_interval: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct SuggestionsFileSection {
    enabled: Option<bool>,
    min_frequency: Option<u64>,
    max_per_language: Option<usize>,
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (FTS_TREE_PATH, FTS_INPUT_DIR, FTS_OUTPUT_PATH, ...)
    /// 2. Config file (`explicit`, or ~/.config/fts-indexer/config.yaml)
    /// 3. Default values
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => match Self::config_file_path() {
                Some(path) if path.exists() => Self::load_from_file(&path)?,
                _ => Config::default(),
            },
        };

        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| IndexError::io(path, e))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text, filling gaps with defaults.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file_config: ConfigFile = serde_yaml::from_str(content)
            .map_err(|e| IndexError::Config(format!("Failed to parse config file: {}", e)))?;

        let mut config = Config::default();

        if let Some(paths) = file_config.paths {
            if let Some(tree) = paths.tree {
                config.paths.tree = tree;
            }
            if let Some(input_dir) = paths.input_dir {
                config.paths.input_dir = input_dir;
            }
            if let Some(output) = paths.output {
                config.paths.output = output;
            }
        }

        if let Some(edition) = file_config.edition {
            if let Some(id) = edition.id {
                config.edition.id = id;
            }
            if let Some(name) = edition.name {
                config.edition.name = name;
            }
        }

        if let Some(indexing) = file_config.indexing {
            if indexing.batch_size.is_some() {
                config.indexing.batch_size = indexing.batch_size;
            }
            if let Some(interval) = indexing.progress_interval {
                config.indexing.progress_interval = interval;
            }
        }

        if let Some(suggestions) = file_config.suggestions {
            if let Some(enabled) = suggestions.enabled {
                config.suggestions.enabled = enabled;
            }
            if let Some(min) = suggestions.min_frequency {
                config.suggestions.min_frequency = min;
            }
            if let Some(max) = suggestions.max_per_language {
                config.suggestions.max_per_language = max;
            }
        }

        Ok(config)
    }

    /// Override values from the environment.
    fn apply_env(&mut self) -> Result<()> {
        if let Ok(tree) = env::var("FTS_TREE_PATH") {
            self.paths.tree = PathBuf::from(tree);
        }

        if let Ok(input_dir) = env::var("FTS_INPUT_DIR") {
            self.paths.input_dir = PathBuf::from(input_dir);
        }

        if let Ok(output) = env::var("FTS_OUTPUT_PATH") {
            self.paths.output = PathBuf::from(output);
        }

        if let Ok(id) = env::var("FTS_EDITION_ID") {
            self.edition.id = id;
        }

        if let Ok(batch_size) = env::var("FTS_BATCH_SIZE") {
            let size = batch_size.parse().map_err(|_| {
                IndexError::Config(format!("FTS_BATCH_SIZE is not a number: '{}'", batch_size))
            })?;
            self.indexing.batch_size = Some(size);
        }

        Ok(())
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "fts-indexer")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate settings and required inputs before anything is written.
    pub fn validate(&self) -> Result<()> {
        if !self.paths.tree.is_file() {
            return Err(IndexError::TreeNotFound(self.paths.tree.clone()));
        }

        if !self.paths.input_dir.is_dir() {
            return Err(IndexError::InputDirNotFound(self.paths.input_dir.clone()));
        }

        if self.indexing.batch_size == Some(0) {
            return Err(IndexError::Config(
                "Batch size must be at least 1. Omit it to commit one batch per file.".to_string(),
            ));
        }

        if self.indexing.progress_interval == 0 {
            return Err(IndexError::Config(
                "Progress interval must be at least 1.".to_string(),
            ));
        }

        if self.edition.id.is_empty() {
            return Err(IndexError::Config("Edition id is required.".to_string()));
        }

        Ok(())
    }

    /// Create a config from explicit paths (useful for testing).
    pub fn with_paths(
        tree: impl Into<PathBuf>,
        input_dir: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            paths: PathsConfig {
                tree: tree.into(),
                input_dir: input_dir.into(),
                output: output.into(),
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.paths.tree, PathBuf::from("assets/data/tree.json"));
        assert_eq!(config.edition.id, "bjt");
        assert_eq!(config.indexing.batch_size, None);
        assert_eq!(config.indexing.progress_interval, 50);
        assert!(!config.suggestions.enabled);
        assert_eq!(config.suggestions.min_frequency, 3);
        assert_eq!(config.suggestions.max_per_language, 50_000);
    }

    #[test]
    fn test_from_yaml_partial() {
        let yaml = r#"
paths:
  input_dir: corpus/text
indexing:
  batch_size: 500
suggestions:
  enabled: true
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.paths.input_dir, PathBuf::from("corpus/text"));
        assert_eq!(config.paths.tree, PathBuf::from("assets/data/tree.json"));
        assert_eq!(config.indexing.batch_size, Some(500));
        assert!(config.suggestions.enabled);
        assert_eq!(config.suggestions.min_frequency, 3);
    }

    #[test]
    fn test_from_yaml_invalid() {
        assert!(matches!(
            Config::from_yaml("paths: [1, 2"),
            Err(IndexError::Config(_))
        ));
    }

    #[test]
    fn test_validate_missing_inputs() {
        let config = Config::with_paths("/nonexistent/tree.json", "/nonexistent/text", "out.bin");
        assert!(matches!(
            config.validate(),
            Err(IndexError::TreeNotFound(_))
        ));

        let dir = TempDir::new().unwrap();
        let tree = dir.path().join("tree.json");
        std::fs::write(&tree, "{}").unwrap();
        let config = Config::with_paths(&tree, dir.path().join("missing"), "out.bin");
        assert!(matches!(
            config.validate(),
            Err(IndexError::InputDirNotFound(_))
        ));
    }

    #[test]
    fn test_validate_batch_size() {
        let dir = TempDir::new().unwrap();
        let tree = dir.path().join("tree.json");
        std::fs::write(&tree, "{}").unwrap();

        let mut config = Config::with_paths(&tree, dir.path(), dir.path().join("out.bin"));
        config.validate().unwrap();

        config.indexing.batch_size = Some(0);
        assert!(matches!(config.validate(), Err(IndexError::Config(_))));
    }
}
