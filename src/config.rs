//! Configuration parsing and validation.
//!
//! note-recall is configured via a TOML file (default `./config/recall.toml`).
//! Every section is optional; missing values fall back to the defaults below,
//! and a missing file is equivalent to an empty one.
//!
//! # Example
//!
//! ```toml
//! [notes]
//! root = "~/notes"
//! include_globs = ["**/*.md", "**/*.markdown"]
//! exclude_name_substrings = ["creds", "untitled"]
//!
//! [index]
//! path = "bm25s_index"
//! stopwords = "none"
//!
//! [memory]
//! history_path = "conversation_history.json"
//! index_path = "bm25s_index_memory"
//! recent_n = 5
//!
//! [retrieval]
//! notes_k = 2
//! memory_k = 2
//! ```
//!
//! The `MD_FILES` environment variable (also read from a `.env` file)
//! overrides `notes.root`.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::tokenize::Stopwords;

/// Environment variable naming the notes directory.
pub const NOTES_DIR_ENV: &str = "MD_FILES";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub notes: NotesConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotesConfig {
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    /// Case-insensitive substrings; a file whose name contains one is skipped.
    #[serde(default = "default_exclude_names")]
    pub exclude_name_substrings: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            root: None,
            include_globs: default_include_globs(),
            exclude_name_substrings: default_exclude_names(),
            follow_symlinks: false,
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string(), "**/*.markdown".to_string()]
}

fn default_exclude_names() -> Vec<String> {
    vec!["creds".to_string(), "untitled".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_path")]
    pub path: PathBuf,
    /// `"none"` or `"en"`. An index built with another setting is rebuilt.
    #[serde(default = "default_stopwords")]
    pub stopwords: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
            stopwords: default_stopwords(),
        }
    }
}

fn default_index_path() -> PathBuf {
    PathBuf::from("bm25s_index")
}
fn default_stopwords() -> String {
    "none".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct MemoryConfig {
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,
    #[serde(default = "default_memory_index_path")]
    pub index_path: PathBuf,
    #[serde(default = "default_recent_n")]
    pub recent_n: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            history_path: default_history_path(),
            index_path: default_memory_index_path(),
            recent_n: default_recent_n(),
        }
    }
}

fn default_history_path() -> PathBuf {
    PathBuf::from("conversation_history.json")
}
fn default_memory_index_path() -> PathBuf {
    PathBuf::from("bm25s_index_memory")
}
fn default_recent_n() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub notes_k: usize,
    #[serde(default = "default_k")]
    pub memory_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            notes_k: default_k(),
            memory_k: default_k(),
        }
    }
}

fn default_k() -> usize {
    2
}

/// Analysis settings shared by every index build. A persisted index whose
/// settings differ from the configured ones is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexParams {
    pub stopwords: Stopwords,
}

impl Config {
    /// Configuration with every default and no notes directory.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// The configured notes directory, or an error naming both ways to set it.
    pub fn notes_root(&self) -> Result<&Path> {
        self.notes.root.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "notes directory is not configured: set [notes].root or {}",
                NOTES_DIR_ENV
            )
        })
    }

    pub fn index_params(&self) -> Result<IndexParams> {
        Ok(IndexParams {
            stopwords: self.index.stopwords.parse()?,
        })
    }

    /// Apply environment overrides. `md_files` is the value of [`NOTES_DIR_ENV`].
    pub fn apply_overrides(&mut self, md_files: Option<String>) {
        if let Some(dir) = md_files.filter(|d| !d.trim().is_empty()) {
            self.notes.root = Some(PathBuf::from(dir));
        }
    }
}

/// Parse and validate a configuration file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load the config file if present (defaults otherwise), then apply `.env`
/// and environment overrides.
pub fn load_with_env(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        load_config(path)?
    } else {
        tracing::debug!("config file {} not found, using defaults", path.display());
        Config::minimal()
    };

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!("failed to read .env file: {}", e);
        }
    }
    config.apply_overrides(std::env::var(NOTES_DIR_ENV).ok());
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    config
        .index
        .stopwords
        .parse::<Stopwords>()
        .with_context(|| "Invalid index.stopwords")?;

    if config.retrieval.notes_k < 1 {
        bail!("retrieval.notes_k must be >= 1");
    }

    if config.retrieval.memory_k < 1 {
        bail!("retrieval.memory_k must be >= 1");
    }

    if config.notes.include_globs.is_empty() {
        bail!("notes.include_globs must not be empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("recall.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let cfg = load_config(&write_config(&tmp, "")).unwrap();
        assert_eq!(cfg.index.path, PathBuf::from("bm25s_index"));
        assert_eq!(cfg.memory.index_path, PathBuf::from("bm25s_index_memory"));
        assert_eq!(
            cfg.memory.history_path,
            PathBuf::from("conversation_history.json")
        );
        assert_eq!(cfg.notes.include_globs, vec!["**/*.md", "**/*.markdown"]);
        assert_eq!(cfg.retrieval.notes_k, 2);
        assert!(cfg.notes.root.is_none());
    }

    #[test]
    fn test_parses_sections() {
        let tmp = TempDir::new().unwrap();
        let cfg = load_config(&write_config(
            &tmp,
            r#"
[notes]
root = "/srv/notes"
exclude_name_substrings = ["secret"]

[index]
path = "/srv/index"
stopwords = "en"

[retrieval]
memory_k = 4
"#,
        ))
        .unwrap();
        assert_eq!(cfg.notes.root, Some(PathBuf::from("/srv/notes")));
        assert_eq!(cfg.notes.exclude_name_substrings, vec!["secret"]);
        assert_eq!(cfg.retrieval.memory_k, 4);
        let params = cfg.index_params().unwrap();
        assert_eq!(params.stopwords, Stopwords::English);
        assert_eq!(cfg.index.path, PathBuf::from("/srv/index"));
    }

    #[test]
    fn test_rejects_empty_include_globs() {
        let tmp = TempDir::new().unwrap();
        let err = load_config(&write_config(&tmp, "[notes]\ninclude_globs = []\n")).unwrap_err();
        assert!(err.to_string().contains("include_globs"));
    }

    #[test]
    fn test_rejects_unknown_stopwords() {
        let tmp = TempDir::new().unwrap();
        assert!(load_config(&write_config(&tmp, "[index]\nstopwords = \"klingon\"\n")).is_err());
    }

    #[test]
    fn test_rejects_zero_k() {
        let tmp = TempDir::new().unwrap();
        assert!(load_config(&write_config(&tmp, "[retrieval]\nnotes_k = 0\n")).is_err());
    }

    #[test]
    fn test_env_override_sets_root() {
        let mut cfg = Config::minimal();
        assert!(cfg.notes_root().is_err());
        cfg.apply_overrides(Some("/home/me/notes".to_string()));
        assert_eq!(cfg.notes_root().unwrap(), Path::new("/home/me/notes"));
    }

    #[test]
    fn test_blank_env_override_ignored() {
        let mut cfg = Config::minimal();
        cfg.notes.root = Some(PathBuf::from("/a"));
        cfg.apply_overrides(Some("  ".to_string()));
        assert_eq!(cfg.notes_root().unwrap(), Path::new("/a"));
    }
}
