//! Conversation memory: durable exchange history plus its own BM25 index.
//!
//! The store owns two on-disk artifacts:
//!
//! - the history file, a pretty-printed JSON array of
//!   `{timestamp, question, response}` records, and
//! - a [`LexicalIndex`] artifact built from one `Q: …\nA: …` document per
//!   exchange.
//!
//! History is always written before the index is rebuilt, so a failed
//! rebuild only degrades search; it never loses an exchange. Persistence
//! failures are logged and the store keeps working from memory.
//!
//! The in-process index sits in an [`IndexCache`] whose validity flag is
//! cleared on every history mutation. Searches check the flag and rebuild
//! synchronously when it is unset, so a stale handle is never queried. A
//! persisted index is only reused when it was built with the configured
//! analysis settings over exactly the current history.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::{IndexParams, MemoryConfig};
use crate::index::{open_index, remove_index, save_index, LexicalIndex, LoadOutcome};
use crate::models::{Document, Exchange};
use crate::error::IndexResult;
use crate::search::{join_passages, search_text};

/// In-process index handle guarded by an explicit validity flag.
#[derive(Debug, Default)]
struct IndexCache {
    index: Option<LexicalIndex>,
    valid: bool,
}

impl IndexCache {
    fn current(&self) -> Option<&LexicalIndex> {
        self.index.as_ref().filter(|_| self.valid)
    }

    fn store(&mut self, index: LexicalIndex) -> &LexicalIndex {
        self.valid = true;
        self.index.insert(index)
    }

    fn invalidate(&mut self) {
        self.valid = false;
    }

    fn clear(&mut self) {
        self.index = None;
        self.valid = false;
    }
}

/// Append-only conversation history with relevance and recency views.
#[derive(Debug)]
pub struct ConversationMemory {
    history_path: PathBuf,
    index_path: PathBuf,
    params: IndexParams,
    history: Vec<Exchange>,
    cache: IndexCache,
}

impl ConversationMemory {
    /// Open the store, loading any existing history from `history_path`.
    ///
    /// An unreadable or unparseable history file is logged and treated as
    /// an empty history.
    pub fn open(
        history_path: impl Into<PathBuf>,
        index_path: impl Into<PathBuf>,
        params: IndexParams,
    ) -> Self {
        let history_path = history_path.into();
        let history = load_history(&history_path);
        debug!(
            "conversation memory opened with {} exchanges from {}",
            history.len(),
            history_path.display()
        );
        Self {
            history_path,
            index_path: index_path.into(),
            params,
            history,
            cache: IndexCache::default(),
        }
    }

    pub fn from_config(memory: &MemoryConfig, params: IndexParams) -> Self {
        Self::open(&memory.history_path, &memory.index_path, params)
    }

    pub fn history(&self) -> &[Exchange] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn history_path(&self) -> &Path {
        &self.history_path
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Record an exchange: append, persist history, rebuild and persist the
    /// memory index, in that order.
    pub fn add_exchange(&mut self, question: &str, response: &str) {
        self.history.push(Exchange::now(question, response));
        self.cache.invalidate();
        self.save_history();
        self.rebuild_index();
    }

    /// Relevance view: the top `k` past exchanges for `query`, joined by
    /// the passage separator. Empty history yields `""` without touching
    /// any index; so does an index that cannot be built or queried.
    pub fn search(&mut self, query: &str, k: usize) -> String {
        if self.history.is_empty() {
            return String::new();
        }
        let Some(index) = self.ensure_index() else {
            return String::new();
        };
        search_text(index, query, k).unwrap_or_else(|e| {
            warn!("Error searching memory index: {}", e);
            String::new()
        })
    }

    /// Recency view: the last `n` exchanges in chronological order. Works
    /// from history alone, whatever the state of the index.
    pub fn get_recent_history(&self, n: usize) -> String {
        let start = self.history.len().saturating_sub(n);
        let passages: Vec<String> = self.history[start..]
            .iter()
            .map(Exchange::as_passage)
            .collect();
        join_passages(passages.iter().map(String::as_str))
    }

    /// Empty the history, persist the empty record, and delete the memory
    /// index artifact.
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.cache.clear();
        self.save_history();
        if let Err(e) = remove_index(&self.index_path) {
            warn!(
                "Error removing memory index {}: {}",
                self.index_path.display(),
                e
            );
        }
    }

    fn ensure_index(&mut self) -> Option<&LexicalIndex> {
        if self.cache.current().is_none() {
            match load_or_rebuild(&self.history, &self.index_path, self.params) {
                Ok(index) => {
                    self.cache.store(index);
                }
                Err(e) => {
                    warn!("Error building memory index: {}", e);
                    return None;
                }
            }
        }
        self.cache.current()
    }

    fn rebuild_index(&mut self) {
        if self.history.is_empty() {
            return;
        }
        match build_memory_index(&self.history, self.params) {
            Ok(index) => {
                let index = self.cache.store(index);
                persist_index(index, &self.index_path);
            }
            Err(e) => warn!("Error building memory index: {}", e),
        }
    }

    fn save_history(&self) {
        if let Err(e) = write_history(&self.history_path, &self.history) {
            warn!(
                "Error saving history to {}: {}",
                self.history_path.display(),
                e
            );
        }
    }
}

/// Open the persisted memory index, falling back to a rebuild when it is
/// missing, corrupt, built with other settings, or does not reflect
/// `history`.
fn load_or_rebuild(
    history: &[Exchange],
    index_path: &Path,
    params: IndexParams,
) -> IndexResult<LexicalIndex> {
    match open_index(index_path) {
        LoadOutcome::Found(index)
            if index.params() == params && matches_history(&index, history) =>
        {
            debug!("loaded memory index from {}", index_path.display());
            return Ok(index);
        }
        LoadOutcome::Found(index) if index.params() != params => {
            debug!(
                "memory index built with stopwords={}, configured {}, rebuilding",
                index.params().stopwords,
                params.stopwords
            );
        }
        LoadOutcome::Found(_) => {
            debug!("memory index is behind history, rebuilding");
        }
        LoadOutcome::NotFound => {
            debug!("no memory index at {}, rebuilding", index_path.display());
        }
        LoadOutcome::Corrupt(e) => {
            warn!("memory index unusable, rebuilding: {}", e);
        }
    }
    let index = build_memory_index(history, params)?;
    persist_index(&index, index_path);
    Ok(index)
}

fn matches_history(index: &LexicalIndex, history: &[Exchange]) -> bool {
    index.len() == history.len()
        && index
            .documents()
            .iter()
            .zip(history)
            .all(|(doc, exchange)| doc.text == exchange.as_passage())
}

fn build_memory_index(history: &[Exchange], params: IndexParams) -> IndexResult<LexicalIndex> {
    let docs = history
        .iter()
        .map(|e| Document::new(e.timestamp.clone(), e.as_passage()))
        .collect();
    LexicalIndex::build(docs, params)
}

fn persist_index(index: &LexicalIndex, path: &Path) {
    if let Err(e) = save_index(index, path) {
        warn!("Error saving memory index to {}: {}", path.display(), e);
    }
}

fn load_history(path: &Path) -> Vec<Exchange> {
    if !path.exists() {
        return Vec::new();
    }
    let parsed: anyhow::Result<Vec<Exchange>> = fs::read_to_string(path)
        .map_err(anyhow::Error::from)
        .and_then(|content| serde_json::from_str(&content).map_err(anyhow::Error::from));
    match parsed {
        Ok(history) => history,
        Err(e) => {
            warn!("Error loading history from {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Whole-file replace: write a sibling temp file, then rename over `path`.
fn write_history(path: &Path, history: &[Exchange]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "history.json".into());
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, serde_json::to_string_pretty(history)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
