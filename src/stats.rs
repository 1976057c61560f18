//! Index and memory health overview.
//!
//! Provides a quick summary of what's indexed: notes index state, document
//! and term counts, conversation history size, and whether the memory index
//! agrees with the history. Used by `recall stats`.

use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::index::{open_index, LoadOutcome};
use crate::memory::ConversationMemory;

/// State of one on-disk index artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactStatus {
    Present { documents: usize, terms: usize },
    Missing,
    Corrupt(String),
}

impl ArtifactStatus {
    pub fn probe(path: &Path) -> Self {
        match open_index(path) {
            LoadOutcome::Found(index) => Self::Present {
                documents: index.len(),
                terms: index.vocab_size(),
            },
            LoadOutcome::NotFound => Self::Missing,
            LoadOutcome::Corrupt(e) => Self::Corrupt(e.to_string()),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Present { documents, terms } => {
                format!("{} documents, {} terms", documents, terms)
            }
            Self::Missing => "not built".to_string(),
            Self::Corrupt(reason) => format!("corrupt ({})", reason),
        }
    }
}

/// Run the stats command and print a summary.
pub fn run_stats(config: &Config) -> Result<()> {
    let notes_status = ArtifactStatus::probe(&config.index.path);
    let memory = ConversationMemory::from_config(&config.memory, config.index_params()?);
    let memory_status = ArtifactStatus::probe(&config.memory.index_path);

    println!("note-recall — Stats");
    println!("===================");
    println!();
    match &config.notes.root {
        Some(root) => println!("  Notes dir:     {}", root.display()),
        None => println!("  Notes dir:     (not configured)"),
    }
    println!("  Notes index:   {}", config.index.path.display());
    println!("                 {}", notes_status.describe());
    println!();
    println!("  History:       {}", config.memory.history_path.display());
    println!("                 {} exchanges", memory.len());
    println!("  Memory index:  {}", config.memory.index_path.display());
    println!("                 {}", memory_status.describe());

    if let ArtifactStatus::Present { documents, .. } = memory_status {
        if documents != memory.len() {
            println!();
            println!("  Memory index is stale; it will be rebuilt on the next memory search.");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexParams;
    use crate::index::{save_index, LexicalIndex};
    use crate::models::Document;
    use tempfile::TempDir;

    #[test]
    fn test_probe_states() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("idx");
        assert_eq!(ArtifactStatus::probe(&path), ArtifactStatus::Missing);

        let index = LexicalIndex::build(
            vec![Document::new("a.md", "alpha beta")],
            IndexParams::default(),
        )
        .unwrap();
        save_index(&index, &path).unwrap();
        assert_eq!(
            ArtifactStatus::probe(&path),
            ArtifactStatus::Present {
                documents: 1,
                terms: 2
            }
        );

        std::fs::write(path.join("meta.json"), "[").unwrap();
        assert!(matches!(
            ArtifactStatus::probe(&path),
            ArtifactStatus::Corrupt(_)
        ));
    }
}
