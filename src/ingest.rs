//! Notes index lifecycle.
//!
//! Coordinates the full build flow: corpus loader → tokenize/index → save.
//! Serving paths load the persisted artifact and fall back to a full
//! rebuild when it is missing, corrupt, or was built with analysis
//! settings other than the configured ones. A misconfigured notes
//! directory is the only error that propagates.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::corpus::{into_documents, read_notes};
use crate::index::{open_index, save_index, LexicalIndex, LoadOutcome};

/// How the notes index in hand was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Loaded,
    Built,
}

/// Scan the notes directory and build a fresh index (not persisted).
pub fn build_notes_index(config: &Config) -> Result<LexicalIndex> {
    let root = config.notes_root()?;
    let corpus = read_notes(root, &config.notes)?;
    let params = config.index_params()?;
    Ok(LexicalIndex::build(into_documents(corpus), params)?)
}

/// Build the notes index and persist it at `index.path`.
pub fn rebuild(config: &Config) -> Result<LexicalIndex> {
    let index = build_notes_index(config)?;
    save_index(&index, &config.index.path).with_context(|| {
        format!(
            "Failed to save notes index to {}",
            config.index.path.display()
        )
    })?;
    info!(
        "indexed {} notes into {}",
        index.len(),
        config.index.path.display()
    );
    Ok(index)
}

/// Load the persisted notes index, rebuilding it when absent, corrupt or
/// built with other settings, or unconditionally when `refresh` is set.
pub fn obtain(config: &Config, refresh: bool) -> Result<(LexicalIndex, Provenance)> {
    if refresh {
        return Ok((rebuild_tolerant(config)?, Provenance::Built));
    }

    let params = config.index_params()?;
    match open_index(&config.index.path) {
        LoadOutcome::Found(index) if index.params() == params => {
            debug!("loaded notes index from {}", config.index.path.display());
            Ok((index, Provenance::Loaded))
        }
        LoadOutcome::Found(index) => {
            info!(
                "notes index built with stopwords={}, configured {}, rebuilding",
                index.params().stopwords,
                params.stopwords
            );
            Ok((rebuild_tolerant(config)?, Provenance::Built))
        }
        LoadOutcome::NotFound => {
            info!(
                "no notes index at {}, building",
                config.index.path.display()
            );
            Ok((rebuild_tolerant(config)?, Provenance::Built))
        }
        LoadOutcome::Corrupt(e) => {
            warn!("notes index unusable, rebuilding: {}", e);
            Ok((rebuild_tolerant(config)?, Provenance::Built))
        }
    }
}

/// [`obtain`] without forcing a refresh.
pub fn load_or_build(config: &Config) -> Result<LexicalIndex> {
    obtain(config, false).map(|(index, _)| index)
}

/// Build and save, keeping the in-memory index when the save fails.
fn rebuild_tolerant(config: &Config) -> Result<LexicalIndex> {
    let index = build_notes_index(config)?;
    if let Err(e) = save_index(&index, &config.index.path) {
        warn!(
            "Error saving notes index to {}: {}",
            config.index.path.display(),
            e
        );
    }
    Ok(index)
}

/// CLI entry point for `recall index`.
pub fn run_index(config: &Config, refresh: bool) -> Result<()> {
    let (index, provenance) = if refresh {
        (rebuild(config)?, Provenance::Built)
    } else {
        obtain(config, false)?
    };

    let verb = match provenance {
        Provenance::Loaded => "loaded",
        Provenance::Built => "built",
    };
    println!("index {} ({})", config.index.path.display(), verb);
    println!("  documents: {}", index.len());
    println!("  terms: {}", index.vocab_size());
    println!("ok");
    Ok(())
}
