//! Query engine: top-K BM25 retrieval over a [`LexicalIndex`].
//!
//! # Ranking
//!
//! 1. Analyze the query with the index's own analyzer.
//! 2. Score every document with tantivy's BM25 (each distinct term once).
//! 3. Sort by score (desc), then document id (asc).
//! 4. Truncate to `min(k, N)`.
//!
//! Documents that match no query term keep a score of `0.0` and fill the
//! tail of the ranking, so a query always yields `min(k, N)` passages.

use anyhow::Result;

use crate::config::Config;
use crate::error::IndexResult;
use crate::index::LexicalIndex;
use crate::ingest;
use crate::models::ScoredDocument;

/// Separator placed between passages in assembled context text.
pub const PASSAGE_SEPARATOR: &str = "\n---\n\n";

/// Score `query` against `index` and return at most `k` passages.
///
/// `k` larger than the index is clamped; `k == 0` is treated as `1`.
pub fn retrieve(
    index: &LexicalIndex,
    query: &str,
    k: usize,
) -> IndexResult<Vec<ScoredDocument>> {
    let mut ranked = index.scores(query)?;
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(k.max(1).min(index.len()));

    Ok(ranked
        .into_iter()
        .filter_map(|(id, score)| {
            index.document(id).map(|doc| ScoredDocument {
                id,
                path: doc.path.clone(),
                text: doc.text.clone(),
                score,
            })
        })
        .collect())
}

/// Join non-empty passage texts with [`PASSAGE_SEPARATOR`].
pub fn join_passages<'a, I>(passages: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    passages
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(PASSAGE_SEPARATOR)
}

/// Retrieve and join passages as a single context string.
pub fn search_text(index: &LexicalIndex, query: &str, k: usize) -> IndexResult<String> {
    let results = retrieve(index, query, k)?;
    Ok(join_passages(results.iter().map(|r| r.text.as_str())))
}

/// CLI entry point: search the notes index and print ranked results.
pub fn run_search(config: &Config, query: &str, k: Option<usize>) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let index = ingest::load_or_build(config)?;
    let k = k.unwrap_or(config.retrieval.notes_k);
    let results = retrieve(&index, query, k)?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        println!("{}. [{:.4}] {}", i + 1, result.score, result.path);
        println!("    {}", snippet(&result.text, 240));
        println!();
    }

    Ok(())
}

fn snippet(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut: String = flat.chars().take(max_chars).collect();
    cut.push('…');
    cut
}
