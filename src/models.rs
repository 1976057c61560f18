//! Core data models used throughout note-recall.
//!
//! These types represent the documents fed into an index build, the
//! conversation exchanges kept by the memory store, and the scored
//! passages returned by the query engine.

use chrono::Local;
use serde::{Deserialize, Serialize};

/// A note (or synthetic memory entry) ready to be indexed.
///
/// The position of a document in the build sequence is its id for the
/// lifetime of that index build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// POSIX-style path relative to the corpus root.
    pub path: String,
    pub text: String,
}

impl Document {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// One completed question/response cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    /// ISO-8601 local timestamp taken when the exchange was recorded.
    pub timestamp: String,
    pub question: String,
    pub response: String,
}

impl Exchange {
    /// Create an exchange stamped with the current local time.
    pub fn now(question: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now().to_rfc3339(),
            question: question.into(),
            response: response.into(),
        }
    }

    /// Two-line block used both as the indexed memory document and as the
    /// recency view.
    pub fn as_passage(&self) -> String {
        format!("Q: {}\nA: {}", self.question, self.response)
    }
}

/// A passage returned by the query engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    /// Build-local document id.
    pub id: u32,
    pub path: String,
    pub text: String,
    pub score: f32,
}
