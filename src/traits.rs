//! Extension seams between the retrieval core and its consumers.
//!
//! ```text
//! ┌──────────────┐  ┌──────────────────┐
//! │ NotesSource  │  │ConversationMemory│   ContextSource
//! └──────┬───────┘  └────────┬─────────┘
//!        └───────┬───────────┘
//!                ▼
//!        Session::assemble_context()
//!                ▼
//!           dyn Responder              (language model, out of crate)
//! ```
//!
//! [`ContextSource`] is anything that turns a query into context text.
//! [`Responder`] is the language-model call; this crate never implements
//! one itself, callers inject theirs into [`Session::ask`](crate::context::Session::ask).

use anyhow::Result;
use tracing::warn;

use crate::index::LexicalIndex;
use crate::memory::ConversationMemory;
use crate::search::search_text;

/// A retrievable body of text that yields joined passages for a query.
pub trait ContextSource {
    /// Up to `k` passages joined by the passage separator, or `""`.
    fn context_for(&mut self, query: &str, k: usize) -> String;
}

/// The notes corpus index, served read-only.
pub struct NotesSource<'a> {
    pub index: &'a LexicalIndex,
}

impl ContextSource for NotesSource<'_> {
    fn context_for(&mut self, query: &str, k: usize) -> String {
        search_text(self.index, query, k).unwrap_or_else(|e| {
            warn!("Error searching notes index: {}", e);
            String::new()
        })
    }
}

impl ContextSource for ConversationMemory {
    fn context_for(&mut self, query: &str, k: usize) -> String {
        self.search(query, k)
    }
}

/// Produces an answer from a question and its assembled context.
pub trait Responder {
    fn respond(&self, context: &str, question: &str) -> Result<String>;
}

impl<F> Responder for F
where
    F: Fn(&str, &str) -> Result<String>,
{
    fn respond(&self, context: &str, question: &str) -> Result<String> {
        self(context, question)
    }
}
