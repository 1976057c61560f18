//! Context assembly and the question-answering session.
//!
//! [`Session`] is the only surface a language-model or UI layer talks to.
//! It owns a lazily obtained notes index and an injected
//! [`ConversationMemory`], and exposes:
//!
//! | Operation | Purpose |
//! |-----------|---------|
//! | [`search_notes`](Session::search_notes) | top-K note passages |
//! | [`search_memory`](Session::search_memory) | top-K past exchanges |
//! | [`record_exchange`](Session::record_exchange) | append to memory |
//! | [`clear_memory`](Session::clear_memory) | wipe memory and its index |
//! | [`assemble_context`](Session::assemble_context) | notes + memory as one text |
//! | [`ask`](Session::ask) | assemble, respond, record |
//!
//! Persistence and index failures never abort a turn: they are absorbed
//! below this layer and the affected side contributes an empty string. A
//! misconfigured notes directory is the one error that propagates.

use anyhow::Result;
use tracing::debug;

use crate::config::Config;
use crate::index::LexicalIndex;
use crate::ingest;
use crate::memory::ConversationMemory;
use crate::traits::{ContextSource, NotesSource, Responder};

/// Notes and memory passages retrieved for one question.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledContext {
    pub notes: String,
    pub memory: String,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.memory.is_empty()
    }

    /// Single prompt-ready text with a labelled section per non-empty side.
    pub fn render(&self) -> String {
        let mut sections = Vec::new();
        if !self.notes.is_empty() {
            sections.push(format!("## Notes\n\n{}", self.notes));
        }
        if !self.memory.is_empty() {
            sections.push(format!("## Conversation memory\n\n{}", self.memory));
        }
        sections.join("\n\n")
    }
}

/// An answer together with the context it was produced from.
#[derive(Debug, Clone)]
pub struct Answer {
    pub response: String,
    pub context: AssembledContext,
}

pub struct Session {
    config: Config,
    notes: Option<LexicalIndex>,
    memory: ConversationMemory,
}

impl Session {
    pub fn new(config: Config, memory: ConversationMemory) -> Self {
        Self {
            config,
            notes: None,
            memory,
        }
    }

    /// Session over an already built notes index.
    pub fn with_notes(config: Config, notes: LexicalIndex, memory: ConversationMemory) -> Self {
        Self {
            config,
            notes: Some(notes),
            memory,
        }
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Ensure the notes index is available, loading or building it on first
    /// use. Configuration errors propagate.
    pub fn notes_index(&mut self) -> Result<&LexicalIndex> {
        let index = match self.notes.take() {
            Some(index) => index,
            None => ingest::load_or_build(&self.config)?,
        };
        Ok(self.notes.insert(index))
    }

    /// Rebuild the notes index from disk.
    pub fn refresh_notes(&mut self) -> Result<&LexicalIndex> {
        let (index, _) = ingest::obtain(&self.config, true)?;
        Ok(self.notes.insert(index))
    }

    pub fn search_notes(&mut self, query: &str, k: usize) -> Result<String> {
        let index = self.notes_index()?;
        Ok(NotesSource { index }.context_for(query, k))
    }

    pub fn search_memory(&mut self, query: &str, k: usize) -> String {
        self.memory.context_for(query, k)
    }

    pub fn record_exchange(&mut self, question: &str, response: &str) {
        self.memory.add_exchange(question, response);
    }

    pub fn clear_memory(&mut self) {
        self.memory.clear_history();
    }

    /// Gather notes and memory passages for `question` using the configured
    /// `notes_k` / `memory_k`.
    pub fn assemble_context(&mut self, question: &str) -> Result<AssembledContext> {
        let notes = self.search_notes(question, self.config.retrieval.notes_k)?;
        let memory = self.search_memory(question, self.config.retrieval.memory_k);
        if notes.is_empty() {
            debug!("no notes context for question");
        }
        Ok(AssembledContext { notes, memory })
    }

    /// One full turn: assemble context, ask `responder`, record the exchange.
    pub fn ask(&mut self, question: &str, responder: &dyn Responder) -> Result<Answer> {
        let context = self.assemble_context(question)?;
        let response = responder.respond(&context.render(), question)?;
        self.record_exchange(question, &response);
        Ok(Answer { response, context })
    }
}
