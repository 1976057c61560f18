//! # note-recall
//!
//! Local-first lexical retrieval over a personal notes directory and the
//! assistant's own conversation history.
//!
//! note-recall scans a tree of Markdown notes, builds a tantivy BM25 index
//! that can be persisted and reloaded without the original files, and keeps a
//! conversation memory whose exchanges are indexed the same way. A
//! [`Session`](context::Session) combines both into the context handed to a
//! language model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ Corpus       │──▶│  Lexical     │──▶│ Query engine │──┐
//! │ loader       │   │  index (BM25)│   │ (top-K)      │  │
//! └──────────────┘   └──────┬──────┘   └──────────────┘  │
//!                           │ save/load                   ▼
//!                      ┌────┴─────┐               ┌─────────────┐
//!                      │ artifact │               │   Session   │──▶ Responder
//!                      └──────────┘               └─────────────┘
//!                                                        ▲
//! ┌──────────────┐   ┌─────────────┐                      │
//! │ history.json │◀─▶│ Conversation│──────────────────────┘
//! └──────────────┘   │ memory      │ (private BM25 index)
//!                    └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! recall index                          # build the notes index
//! recall search "emacs keybindings"     # top-K notes
//! recall memory add "Q" "A"             # record an exchange
//! recall context "What is emacs?"       # notes + memory context
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and env overrides |
//! | [`error`] | Loader and index error types |
//! | [`models`] | Core data types |
//! | [`tokenize`] | Shared text analyzer |
//! | [`corpus`] | Notes directory loader |
//! | [`index`] | tantivy BM25 index build/save/load |
//! | [`search`] | Top-K retrieval |
//! | [`memory`] | Conversation memory store |
//! | [`traits`] | Context source and responder seams |
//! | [`context`] | Context assembly and sessions |
//! | [`ingest`] | Notes index lifecycle |
//! | [`stats`] | Index and memory summary |

pub mod config;
pub mod context;
pub mod corpus;
pub mod error;
pub mod index;
pub mod ingest;
pub mod memory;
pub mod models;
pub mod search;
pub mod stats;
pub mod tokenize;
pub mod traits;
