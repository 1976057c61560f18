//! # note-recall CLI (`recall`)
//!
//! The `recall` binary builds and queries the notes index and manages the
//! conversation memory.
//!
//! ## Usage
//!
//! ```bash
//! recall --config ./config/recall.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `recall index` | Load the notes index, building it if missing |
//! | `recall index --refresh` | Rebuild the notes index from the notes directory |
//! | `recall search "<query>"` | Top-K notes for a query |
//! | `recall context "<question>"` | Notes + memory context for a question |
//! | `recall memory add "<q>" "<a>"` | Record an exchange |
//! | `recall memory search "<query>"` | Top-K past exchanges |
//! | `recall memory recent` | Most recent exchanges |
//! | `recall memory clear` | Delete history and the memory index |
//! | `recall stats` | Index and memory summary |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use note_recall::config;
use note_recall::context::Session;
use note_recall::ingest;
use note_recall::memory::ConversationMemory;
use note_recall::search;
use note_recall::stats;

/// note-recall — lexical retrieval over your notes and past conversations.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means defaults; `MD_FILES` sets the notes directory.
#[derive(Parser)]
#[command(
    name = "recall",
    about = "note-recall — lexical retrieval over your notes and past conversations",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/recall.toml")]
    config: PathBuf,

    /// Log debug output to stderr (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Load or build the notes index.
    ///
    /// Without `--refresh` an existing index is loaded as-is; a missing or
    /// corrupt one is rebuilt from the notes directory.
    Index {
        /// Rebuild even if an index already exists.
        #[arg(long)]
        refresh: bool,
    },

    /// Search the notes index.
    Search {
        /// The search query string.
        query: String,

        /// Number of notes to return (defaults to `retrieval.notes_k`).
        #[arg(long, short)]
        k: Option<usize>,
    },

    /// Print the assembled notes + memory context for a question.
    Context {
        /// The question to gather context for.
        question: String,
    },

    /// Manage the conversation memory.
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },

    /// Show index and memory statistics.
    Stats,
}

/// Conversation memory subcommands.
#[derive(Subcommand)]
enum MemoryAction {
    /// Record a question/response exchange.
    Add { question: String, response: String },

    /// Search past exchanges by relevance.
    Search {
        query: String,

        /// Number of exchanges to return (defaults to `retrieval.memory_k`).
        #[arg(long, short)]
        k: Option<usize>,
    },

    /// Show the most recent exchanges.
    Recent {
        /// Number of exchanges (defaults to `memory.recent_n`).
        #[arg(long, short)]
        n: Option<usize>,
    },

    /// Delete all history and the memory index.
    Clear,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_with_env(&cli.config)?;

    match cli.command {
        Commands::Index { refresh } => {
            ingest::run_index(&cfg, refresh)?;
        }
        Commands::Search { query, k } => {
            search::run_search(&cfg, &query, k)?;
        }
        Commands::Context { question } => {
            let memory = ConversationMemory::from_config(&cfg.memory, cfg.index_params()?);
            let mut session = Session::new(cfg, memory);
            let context = session.assemble_context(&question)?;
            if context.is_empty() {
                println!("No context.");
            } else {
                println!("{}", context.render());
            }
        }
        Commands::Memory { action } => {
            let mut memory = ConversationMemory::from_config(&cfg.memory, cfg.index_params()?);
            match action {
                MemoryAction::Add { question, response } => {
                    memory.add_exchange(&question, &response);
                    println!("recorded exchange #{}", memory.len());
                }
                MemoryAction::Search { query, k } => {
                    let k = k.unwrap_or(cfg.retrieval.memory_k);
                    print_or_empty(&memory.search(&query, k));
                }
                MemoryAction::Recent { n } => {
                    let n = n.unwrap_or(cfg.memory.recent_n);
                    print_or_empty(&memory.get_recent_history(n));
                }
                MemoryAction::Clear => {
                    memory.clear_history();
                    println!("memory cleared");
                }
            }
        }
        Commands::Stats => {
            stats::run_stats(&cfg)?;
        }
    }

    Ok(())
}

fn print_or_empty(text: &str) {
    if text.is_empty() {
        println!("No memory.");
    } else {
        println!("{}", text);
    }
}
