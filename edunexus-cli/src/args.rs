//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use edunexus_rag::DEFAULT_COLLECTION;
use edunexus_rag::groq::DEFAULT_CHAT_MODEL;
use edunexus_rag::huggingface::{DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL};

/// Textbook question answering for students in grades 5-10
#[derive(Parser, Debug)]
#[command(name = "edunexus")]
#[command(version, long_about = None)]
pub struct Cli {
    /// Index location, shared by every subcommand.
    #[command(flatten)]
    pub index: IndexArgs,

    /// What to do; `ask` when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Where the index lives and how it is embedded. Shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct IndexArgs {
    /// Index directory
    #[arg(long, global = true, default_value = "edunexus_index")]
    pub index_dir: PathBuf,

    /// Collection name
    #[arg(long, global = true, default_value = DEFAULT_COLLECTION)]
    pub collection: String,

    /// Hugging Face embedding model
    #[arg(long, global = true, default_value = DEFAULT_EMBEDDING_MODEL)]
    pub embedding_model: String,

    /// Vector size of the embedding model
    #[arg(long, global = true, default_value_t = DEFAULT_EMBEDDING_DIMENSIONS)]
    pub embedding_dimensions: usize,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build or extend the textbook index from PDF and text files
    Ingest(IngestArgs),

    /// Ask questions interactively (default)
    Ask(AskArgs),
}

impl Default for Commands {
    fn default() -> Self {
        Self::Ask(AskArgs::default())
    }
}

/// Build or extend the textbook index from PDF and text files
#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    /// Files to ingest; defaults to every .pdf, .txt and .md file in --books-dir
    pub paths: Vec<PathBuf>,

    /// Directory scanned when no files are given
    #[arg(long, default_value = "books")]
    pub books_dir: PathBuf,

    /// Drop the collection before ingesting
    #[arg(long)]
    pub rebuild: bool,

    /// Chunk size in characters
    #[arg(long, default_value_t = 1000)]
    pub chunk_size: usize,

    /// Characters shared by adjacent chunks
    #[arg(long, default_value_t = 200)]
    pub chunk_overlap: usize,
}

/// Ask questions interactively (default)
#[derive(Args, Debug, Clone)]
pub struct AskArgs {
    /// Excerpts retrieved per question
    #[arg(long, default_value_t = 3)]
    pub top_k: usize,

    /// Groq chat model
    #[arg(long, default_value = DEFAULT_CHAT_MODEL)]
    pub chat_model: String,

    /// Cap on the context sent to the model, in characters
    #[arg(long)]
    pub max_context_chars: Option<usize>,

    /// Hide the preview of each retrieved excerpt
    #[arg(short, long)]
    pub quiet: bool,
}

impl Default for AskArgs {
    fn default() -> Self {
        Self {
            top_k: 3,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            max_context_chars: None,
            quiet: false,
        }
    }
}
