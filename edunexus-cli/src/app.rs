//! Wiring: credentials, index, model clients and the two subcommands.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use edunexus_rag::config::{HF_TOKEN_VAR, groq_api_key_from_env, require_env};
use edunexus_rag::{
    AnswerGenerator, Assistant, GroqClient, GroqConfig, HuggingFaceConfig,
    HuggingFaceEmbeddingProvider, IndexBuilder, IngestReport, LocalVectorStore, RagConfig,
    RagPipeline,
};
use tracing::{info, warn};

use crate::args::{AskArgs, Cli, Commands, IndexArgs, IngestArgs};
use crate::console::{ConsoleOptions, EditorSource, run_console};

const SOURCE_EXTENSIONS: [&str; 3] = ["pdf", "txt", "md"];

/// Run the parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command.unwrap_or_default() {
        Commands::Ingest(args) => ingest(&cli.index, args).await,
        Commands::Ask(args) => ask(&cli.index, args).await,
    }
}

/// Build or extend the index and print a summary.
pub async fn ingest(index: &IndexArgs, args: IngestArgs) -> Result<()> {
    let hf_token = require_env(HF_TOKEN_VAR)?;
    let config = RagConfig::builder()
        .chunk_size(args.chunk_size)
        .chunk_overlap(args.chunk_overlap)
        .build()?;
    let pipeline = open_pipeline(index, config, hf_token).await?;

    let paths = if args.paths.is_empty() {
        discover_sources(&args.books_dir).await?
    } else {
        args.paths
    };
    info!(files = paths.len(), collection = %index.collection, "starting ingestion");

    let report = IndexBuilder::new(&pipeline, index.collection.as_str())
        .rebuild(args.rebuild)
        .run(&paths)
        .await?;

    write_report(&mut std::io::stdout().lock(), &report, &index.index_dir)?;
    Ok(())
}

/// Open the interactive console against an existing index.
pub async fn ask(index: &IndexArgs, args: AskArgs) -> Result<()> {
    let groq_api_key = groq_api_key_from_env()?;
    let hf_token = require_env(HF_TOKEN_VAR)?;
    let config = RagConfig::builder()
        .top_k(args.top_k)
        .max_context_chars(args.max_context_chars)
        .build()?;
    let pipeline = open_pipeline(index, config, hf_token).await?;

    let model = GroqClient::new(GroqConfig::new(groq_api_key).with_model(args.chat_model))?;
    let assistant =
        Assistant::new(pipeline, AnswerGenerator::new(Arc::new(model)), index.collection.as_str());

    let options = ConsoleOptions { quiet: args.quiet };
    run_console(&assistant, options, EditorSource::new()?, std::io::stdout()).await
}

/// Open the on-disk index and assemble a pipeline over it with the
/// Hugging Face embedder.
pub async fn open_pipeline(
    index: &IndexArgs,
    config: RagConfig,
    hf_token: String,
) -> Result<Arc<RagPipeline>> {
    let embedder = HuggingFaceEmbeddingProvider::new(
        HuggingFaceConfig::new(hf_token)
            .with_model(index.embedding_model.as_str(), index.embedding_dimensions),
    )?;
    let store = LocalVectorStore::open(index.index_dir.clone())
        .await
        .with_context(|| format!("failed to open index at {}", index.index_dir.display()))?
        .with_embedding_model(index.embedding_model.as_str())
        .with_deferred_writes();
    check_embedding_model(&store, &index.collection, &index.embedding_model).await;

    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(embedder))
        .vector_store(Arc::new(store))
        .build()?;
    Ok(Arc::new(pipeline))
}

/// Warn when a collection was built with a different embedding model than
/// the one about to query or extend it. Returns whether the models differ.
pub async fn check_embedding_model(store: &LocalVectorStore, collection: &str, model: &str) -> bool {
    let Some(info) = store.collection_info(collection).await else {
        return false;
    };
    match info.embedding_model.as_deref() {
        Some(recorded) if recorded != model => {
            warn!(
                collection,
                recorded,
                configured = model,
                "collection was built with a different embedding model; \
                 re-run `edunexus ingest --rebuild` if answers look unrelated"
            );
            true
        }
        _ => false,
    }
}

/// Every ingestible file directly inside `dir`, sorted by name. A missing
/// directory yields no files.
pub async fn discover_sources(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(dir = %dir.display(), "books directory not found; nothing to ingest");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e).with_context(|| format!("failed to read {}", dir.display())),
    };

    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| SOURCE_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)));
        if supported && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Human-readable ingestion summary.
pub fn write_report(out: &mut impl Write, report: &IngestReport, index_dir: &Path) -> Result<()> {
    for path in &report.files_loaded {
        writeln!(out, "Loaded {}", path.display())?;
    }
    for skipped in &report.files_skipped {
        writeln!(out, "Skipped {}: {}", skipped.path.display(), skipped.reason)?;
    }
    writeln!(
        out,
        "Added {} chunks from {} pages in {} files; the index at {} now holds {} chunks.",
        report.chunks,
        report.documents,
        report.files_loaded.len(),
        index_dir.display(),
        report.collection_count
    )?;
    if report.collection_count == 0 {
        writeln!(out, "Warning: the index is empty; questions will be answered from general knowledge only.")?;
    }
    Ok(())
}
