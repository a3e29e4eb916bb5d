use anyhow::Context as _;
use budgie_context::ChunkingOptions;
use budgie_embed::OpenAiEmbeddingProvider;
use budgie_retriever::{
    config::{BudgieConfig, DOCS_DIR, ProjectPaths, SYSTEM_FILE, find_project_root, init_project},
    retrieval::{
        ChatMessage, IndexReport, Indexer, IndexerConfig, RagQuery, Retriever, augment,
    },
    storage::{EmbeddingStore, SimilarityResult, StoreError, VectorStore},
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::{Level, warn};

/// Build and query the budgie documentation index.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log more (-v info, -vv debug). Logs go to stderr.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a .budgie directory with a default config, system prompt and docs folder
    Init {
        /// Directory to create .budgie in
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Chunk and embed every document, then save the index next to the config file
    GenerateEmbeddings(GenerateArgs),
    /// Show the indexed chunks most similar to a question
    Search {
        /// The question to search for
        #[arg(short, long)]
        question: String,
        #[command(flatten)]
        project: ProjectArgs,
        /// Minimum similarity (defaults to cosine-limit from the config)
        #[arg(short, long)]
        threshold: Option<f32>,
        /// Maximum number of results
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Print the chat request that would be sent for a question
    Context {
        /// The question; prefix it with "#rag " to search the index
        #[arg(short, long, conflicts_with = "from")]
        question: Option<String>,
        /// Read the question from a file
        #[arg(long)]
        from: Option<PathBuf>,
        /// Always search the index
        #[arg(long)]
        rag: bool,
        /// Extra file added as a system message
        #[arg(long = "use")]
        use_file: Option<PathBuf>,
        /// System prompt file (defaults to budgie.system.md next to the config)
        #[arg(long)]
        system: Option<PathBuf>,
        #[command(flatten)]
        project: ProjectArgs,
    },
    /// Summarize the saved index
    Stats {
        #[command(flatten)]
        project: ProjectArgs,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
}

#[derive(clap::Args, Debug)]
struct ProjectArgs {
    /// Path to budgie.config.json
    #[arg(long, default_value = ".budgie/budgie.config.json")]
    config: PathBuf,
    /// Use the .budgie directory of the nearest enclosing project
    #[arg(long)]
    vscode: bool,
}

#[derive(clap::Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    project: ProjectArgs,
    /// Directory containing the documents
    #[arg(long, default_value = ".budgie/docs")]
    docs: PathBuf,
    /// Split markdown by headings, keeping the heading hierarchy (default)
    #[arg(long)]
    markdown_hierarchy: bool,
    /// Split markdown by headings without hierarchy metadata
    #[arg(long)]
    markdown_sections: bool,
    /// Split on every occurrence of this string
    #[arg(long)]
    delimiter: Option<String>,
    /// Fixed chunk size in characters
    #[arg(long)]
    chunk_size: Option<usize>,
    /// Characters shared by consecutive fixed-size chunks
    #[arg(long)]
    overlap: Option<usize>,
    /// Extension of the files to index (with --delimiter, --chunk-size or --files)
    #[arg(long)]
    extension: Option<String>,
    /// Index each file as a single chunk
    #[arg(long)]
    files: bool,
    /// Embedding requests in flight at once
    #[arg(long, default_value_t = 1)]
    workers: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum OutputFormat {
    Summary,
    Full,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "full" => Ok(OutputFormat::Full),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: &'a [ChatMessage],
}

#[derive(Serialize)]
struct IndexStats {
    index_path: PathBuf,
    total_chunks: usize,
    dimension: usize,
    files: BTreeSet<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(args).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> anyhow::Result<()> {
    match args.command {
        Commands::Init { dir } => {
            let paths = init_project(&dir).await?;
            println!("Initialized budgie project");
            println!("  Config: {}", paths.config_file.display());
            println!("  System prompt: {}", paths.system_file.display());
            println!("  Docs: {}", paths.docs_dir.display());
            println!();
            println!("Next steps:");
            println!("  1. Add your documentation to {}", paths.docs_dir.display());
            println!("  2. Generate embeddings: budgie-retriever generate-embeddings");
            Ok(())
        }
        Commands::GenerateEmbeddings(generate) => generate_embeddings(generate).await,
        Commands::Search {
            question,
            project,
            threshold,
            limit,
            format,
        } => {
            let paths = resolve_paths(&project)?;
            let config = BudgieConfig::load(&paths.config_file).await?;
            let mut search_config = config.search_config(&paths);
            if let Some(threshold) = threshold {
                search_config = search_config.with_threshold(threshold);
            }

            let Some(retriever) = Retriever::open(&search_config).await? else {
                println!(
                    "No index found at {}. Run generate-embeddings first.",
                    search_config.index_path.display()
                );
                return Ok(());
            };
            let provider = embedding_provider(&config)?;
            let mut results = retriever.search(&question, &provider).await?;
            results.truncate(limit);
            print_results(&results, &format)?;
            Ok(())
        }
        Commands::Context {
            question,
            from,
            rag,
            use_file,
            system,
            project,
        } => {
            let paths = resolve_paths(&project)?;
            let config = BudgieConfig::load(&paths.config_file).await?;

            let input = match (question, from) {
                (Some(question), _) => question,
                (None, Some(path)) => read_file(&path).await?,
                (None, None) => anyhow::bail!("question is required (either via -q or --from)"),
            };

            let system_file = system.unwrap_or_else(|| paths.system_file.clone());
            let mut messages = vec![ChatMessage::system(read_file(&system_file).await?)];
            if let Some(path) = &use_file {
                messages.push(ChatMessage::system(read_file(path).await?));
            }

            let query = RagQuery::parse(&input, rag);
            let passages = if query.requested {
                retrieve_passages(&config, &paths, &query.question).await
            } else {
                Vec::new()
            };
            augment(&mut messages, &passages, query.requested, &query.question);

            let request = ChatRequest {
                model: &config.model,
                temperature: config.temperature,
                messages: &messages,
            };
            println!("{}", serde_json::to_string_pretty(&request)?);
            Ok(())
        }
        Commands::Stats { project, format } => {
            let paths = resolve_paths(&project)?;
            let index_path = paths.index_path();
            let store = match EmbeddingStore::open(&index_path).await {
                Ok(store) => store,
                Err(StoreError::NotFound(_)) => {
                    println!("No index found at {}", index_path.display());
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            let stats = IndexStats {
                index_path,
                total_chunks: store.len(),
                dimension: store.records().first().map_or(0, |r| r.embedding.len()),
                files: store
                    .records()
                    .iter()
                    .map(|r| source_name(&r.id).to_string())
                    .collect(),
            };
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
                OutputFormat::Summary | OutputFormat::Full => {
                    println!("Index: {}", stats.index_path.display());
                    println!("  Total chunks: {}", stats.total_chunks);
                    println!("  Dimension: {}", stats.dimension);
                    println!("  Files: {}", stats.files.len());
                    let shown = if format == OutputFormat::Full { usize::MAX } else { 10 };
                    for file in stats.files.iter().take(shown) {
                        println!("    {file}");
                    }
                    if stats.files.len() > shown {
                        println!("    ... and {} more", stats.files.len() - shown);
                    }
                }
            }
            Ok(())
        }
    }
}

async fn generate_embeddings(args: GenerateArgs) -> anyhow::Result<()> {
    // Flag validation happens before anything touches the filesystem.
    let chunking = ChunkingOptions {
        markdown_hierarchy: args.markdown_hierarchy,
        markdown_sections: args.markdown_sections,
        delimiter: args.delimiter,
        chunk_size: args.chunk_size,
        overlap: args.overlap,
        extension: args.extension,
        whole_file: args.files,
    }
    .resolve()?;

    let paths = if args.project.vscode {
        resolve_paths(&args.project)?
    } else {
        ProjectPaths {
            docs_dir: args.docs,
            ..resolve_paths(&args.project)?
        }
    };
    let config = BudgieConfig::load(&paths.config_file).await?;
    let embed_config = config.embed_config()?;

    println!("Generating embeddings from docs in: {}", paths.docs_dir.display());
    println!("Using embedding model: {}", embed_config.model_name);
    println!("Using {}", chunking.strategy);

    let provider = Arc::new(OpenAiEmbeddingProvider::new(embed_config)?);
    let indexer_config = IndexerConfig::new(&paths.docs_dir, paths.index_path())
        .with_chunking(chunking)
        .with_max_concurrent_embeddings(args.workers);
    let indexer = Indexer::new(indexer_config, provider);

    let mut store = EmbeddingStore::new();
    let report = tokio::select! {
        report = indexer.build_index(&mut store) => report?,
        _ = tokio::signal::ctrl_c() => {
            anyhow::bail!("interrupted, the saved index was left unchanged");
        }
    };
    print_report(&report, &indexer.config().extension);
    Ok(())
}

fn print_report(report: &IndexReport, extension: &str) {
    println!("Found {} files with extension {}", report.files_found, extension);
    for skipped in &report.skipped_files {
        println!("  Skipped {}: {}", skipped.path.display(), skipped.reason);
    }
    for failed in &report.failed_chunks {
        println!("  Failed {}: {}", failed.id, failed.reason);
    }
    println!(
        "Successfully generated {} embeddings and saved to {}",
        report.chunks_indexed,
        report.index_path.display()
    );
}

/// Passages for a question, or none when retrieval is unavailable. Problems
/// are reported as warnings so the question can still be asked.
async fn retrieve_passages(config: &BudgieConfig, paths: &ProjectPaths, question: &str) -> Vec<String> {
    let retriever = match Retriever::open(&config.search_config(paths)).await {
        Ok(Some(retriever)) => retriever,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!("Retrieval disabled: {}", e);
            eprintln!("Warning: {e}");
            return Vec::new();
        }
    };
    let provider = match embedding_provider(config) {
        Ok(provider) => provider,
        Err(e) => {
            eprintln!("Warning: Error creating search provider: {e}");
            return Vec::new();
        }
    };

    match retriever.search(question, &provider).await {
        Ok(results) => {
            eprintln!("Found {} relevant documentation chunks", results.len());
            results.into_iter().map(|r| r.content).collect()
        }
        Err(e) => {
            eprintln!("Warning: Error searching similarities: {e}");
            Vec::new()
        }
    }
}

fn embedding_provider(config: &BudgieConfig) -> anyhow::Result<OpenAiEmbeddingProvider> {
    Ok(OpenAiEmbeddingProvider::new(config.embed_config()?)?)
}

fn resolve_paths(project: &ProjectArgs) -> anyhow::Result<ProjectPaths> {
    if project.vscode {
        let cwd = std::env::current_dir().context("error getting working directory")?;
        let root = find_project_root(&cwd)?;
        return Ok(ProjectPaths::in_root(&root));
    }

    let config_dir = project
        .config
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    Ok(ProjectPaths {
        config_file: project.config.clone(),
        system_file: config_dir.join(SYSTEM_FILE),
        docs_dir: config_dir.join(DOCS_DIR),
    })
}

async fn read_file(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("error reading {}", path.display()))
}

/// `guide.md` for `guide.md-chunk-3`
fn source_name(id: &str) -> &str {
    id.rsplit_once("-chunk-").map_or(id, |(name, _)| name)
}

fn print_results(results: &[SimilarityResult], format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(results)?);
        }
        OutputFormat::Summary => {
            if results.is_empty() {
                println!("No relevant documentation found");
                return Ok(());
            }
            println!("Found {} relevant documentation chunks:", results.len());
            for (i, result) in results.iter().enumerate() {
                let preview = result
                    .content
                    .lines()
                    .map(str::trim)
                    .find(|line| !line.is_empty())
                    .unwrap_or("");
                println!(
                    "  {}. [{:.3}] {} | {}",
                    i + 1,
                    result.score,
                    result.id,
                    preview.chars().take(100).collect::<String>()
                );
            }
        }
        OutputFormat::Full => {
            for result in results {
                println!("Similarity: {:.3}", result.score);
                println!("ID: {}", result.id);
                println!("Content:\n{}", result.content);
                println!("---");
            }
        }
    }
    Ok(())
}
