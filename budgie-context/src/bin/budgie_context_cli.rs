use budgie_context::{ChunkingOptions, Chunker, strategy_for_path};
use clap::Parser;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process;

/// A CLI tool to chunk a document into JSON output using budgie-context.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<String>,

    /// Split markdown by headings, keeping the heading hierarchy (default for .md)
    #[arg(long)]
    markdown_hierarchy: bool,

    /// Split markdown by headings without hierarchy metadata
    #[arg(long)]
    markdown_sections: bool,

    /// Split on every occurrence of this literal string
    #[arg(long)]
    delimiter: Option<String>,

    /// Fixed chunk size in characters
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Characters shared between consecutive fixed-size chunks
    #[arg(long)]
    overlap: Option<usize>,

    /// Treat the whole input as one chunk
    #[arg(long)]
    files: bool,

    /// Only print the rendered text of each chunk
    #[arg(long)]
    rendered: bool,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let options = ChunkingOptions {
        markdown_hierarchy: args.markdown_hierarchy,
        markdown_sections: args.markdown_sections,
        delimiter: args.delimiter,
        chunk_size: args.chunk_size,
        overlap: args.overlap,
        extension: None,
        whole_file: args.files,
    };
    let explicit = options.markdown_hierarchy
        || options.markdown_sections
        || options.delimiter.is_some()
        || options.chunk_size.is_some()
        || options.whole_file;
    let resolved = options.resolve()?;

    let file_content = if let Some(input_path) = &args.input {
        fs::read_to_string(input_path)?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    // Without an explicit method the input file's extension picks the default.
    let strategy = match (&args.input, explicit) {
        (Some(path), false) => strategy_for_path(Path::new(path)),
        _ => resolved.strategy,
    };
    let mut chunker = Chunker::new(strategy);
    if let Some(extension) = args
        .input
        .as_deref()
        .and_then(|path| Path::new(path).extension())
        .and_then(|ext| ext.to_str())
    {
        chunker = chunker.with_source_extension(extension);
    }

    let chunks = chunker.get_chunks(&file_content);

    let json_output = if args.rendered {
        let rendered: Vec<String> = chunks.iter().map(|c| c.render()).collect();
        serde_json::to_string_pretty(&rendered)?
    } else {
        serde_json::to_string_pretty(&chunks)?
    };
    println!("{json_output}");

    Ok(())
}
