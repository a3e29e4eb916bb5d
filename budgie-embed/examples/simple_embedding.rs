//! Embeds a few sentences with a local OpenAI-compatible server.
//!
//! ```text
//! cargo run -p budgie-embed --example simple_embedding -- ai/mxbai-embed-large http://localhost:11434/v1
//! ```

use budgie_embed::{DEFAULT_BASE_URL, EmbedConfig, EmbeddingProvider, OpenAiEmbeddingProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let model = args.next().unwrap_or_else(|| "ai/mxbai-embed-large".to_string());
    let base_url = args.next().unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let config = EmbedConfig::new(model)
        .with_base_url(base_url)
        .with_batch_size(2)
        .with_normalize(true);

    println!("Model: {}", config.model_name);
    println!("Endpoint: {}", config.embeddings_url());
    println!("Batch size: {}", config.batch_size);

    let provider = OpenAiEmbeddingProvider::new(config)?;

    let text = "Hello, this is a test sentence for embedding generation.";
    let embedding = provider.embed_text(text).await?;
    println!("\n\"{text}\"");
    println!("  dimension: {}", embedding.len());
    println!("  first 5 values: {:?}", &embedding[..5.min(embedding.len())]);

    let texts = vec![
        "Rust is a systems programming language.".to_string(),
        "Embedding servers speak a small JSON protocol.".to_string(),
        "Machine learning models process natural language.".to_string(),
    ];
    let result = provider.embed_texts(&texts).await?;

    println!("\nGenerated {} embeddings of dimension {}", result.len(), result.dimension);
    for (text, embedding) in texts.iter().zip(result.embeddings.iter()) {
        println!("  \"{text}\": {:?}", &embedding[..3.min(embedding.len())]);
    }
    Ok(())
}
