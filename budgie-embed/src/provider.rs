//! Embedding provider implementations

use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of embedding generation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingResult {
    /// The generated embeddings, one per input text, in input order
    pub embeddings: Vec<Vec<f32>>,
    /// The dimension of each embedding vector
    pub dimension: usize,
}

impl EmbeddingResult {
    /// Builds a result, taking the dimension from the first vector (0 when
    /// there are none).
    pub fn new(embeddings: Vec<Vec<f32>>) -> Self {
        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        Self {
            embeddings,
            dimension,
        }
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// Anything that can turn text into a vector.
///
/// Implementations must be deterministic enough that the same model embeds a
/// query and the indexed documents into the same space.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate the embedding for a single text
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, preserving order.
    ///
    /// The default implementation calls [`EmbeddingProvider::embed_text`] once
    /// per text.
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed_text(text).await?);
        }
        Ok(EmbeddingResult::new(embeddings))
    }

    /// Identifier of the model producing the vectors
    fn model_name(&self) -> &str;

    /// Get the name/identifier of this provider
    fn provider_name(&self) -> &str;
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Client for any server exposing the OpenAI `POST /embeddings` endpoint
/// (llama.cpp, Ollama, Docker Model Runner, OpenAI itself).
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingProvider {
    config: EmbedConfig,
    client: reqwest::Client,
}

impl OpenAiEmbeddingProvider {
    /// Validates the configuration and builds the HTTP client. No request is
    /// made until the first embedding is asked for.
    pub fn new(config: EmbedConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder().timeout(config.timeout()).build()?;
        tracing::debug!(
            "Embedding provider for model {} at {}",
            config.model_name,
            config.embeddings_url()
        );
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &EmbedConfig {
        &self.config
    }

    async fn request_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = EmbeddingRequest {
            model: &self.config.model_name,
            input: batch,
        };
        let mut request = self.client.post(self.config.embeddings_url()).json(&body);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(EmbedError::Api {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let bytes = response.bytes().await?;
        let mut embeddings = parse_embeddings(&bytes, batch.len())?;
        if self.config.normalize {
            embeddings.iter_mut().for_each(|v| normalize(v));
        }
        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let texts = vec![text.to_string()];
        self.request_batch(&texts)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::invalid_response("no embedding generated for text"))
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::default());
        }

        tracing::debug!("Generating embeddings for {} texts", texts.len());
        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size) {
            tracing::debug!("Processing batch of {} texts", batch.len());
            all_embeddings.extend(self.request_batch(batch).await?);
        }

        let result = EmbeddingResult::new(all_embeddings);
        if result.embeddings.iter().any(|e| e.len() != result.dimension) {
            return Err(EmbedError::invalid_response(
                "embeddings in one response have different dimensions",
            ));
        }
        Ok(result)
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }

    fn provider_name(&self) -> &str {
        "openai-compatible"
    }
}

/// Decodes an `/embeddings` response body, ordering the vectors by their
/// `index` field and checking there is one usable vector per input.
fn parse_embeddings(body: &[u8], expected: usize) -> Result<Vec<Vec<f32>>> {
    let mut response: EmbeddingResponse =
        serde_json::from_slice(body).map_err(EmbedError::embedding_gen)?;

    if response.data.len() != expected {
        return Err(EmbedError::invalid_response(format!(
            "expected {expected} embeddings, got {}",
            response.data.len()
        )));
    }
    response.data.sort_by_key(|d| d.index);

    let mut embeddings = Vec::with_capacity(expected);
    for data in response.data {
        if data.embedding.is_empty() {
            return Err(EmbedError::invalid_response("empty embedding vector"));
        }
        if data.embedding.iter().any(|v| !v.is_finite()) {
            return Err(EmbedError::invalid_response("non-finite values in embedding"));
        }
        embeddings.push(data.embedding);
    }
    Ok(embeddings)
}

/// Pulls `error.message` out of an OpenAI-style error body, falling back to
/// the raw text.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body.trim().to_string(),
    }
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned `(status, body)` per incoming connection and returns
    /// the request bodies it received.
    async fn serve(responses: Vec<(u16, String)>) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/v1", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                requests.push(read_request(&mut socket).await);

                let reply = format!(
                    "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
            requests
        });

        (base_url, handle)
    }

    /// Reads one HTTP/1.1 request and returns its head followed by its body.
    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn body_of(request: &str) -> serde_json::Value {
        let (_, body) = request.split_once("\r\n\r\n").unwrap();
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_embedding_result() {
        let result = EmbeddingResult::new(vec![vec![0.1, 0.2, 0.3], vec![0.4, 0.5, 0.6]]);

        assert_eq!(result.len(), 2);
        assert_eq!(result.dimension, 3);
        assert!(!result.is_empty());
        assert_eq!(EmbeddingResult::default().dimension, 0);
    }

    #[test]
    fn test_parse_orders_by_index() {
        let body = br#"{"object":"list","data":[
            {"object":"embedding","index":1,"embedding":[0.0,1.0]},
            {"object":"embedding","index":0,"embedding":[1.0,0.0]}
        ],"model":"m","usage":{"prompt_tokens":4,"total_tokens":4}}"#;

        let embeddings = parse_embeddings(body, 2).unwrap();
        assert_eq!(embeddings, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_parse_rejects_bad_payloads() {
        assert!(matches!(
            parse_embeddings(br#"{"data":[]}"#, 1),
            Err(EmbedError::InvalidResponse { .. })
        ));
        assert!(matches!(
            parse_embeddings(br#"{"data":[{"index":0,"embedding":[]}]}"#, 1),
            Err(EmbedError::InvalidResponse { .. })
        ));
        assert!(matches!(
            parse_embeddings(b"<html>oops</html>", 1),
            Err(EmbedError::EmbeddingGeneration { .. })
        ));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"error":{"message":"model not found","type":"invalid_request_error"}}"#),
            "model not found"
        );
        assert_eq!(error_message("  upstream timeout \n"), "upstream timeout");
    }

    #[test]
    fn test_normalize() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let err = OpenAiEmbeddingProvider::new(EmbedConfig::default()).unwrap_err();
        assert!(matches!(err, EmbedError::InvalidConfig { .. }));
    }

    #[tokio::test]
    async fn test_embed_text_against_server() {
        let (base_url, server) = serve(vec![(
            200,
            r#"{"data":[{"index":0,"embedding":[0.25,0.5,0.75]}]}"#.to_string(),
        )])
        .await;

        let config = EmbedConfig::new("test-model")
            .with_base_url(base_url)
            .with_api_key("sk-local");
        let provider = OpenAiEmbeddingProvider::new(config).unwrap();
        let embedding = provider.embed_text("hello").await.unwrap();

        assert_eq!(embedding, vec![0.25, 0.5, 0.75]);
        assert_eq!(provider.model_name(), "test-model");
        assert_eq!(provider.provider_name(), "openai-compatible");

        let requests = server.await.unwrap();
        assert!(requests[0].starts_with("POST /v1/embeddings"));
        assert!(requests[0].to_lowercase().contains("authorization: bearer sk-local"));
        let body = body_of(&requests[0]);
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["input"], serde_json::json!(["hello"]));
    }

    #[tokio::test]
    async fn test_embed_texts_batches_requests() {
        let (base_url, server) = serve(vec![
            (
                200,
                r#"{"data":[{"index":0,"embedding":[1.0,0.0]},{"index":1,"embedding":[0.0,1.0]}]}"#
                    .to_string(),
            ),
            (200, r#"{"data":[{"index":0,"embedding":[1.0,1.0]}]}"#.to_string()),
        ])
        .await;

        let config = EmbedConfig::new("m")
            .with_base_url(base_url)
            .with_batch_size(2);
        let provider = OpenAiEmbeddingProvider::new(config).unwrap();
        let texts: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let result = provider.embed_texts(&texts).await.unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result.dimension, 2);
        assert_eq!(result.embeddings[2], vec![1.0, 1.0]);

        let requests = server.await.unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(body_of(&requests[0])["input"], serde_json::json!(["a", "b"]));
        assert_eq!(body_of(&requests[1])["input"], serde_json::json!(["c"]));
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let (base_url, server) = serve(vec![(
            404,
            r#"{"error":{"message":"model 'missing' not found"}}"#.to_string(),
        )])
        .await;

        let provider =
            OpenAiEmbeddingProvider::new(EmbedConfig::new("missing").with_base_url(base_url)).unwrap();
        let err = provider.embed_text("hello").await.unwrap_err();

        match err {
            EmbedError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "model 'missing' not found");
            }
            other => panic!("unexpected error: {other}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_normalize_option() {
        let (base_url, server) =
            serve(vec![(200, r#"{"data":[{"index":0,"embedding":[3.0,4.0]}]}"#.to_string())]).await;

        let config = EmbedConfig::new("m")
            .with_base_url(base_url)
            .with_normalize(true);
        let provider = OpenAiEmbeddingProvider::new(config).unwrap();
        let embedding = provider.embed_text("x").await.unwrap();

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_request() {
        let provider = OpenAiEmbeddingProvider::new(
            EmbedConfig::new("m").with_base_url("http://127.0.0.1:9"),
        )
        .unwrap();
        let result = provider.embed_texts(&[]).await.unwrap();
        assert!(result.is_empty());
    }

    struct Doubler;

    #[async_trait]
    impl EmbeddingProvider for Doubler {
        async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 2.0 * text.len() as f32])
        }

        fn model_name(&self) -> &str {
            "doubler"
        }

        fn provider_name(&self) -> &str {
            "test"
        }
    }

    #[tokio::test]
    async fn test_default_embed_texts_preserves_order() {
        let texts = vec!["a".to_string(), "abc".to_string()];
        let result = Doubler.embed_texts(&texts).await.unwrap();
        assert_eq!(result.embeddings, vec![vec![1.0, 2.0], vec![3.0, 6.0]]);
    }
}
