use anyhow::Context;
use domain::error::QuestionCacheError;
use domain::ports::{EmbeddingModel, LanguageModel, ModelResponse};
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use shared::telemetry::Telemetry;
use shared::types::Result;
use std::collections::VecDeque;
use std::sync::Arc;

const COLLABORATOR: &str = "ollama";

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Message,
}

/// One NDJSON line of a streamed chat reply.
#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Shared HTTP handle to an Ollama server.
#[derive(Clone)]
pub struct OllamaClient {
    client: Arc<Client>,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Arc::new(Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed contacting Ollama at {url}"))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(QuestionCacheError::collaborator(
                COLLABORATOR,
                format!("{status} from {path}: {text}"),
            )
            .into());
        }
        Ok(response)
    }
}

/// Embedding backend over `/api/embed`.
#[derive(Clone)]
pub struct OllamaEmbeddings {
    client: OllamaClient,
    model: String,
}

impl OllamaEmbeddings {
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

impl EmbeddingModel for OllamaEmbeddings {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| {
            QuestionCacheError::collaborator(COLLABORATOR, "empty embedding response").into()
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };
        let response = self.client.post("/api/embed", &request).await?;
        let body: EmbedResponse = response
            .json()
            .await
            .context("Failed decoding Ollama embedding response")?;
        if body.embeddings.len() != texts.len() {
            return Err(QuestionCacheError::collaborator(
                COLLABORATOR,
                format!(
                    "expected {} embeddings, received {}",
                    texts.len(),
                    body.embeddings.len()
                ),
            )
            .into());
        }
        Ok(body.embeddings)
    }
}

/// Answering model over `/api/chat`.
#[derive(Clone)]
pub struct OllamaChat {
    client: OllamaClient,
    model: String,
    stream: bool,
}

impl OllamaChat {
    pub fn new(client: OllamaClient, model: impl Into<String>, stream: bool) -> Self {
        Self {
            client,
            model: model.into(),
            stream,
        }
    }
}

impl LanguageModel for OllamaChat {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn can_stream(&self) -> bool {
        self.stream
    }

    async fn prompt(&self, question: &str, system: &str) -> Result<ModelResponse> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: question.to_string(),
                },
            ],
            stream: self.stream,
        };
        let timer = Telemetry::start("ollama chat request");
        let response = self.client.post("/api/chat", &request).await?;
        timer.finish();

        if !self.stream {
            let body: ChatResponse = response
                .json()
                .await
                .context("Failed decoding Ollama chat response")?;
            return Ok(ModelResponse::Text(body.message.content));
        }

        let bytes: ByteStream = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()))
            .boxed();
        let fragments = stream::try_unfold((bytes, ChatStreamDecoder::default()), pull_fragment);
        Ok(ModelResponse::Stream(fragments.boxed()))
    }
}

type ByteStream = BoxStream<'static, reqwest::Result<Vec<u8>>>;
type StreamState = (ByteStream, ChatStreamDecoder);

async fn pull_fragment(state: StreamState) -> Result<Option<(String, StreamState)>> {
    let (mut bytes, mut decoder) = state;
    loop {
        if let Some(fragment) = decoder.next_fragment() {
            return Ok(Some((fragment, (bytes, decoder))));
        }
        if decoder.is_exhausted() {
            return Ok(None);
        }
        match bytes.next().await {
            Some(chunk) => decoder.push(&chunk.context("Failed reading Ollama stream")?)?,
            None => decoder.finish()?,
        }
    }
}

/// Splits a byte stream into NDJSON lines and collects message fragments
/// until the server reports `done`. Lines may span network chunks.
#[derive(Default)]
struct ChatStreamDecoder {
    buffer: Vec<u8>,
    pending: VecDeque<String>,
    done: bool,
    finished: bool,
}

impl ChatStreamDecoder {
    fn push(&mut self, bytes: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(bytes);
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.decode_line(&line)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let rest = std::mem::take(&mut self.buffer);
        self.decode_line(&rest)?;
        self.finished = true;
        Ok(())
    }

    fn decode_line(&mut self, line: &[u8]) -> Result<()> {
        if self.done {
            return Ok(());
        }
        let text = std::str::from_utf8(line)
            .context("Ollama stream was not valid UTF-8")?
            .trim();
        if text.is_empty() {
            return Ok(());
        }
        let chunk: ChatChunk = serde_json::from_str(text)
            .with_context(|| format!("Failed decoding Ollama stream line: {text}"))?;
        if let Some(error) = chunk.error {
            return Err(QuestionCacheError::collaborator(COLLABORATOR, error).into());
        }
        if let Some(message) = chunk.message {
            if !message.content.is_empty() {
                self.pending.push_back(message.content);
            }
        }
        if chunk.done {
            self.done = true;
        }
        Ok(())
    }

    fn next_fragment(&mut self) -> Option<String> {
        self.pending.pop_front()
    }

    fn is_exhausted(&self) -> bool {
        self.done || self.finished
    }
}
