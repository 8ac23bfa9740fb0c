//! Deterministic stand-ins for the embedding and answering models.

use application::context::CacheContext;
use domain::policy::CachePolicy;
use domain::ports::{EmbeddingModel, LanguageModel, ModelResponse};
use futures::stream::{self, StreamExt};
use infrastructure::embedding_storage::EmbeddingStorage;
use shared::types::Result;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;

/// Letter-frequency embeddings: anagrams score 1.0, texts with no shared
/// letters score 0.0. Individual texts can be pinned to explicit vectors.
pub struct FakeEmbeddings {
    model_id: String,
    pinned: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
}

impl Default for FakeEmbeddings {
    fn default() -> Self {
        Self::with_model_id("fake-embed")
    }
}

impl FakeEmbeddings {
    pub fn with_model_id(model_id: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
            pinned: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn pin(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.pinned.insert(text.to_string(), vector);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingModel for FakeEmbeddings {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(vector) = self.pinned.get(text) {
            return Ok(vector.clone());
        }
        let mut vector = vec![0.0; 26];
        for c in text.chars().filter(char::is_ascii_alphabetic) {
            vector[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
        }
        Ok(vector)
    }
}

/// Answers every question with the same text, optionally streamed word by word.
pub struct FakeModel {
    answer: String,
    streaming: bool,
    fail: bool,
    prompts: Mutex<Vec<(String, String)>>,
}

impl FakeModel {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            streaming: false,
            fail: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn streaming(answer: &str) -> Self {
        Self {
            streaming: true,
            ..Self::answering(answer)
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::answering("")
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// `(question, system prompt)` pairs in call order.
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

impl LanguageModel for FakeModel {
    fn model_id(&self) -> &str {
        "fake-model"
    }

    fn can_stream(&self) -> bool {
        self.streaming
    }

    async fn prompt(&self, question: &str, system: &str) -> Result<ModelResponse> {
        self.prompts
            .lock()
            .unwrap()
            .push((question.to_string(), system.to_string()));
        if self.fail {
            anyhow::bail!(domain::error::QuestionCacheError::collaborator(
                "fake-model",
                "backend unavailable"
            ));
        }
        if !self.streaming {
            return Ok(ModelResponse::Text(self.answer.clone()));
        }
        let chunks: Vec<Result<String>> = self
            .answer
            .split_inclusive(' ')
            .map(|chunk| Ok(chunk.to_string()))
            .collect();
        Ok(ModelResponse::Stream(stream::iter(chunks).boxed()))
    }
}

pub type FakeContext = CacheContext<FakeEmbeddings, FakeModel>;

/// A context over a fresh database file inside a temporary directory.
pub fn fake_context(embeddings: FakeEmbeddings, model: FakeModel) -> (TempDir, FakeContext) {
    let dir = tempfile::tempdir().expect("temp dir");
    let context = reopen(&dir, embeddings, model);
    (dir, context)
}

/// A new context over the database already in `dir`, as a later invocation would see it.
pub fn reopen(dir: &TempDir, embeddings: FakeEmbeddings, model: FakeModel) -> FakeContext {
    let storage = EmbeddingStorage::new(dir.path().join("questioncache.sqlite3")).expect("storage");
    CacheContext::new(storage, embeddings, model, CachePolicy::default())
}
