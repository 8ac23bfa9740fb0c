use domain::policy::CachePolicy;
use domain::ports::{EmbeddingModel, LanguageModel};
use infrastructure::collection::{Collection, QUESTIONS_COLLECTION};
use infrastructure::config::Config;
use infrastructure::embedding_storage::EmbeddingStorage;
use infrastructure::ollama_client::{OllamaChat, OllamaClient, OllamaEmbeddings};
use shared::types::Result;
use std::path::Path;

use crate::last_question::LastQuestion;
use crate::model_dispatch::{ask_model, relay};
use crate::question_cache::QuestionCache;

/// Everything one command invocation works with: the store file and both
/// model collaborators. Opened when a command starts, closed when it ends.
pub struct CacheContext<E, L> {
    storage: EmbeddingStorage,
    embeddings: E,
    model: L,
    policy: CachePolicy,
}

pub type OllamaContext = CacheContext<OllamaEmbeddings, OllamaChat>;

impl OllamaContext {
    pub fn open(config: &Config) -> Result<Self> {
        let client = OllamaClient::new(&config.ollama_base_url);
        tracing::debug!(db = %config.db_path.display(), "opening question cache");
        Ok(Self::new(
            EmbeddingStorage::new(&config.db_path)?,
            OllamaEmbeddings::new(client.clone(), &config.embedding_model),
            OllamaChat::new(client, &config.ollama_model, config.stream),
            config.policy,
        ))
    }
}

impl<E: EmbeddingModel, L: LanguageModel> CacheContext<E, L> {
    pub fn new(storage: EmbeddingStorage, embeddings: E, model: L, policy: CachePolicy) -> Self {
        Self {
            storage,
            embeddings,
            model,
            policy,
        }
    }

    pub fn db_path(&self) -> &Path {
        self.storage.path()
    }

    pub fn model(&self) -> &L {
        &self.model
    }

    pub fn questions(&self) -> Result<QuestionCache<'_, E>> {
        let collection = Collection::open(&self.storage, &self.embeddings, QUESTIONS_COLLECTION)?;
        Ok(QuestionCache::new(collection, self.policy))
    }

    /// Destroy every cached answer. Works even when the cache was built with
    /// a different embedding model than the one now configured.
    pub fn clear_questions(&self) -> Result<usize> {
        let removed = self.storage.delete_collection(QUESTIONS_COLLECTION)?;
        tracing::info!(removed, "cleared question cache");
        Ok(removed)
    }

    pub fn last_question(&self) -> LastQuestion<'_> {
        LastQuestion::new(&self.storage)
    }

    /// Send `question` to the model, pass fragments to `on_chunk` as they
    /// arrive, then cache the assembled answer.
    pub async fn ask_and_record<F>(&self, question: &str, on_chunk: F) -> Result<String>
    where
        F: FnMut(&str) -> Result<()>,
    {
        let response = ask_model(&self.model, question).await?;
        let answer = relay(response, on_chunk).await?;
        self.questions()?.record(question, &answer).await?;
        Ok(answer)
    }

    pub fn close(self) -> Result<()> {
        self.storage.close()
    }
}
