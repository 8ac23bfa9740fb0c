//! Collaborator seams: the embedding backend and the answering model.

use futures::stream::BoxStream;
use shared::types::Result;
use std::future::Future;

/// Forward-only, finite sequence of answer fragments.
pub type TextStream = BoxStream<'static, Result<String>>;

/// Output of a model call, either fully materialized or streamed.
pub enum ModelResponse {
    Text(String),
    Stream(TextStream),
}

impl ModelResponse {
    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Stream(_))
    }
}

impl std::fmt::Debug for ModelResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

pub trait EmbeddingModel: Send + Sync {
    fn model_id(&self) -> &str;

    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>>> + Send;

    /// Embed several texts, one vector per input in the same order.
    /// Backends with native batching should override this.
    fn embed_batch(&self, texts: &[String]) -> impl Future<Output = Result<Vec<Vec<f32>>>> + Send {
        async move {
            let mut vectors = Vec::with_capacity(texts.len());
            for text in texts {
                vectors.push(self.embed(text).await?);
            }
            Ok::<_, anyhow::Error>(vectors)
        }
    }
}

pub trait LanguageModel: Send + Sync {
    fn model_id(&self) -> &str;

    fn can_stream(&self) -> bool;

    fn prompt(
        &self,
        question: &str,
        system: &str,
    ) -> impl Future<Output = Result<ModelResponse>> + Send;
}
