use domain::ports::EmbeddingModel;
use shared::types::Result;

use crate::embedding_storage::StoredEmbedding;

/// Text to embed, with the id and metadata it will be stored under.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    pub id: String,
    pub text: String,
    pub metadata: Option<String>,
}

pub struct Embedder<'a, E> {
    model: &'a E,
}

impl<'a, E: EmbeddingModel> Embedder<'a, E> {
    pub fn new(model: &'a E) -> Self {
        Self { model }
    }

    /// Embed inputs in `batch_size` groups, one backend call per group.
    pub async fn generate_embeddings(
        &self,
        inputs: &[EmbeddingInput],
        batch_size: usize,
    ) -> Result<Vec<StoredEmbedding>> {
        let mut embeddings = Vec::with_capacity(inputs.len());
        for chunk in inputs.chunks(batch_size.max(1)) {
            tracing::debug!(count = chunk.len(), model = self.model.model_id(), "embedding batch");
            let texts: Vec<String> = chunk.iter().map(|input| input.text.clone()).collect();
            let vectors = self.model.embed_batch(&texts).await?;
            embeddings.extend(chunk.iter().zip(vectors).map(|(input, vector)| StoredEmbedding {
                id: input.id.clone(),
                vector,
                content: input.text.clone(),
                metadata: input.metadata.clone(),
            }));
        }
        Ok(embeddings)
    }
}
