use anyhow::Context;
use domain::models::{AnswerRecord, QaEntry, SimilarItem};
use domain::ports::EmbeddingModel;
use shared::types::Result;
use std::collections::HashSet;

use crate::embedder::{Embedder, EmbeddingInput};
use crate::embedding_storage::{EmbeddingStorage, StoredEmbedding};
use crate::search::SearchEngine;

pub const QUESTIONS_COLLECTION: &str = "questioncache_questions";

/// A named set of embedded texts inside an [`EmbeddingStorage`], each
/// carrying an [`AnswerRecord`]. Ids are the literal text that was embedded.
pub struct Collection<'a, E> {
    storage: &'a EmbeddingStorage,
    model: &'a E,
    name: String,
    id: i64,
}

impl<'a, E: EmbeddingModel> Collection<'a, E> {
    pub fn open(storage: &'a EmbeddingStorage, model: &'a E, name: &str) -> Result<Self> {
        let id = storage.ensure_collection(name, model.model_id())?;
        Ok(Self {
            storage,
            model,
            name: name.to_string(),
            id,
        })
    }

    pub fn count(&self) -> Result<usize> {
        self.storage.count_embeddings(self.id)
    }

    /// Embed and store one entry. An id that is already present is left
    /// as is and not re-embedded; returns whether a row was written.
    pub async fn embed(&self, id: &str, text: &str, metadata: &AnswerRecord) -> Result<bool> {
        if self.storage.has_embedding(self.id, id)? {
            tracing::debug!(collection = %self.name, id, "already embedded, skipping");
            return Ok(false);
        }
        let row = StoredEmbedding {
            id: id.to_string(),
            vector: self.model.embed(text).await?,
            content: text.to_string(),
            metadata: Some(serde_json::to_string(metadata)?),
        };
        Ok(self.storage.insert_embeddings(self.id, &[row])? > 0)
    }

    /// Embed many `(id, text, metadata)` entries in batches of `batch_size`.
    /// Ids already stored, or repeated within `entries`, keep their first
    /// occurrence. Nothing is written unless every batch embeds successfully.
    pub async fn embed_multi<I>(&self, entries: I, batch_size: usize) -> Result<usize>
    where
        I: IntoIterator<Item = (String, String, AnswerRecord)>,
    {
        let mut seen = HashSet::new();
        let mut inputs = Vec::new();
        for (id, text, metadata) in entries {
            if !seen.insert(id.clone()) || self.storage.has_embedding(self.id, &id)? {
                continue;
            }
            inputs.push(EmbeddingInput {
                id,
                text,
                metadata: Some(serde_json::to_string(&metadata)?),
            });
        }
        if inputs.is_empty() {
            return Ok(0);
        }
        let embeddings = Embedder::new(self.model)
            .generate_embeddings(&inputs, batch_size)
            .await?;
        self.storage.insert_embeddings(self.id, &embeddings)
    }

    pub async fn similar(&self, text: &str, count: usize) -> Result<Vec<SimilarItem>> {
        let vector = self.model.embed(text).await?;
        self.similar_by_vector(&vector, count)
    }

    pub fn similar_by_vector(&self, vector: &[f32], count: usize) -> Result<Vec<SimilarItem>> {
        let rows = self.storage.get_all_embeddings(self.id)?;
        Ok(SearchEngine::find_nearest(vector, &rows, count)
            .into_iter()
            .map(|(score, row)| SimilarItem {
                id: row.id.clone(),
                score: score.is_finite().then_some(score),
                metadata: decode_metadata(&row.id, row.metadata.as_deref()),
            })
            .collect())
    }

    /// Direct read by id, bypassing similarity.
    pub fn get(&self, id: &str) -> Result<Option<QaEntry>> {
        let Some(row) = self.storage.get_embedding(self.id, id)? else {
            return Ok(None);
        };
        let raw = row
            .metadata
            .with_context(|| format!("Entry {id:?} in '{}' has no metadata", self.name))?;
        let record: AnswerRecord = serde_json::from_str(&raw)
            .with_context(|| format!("Entry {id:?} in '{}' has invalid metadata", self.name))?;
        Ok(Some(QaEntry {
            question: row.id,
            answer: record.answer,
            embedding: row.vector,
        }))
    }
}

fn decode_metadata(id: &str, raw: Option<&str>) -> Option<AnswerRecord> {
    let raw = raw?;
    match serde_json::from_str(raw) {
        Ok(record) => Some(record),
        Err(err) => {
            tracing::warn!(id, %err, "ignoring entry with unreadable metadata");
            None
        }
    }
}
