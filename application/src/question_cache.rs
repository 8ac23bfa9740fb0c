use domain::models::{AnswerRecord, CollectionResponse, ImportEntry};
use domain::policy::{CachePolicy, IMPORT_BATCH_SIZE};
use domain::ports::EmbeddingModel;
use infrastructure::collection::Collection;
use shared::types::Result;

/// Cache lookup and recording policy over the question collection.
///
/// Questions are keyed by their literal text: exact lookups are case and
/// whitespace sensitive, everything else goes through embedding similarity.
pub struct QuestionCache<'a, E> {
    collection: Collection<'a, E>,
    policy: CachePolicy,
}

impl<'a, E: EmbeddingModel> QuestionCache<'a, E> {
    pub fn new(collection: Collection<'a, E>, policy: CachePolicy) -> Self {
        Self { collection, policy }
    }

    /// Cached answers similar enough to `question`, best first. Empty on a miss.
    pub async fn search_fuzzy(&self, question: &str) -> Result<Vec<CollectionResponse>> {
        let candidates = self
            .collection
            .similar(question, self.policy.fetch_count())
            .await?;
        let considered = candidates.len();
        let responses = self.policy.rank(candidates);
        tracing::debug!(considered, kept = responses.len(), "fuzzy search");
        Ok(responses)
    }

    /// The stored answer for exactly this question text, scored 1.0.
    pub fn search_exact(&self, question: &str) -> Result<Option<CollectionResponse>> {
        Ok(self
            .collection
            .get(question)?
            .map(|entry| CollectionResponse::exact(entry.question, entry.answer)))
    }

    /// Store a question and its answer. Recording a question that is already
    /// cached keeps the original answer.
    pub async fn record(&self, question: &str, answer: &str) -> Result<()> {
        let written = self
            .collection
            .embed(question, question, &AnswerRecord::new(answer))
            .await?;
        if !written {
            tracing::debug!(question, "question already cached; keeping stored answer");
        }
        Ok(())
    }

    /// Store many pairs through the same embedding path as [`record`](Self::record),
    /// in batches of 32. Returns the number of new questions stored.
    pub async fn import_batch(&self, entries: &[ImportEntry]) -> Result<usize> {
        let stored = self
            .collection
            .embed_multi(
                entries.iter().map(|entry| {
                    (
                        entry.question.clone(),
                        entry.question.clone(),
                        AnswerRecord::new(entry.answer.clone()),
                    )
                }),
                IMPORT_BATCH_SIZE,
            )
            .await?;
        tracing::info!(received = entries.len(), stored, "imported answers");
        Ok(stored)
    }

    pub fn len(&self) -> Result<usize> {
        self.collection.count()
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
