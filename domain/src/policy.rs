use crate::error::QuestionCacheError;
use crate::models::{CollectionResponse, SimilarItem};
use std::cmp::Ordering;

// These may need adjusting per embedding model or questioning style.
pub const RELEVANCE_CUTOFF: f32 = 0.8;
pub const COLLECTION_RESPONSE_COUNT: usize = 3;
pub const IMPORT_BATCH_SIZE: usize = 32;
pub const SYSTEM_PROMPT: &str =
    "Answer in as few words as possible. Use a brief style with short replies.";

/// Thresholds that decide which neighbors count as cached answers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachePolicy {
    pub relevance_cutoff: f32,
    pub response_count: usize,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            relevance_cutoff: RELEVANCE_CUTOFF,
            response_count: COLLECTION_RESPONSE_COUNT,
        }
    }
}

impl CachePolicy {
    pub fn new(relevance_cutoff: f32, response_count: usize) -> Result<Self, QuestionCacheError> {
        if !(0.0..=1.0).contains(&relevance_cutoff) {
            return Err(QuestionCacheError::InvalidConfig(format!(
                "relevance cutoff must be within [0, 1], got {relevance_cutoff}"
            )));
        }
        if response_count == 0 {
            return Err(QuestionCacheError::InvalidConfig(
                "response count must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            relevance_cutoff,
            response_count,
        })
    }

    /// Neighbors to request before filtering. Low-relevance neighbors would
    /// otherwise crowd the top-N window.
    pub fn fetch_count(&self) -> usize {
        self.response_count * 2
    }

    /// Drop neighbors without a score above the cutoff or without metadata,
    /// then order by descending score and keep at most `response_count`.
    pub fn rank(&self, candidates: Vec<SimilarItem>) -> Vec<CollectionResponse> {
        let mut relevant: Vec<CollectionResponse> = candidates
            .into_iter()
            .filter_map(|item| {
                let score = item.score.filter(|s| *s > self.relevance_cutoff)?;
                let metadata = item.metadata?;
                Some(CollectionResponse {
                    score: score.min(1.0),
                    question: item.id,
                    answer: metadata.answer,
                })
            })
            .collect();

        // Stable sort keeps search order among equal scores.
        relevant.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        relevant.truncate(self.response_count);
        relevant
    }
}
