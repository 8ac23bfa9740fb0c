use crate::embedding_storage::StoredEmbedding;
use std::cmp::Ordering;

pub struct SearchEngine;

impl SearchEngine {
    /// Cosine similarity; 0.0 when either vector has zero magnitude or the
    /// dimensions differ.
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }
        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot_product / (norm_a * norm_b)
    }

    /// The `top_k` rows nearest to `query_embedding`, best first.
    pub fn find_nearest<'a>(
        query_embedding: &[f32],
        embeddings: &'a [StoredEmbedding],
        top_k: usize,
    ) -> Vec<(f32, &'a StoredEmbedding)> {
        let mut similarities: Vec<(f32, &StoredEmbedding)> = embeddings
            .iter()
            .map(|emb| (Self::cosine_similarity(query_embedding, &emb.vector), emb))
            .collect();

        similarities.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        similarities.truncate(top_k);
        similarities
    }
}
