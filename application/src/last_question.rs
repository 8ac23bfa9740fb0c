use infrastructure::embedding_storage::EmbeddingStorage;
use shared::types::Result;

pub const LAST_QUESTION_KEY: &str = "last question";

/// Single persisted slot holding the most recently asked question, so a
/// later `send` can force it through to the model.
pub struct LastQuestion<'a> {
    storage: &'a EmbeddingStorage,
}

impl<'a> LastQuestion<'a> {
    pub fn new(storage: &'a EmbeddingStorage) -> Self {
        Self { storage }
    }

    pub fn save(&self, question: &str) -> Result<()> {
        self.storage.upsert_kv(LAST_QUESTION_KEY, question)
    }

    pub fn load(&self) -> Result<Option<String>> {
        self.storage.get_kv(LAST_QUESTION_KEY)
    }
}
