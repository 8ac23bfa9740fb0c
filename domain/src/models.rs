use crate::error::QuestionCacheError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored question/answer pair. The question text is the key.
#[derive(Debug, Clone, PartialEq)]
pub struct QaEntry {
    pub question: String,
    pub answer: String,
    pub embedding: Vec<f32>,
}

/// Metadata persisted next to each embedded question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub answer: String,
}

impl AnswerRecord {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
        }
    }
}

/// A raw neighbor as returned by similarity search, before policy filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarItem {
    pub id: String,
    pub score: Option<f32>,
    pub metadata: Option<AnswerRecord>,
}

/// A cached answer offered in response to a question.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionResponse {
    pub score: f32,
    pub question: String,
    pub answer: String,
}

impl CollectionResponse {
    pub fn exact(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            score: 1.0,
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// One element of a bulk import payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntry {
    pub question: String,
    pub answer: String,
}

impl ImportEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// Parse a JSON array of `{question, answer}` objects.
    ///
    /// Scalar values (numbers, booleans) are accepted and rendered as text;
    /// a missing field, null, or nested value is rejected with the entry index.
    pub fn parse_batch(input: &str) -> Result<Vec<Self>, QuestionCacheError> {
        let value: Value =
            serde_json::from_str(input).map_err(|e| QuestionCacheError::MalformedImport {
                index: 0,
                reason: e.to_string(),
            })?;
        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(QuestionCacheError::MalformedImport {
                    index: 0,
                    reason: format!("expected a JSON array, found {}", kind_of(&other)),
                })
            }
        };
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                Ok(Self {
                    question: scalar_field(item, "question", index)?,
                    answer: scalar_field(item, "answer", index)?,
                })
            })
            .collect()
    }
}

fn scalar_field(item: &Value, field: &str, index: usize) -> Result<String, QuestionCacheError> {
    let malformed = |reason: String| QuestionCacheError::MalformedImport { index, reason };
    let object = item
        .as_object()
        .ok_or_else(|| malformed(format!("expected an object, found {}", kind_of(item))))?;
    match object.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(other) => Err(malformed(format!(
            "field '{field}' must be text, found {}",
            kind_of(other)
        ))),
        None => Err(malformed(format!("missing field '{field}'"))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
