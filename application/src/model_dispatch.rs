use domain::policy::SYSTEM_PROMPT;
use domain::ports::{LanguageModel, ModelResponse};
use futures::StreamExt;
use shared::telemetry::Telemetry;
use shared::types::Result;

/// Pose `question` to the model under the short-answer system prompt.
pub async fn ask_model<L: LanguageModel>(model: &L, question: &str) -> Result<ModelResponse> {
    tracing::info!(model = model.model_id(), streaming = model.can_stream(), "posing question");
    model.prompt(question, SYSTEM_PROMPT).await
}

/// Hand each fragment to `on_chunk` as it arrives and return the full answer.
/// A materialized response is delivered as a single fragment.
pub async fn relay<F>(response: ModelResponse, mut on_chunk: F) -> Result<String>
where
    F: FnMut(&str) -> Result<()>,
{
    tracing::debug!(streaming = response.is_streaming(), "relaying model answer");
    let timer = Telemetry::start("model answer");
    let answer = match response {
        ModelResponse::Text(text) => {
            on_chunk(&text)?;
            text
        }
        ModelResponse::Stream(mut chunks) => {
            let mut answer = String::new();
            while let Some(chunk) = chunks.next().await {
                let chunk = chunk?;
                on_chunk(&chunk)?;
                answer.push_str(&chunk);
            }
            answer
        }
    };
    timer.finish();
    Ok(answer)
}
