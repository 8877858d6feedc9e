use super::types::*;
use crate::{Error, Result, config::LlmConfig};
use async_openai::{Client, config::OpenAIConfig, types as openai_types};
use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

/// Streaming text generation over role-tagged, possibly multimodal, messages.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn create_chat_completion_stream(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<CompletionStream>;
}

pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(config.api_key);

        if !config.base_url.is_empty() {
            openai_config = openai_config.with_api_base(config.base_url);
        }

        let client = Client::with_config(openai_config);

        Self {
            client,
            model: config.model,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn create_chat_completion_stream(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<CompletionStream> {
        debug!(
            "Creating streaming chat completion with {} messages",
            request.messages.len()
        );

        let mut messages = Vec::new();
        for msg in &request.messages {
            messages.push(msg.to_openai_message()?);
        }

        let model = if request.model.is_empty() {
            self.model.as_str()
        } else {
            request.model.as_str()
        };

        let mut request_builder = openai_types::CreateChatCompletionRequestArgs::default();
        request_builder.model(model).messages(messages).stream(true);

        if let Some(max_tokens) = request.max_tokens {
            #[allow(deprecated)]
            request_builder.max_tokens(max_tokens);
        }

        let openai_request = request_builder.build()?;

        let stream = self.client.chat().create_stream(openai_request).await?;

        let chunks = stream.map(|item| match item {
            Ok(response) => Ok(to_chunk(response)),
            Err(e) => Err(Error::from(e)),
        });

        Ok(Box::pin(chunks))
    }
}

fn to_chunk(response: openai_types::CreateChatCompletionStreamResponse) -> CompletionChunk {
    // Usage-only frames arrive with no choices.
    let Some(choice) = response.choices.into_iter().next() else {
        return CompletionChunk::default();
    };

    CompletionChunk {
        delta: choice.delta.content.unwrap_or_default(),
        finish_reason: choice.finish_reason.map(finish_reason_name),
    }
}

fn finish_reason_name(reason: openai_types::FinishReason) -> String {
    serde_json::to_value(&reason)
        .ok()
        .and_then(|value| value.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{reason:?}").to_lowercase())
}
