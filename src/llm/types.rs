use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImageArgs,
    ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessageArgs,
    ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
    ImageDetail, ImageUrlArgs,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// One piece of a message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { url: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
}

/// Incremental output of a streaming completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionChunk {
    pub delta: String,
    pub finish_reason: Option<String>,
}

pub type CompletionStream = Pin<Box<dyn Stream<Item = crate::Result<CompletionChunk>> + Send>>;

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: vec![ContentPart::Text { text: text.into() }],
        }
    }

    pub fn user(parts: Vec<ContentPart>) -> Self {
        Self {
            role: "user".to_string(),
            content: parts,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: vec![ContentPart::Text { text: text.into() }],
        }
    }

    /// Concatenated text parts; image parts are skipped.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::ImageUrl { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn image_urls(&self) -> Vec<&str> {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::ImageUrl { url } => Some(url.as_str()),
                ContentPart::Text { .. } => None,
            })
            .collect()
    }

    fn has_images(&self) -> bool {
        self.content
            .iter()
            .any(|part| matches!(part, ContentPart::ImageUrl { .. }))
    }

    pub fn to_openai_message(&self) -> Result<ChatCompletionRequestMessage, crate::Error> {
        match self.role.as_str() {
            "system" => {
                let msg = ChatCompletionRequestSystemMessageArgs::default()
                    .content(ChatCompletionRequestSystemMessageContent::Text(self.text()))
                    .build()
                    .map_err(|e| {
                        crate::Error::llm(format!("Failed to build system message: {}", e))
                    })?;
                Ok(msg.into())
            }
            "user" => {
                let content = if self.has_images() {
                    let mut parts = Vec::with_capacity(self.content.len());
                    for part in &self.content {
                        parts.push(part.to_openai_part()?);
                    }
                    ChatCompletionRequestUserMessageContent::Array(parts)
                } else {
                    ChatCompletionRequestUserMessageContent::Text(self.text())
                };
                let msg = ChatCompletionRequestUserMessageArgs::default()
                    .content(content)
                    .build()
                    .map_err(|e| {
                        crate::Error::llm(format!("Failed to build user message: {}", e))
                    })?;
                Ok(msg.into())
            }
            "assistant" => {
                let msg = ChatCompletionRequestAssistantMessageArgs::default()
                    .content(ChatCompletionRequestAssistantMessageContent::Text(
                        self.text(),
                    ))
                    .build()
                    .map_err(|e| {
                        crate::Error::llm(format!("Failed to build assistant message: {}", e))
                    })?;
                Ok(msg.into())
            }
            _ => Err(crate::Error::UnknownRole {
                role: self.role.clone(),
            }),
        }
    }
}

impl ContentPart {
    fn to_openai_part(&self) -> Result<ChatCompletionRequestUserMessageContentPart, crate::Error> {
        match self {
            ContentPart::Text { text } => {
                let part = ChatCompletionRequestMessageContentPartTextArgs::default()
                    .text(text.clone())
                    .build()
                    .map_err(|e| crate::Error::llm(format!("Failed to build text part: {}", e)))?;
                Ok(part.into())
            }
            ContentPart::ImageUrl { url } => {
                let image_url = ImageUrlArgs::default()
                    .url(url.clone())
                    .detail(ImageDetail::Auto)
                    .build()
                    .map_err(|e| crate::Error::llm(format!("Failed to build image url: {}", e)))?;
                let part = ChatCompletionRequestMessageContentPartImageArgs::default()
                    .image_url(image_url)
                    .build()
                    .map_err(|e| {
                        crate::Error::llm(format!("Failed to build image part: {}", e))
                    })?;
                Ok(part.into())
            }
        }
    }
}
