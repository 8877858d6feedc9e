use super::{
    error::AnalysisError,
    types::{AnalysisEvent, AnalysisRequest, SYSTEM_PROMPT, ServiceStatus},
};
use crate::{
    config::LlmConfig,
    llm::{
        ChatCompletionRequest, ChatMessage, CompletionChunk, CompletionStream, ContentPart,
        LlmClient,
    },
};
use futures::stream::{self, Stream, StreamExt};
use std::{pin::Pin, sync::Arc};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Instrument, Span, debug, error, info, info_span};
use uuid::Uuid;

pub type AnalysisStream = Pin<Box<dyn Stream<Item = AnalysisEvent> + Send>>;

const RELAY_BUFFER: usize = 32;

/// Validated image submissions in, relayed model output out.
#[derive(Clone)]
pub struct AnalysisService {
    llm: Arc<dyn LlmClient>,
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl AnalysisService {
    pub fn new(llm: Arc<dyn LlmClient>, config: &LlmConfig) -> Self {
        Self {
            llm,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| SYSTEM_PROMPT.to_string()),
        }
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus::online()
    }

    /// System instruction followed by one user turn: prompt text, then the image.
    pub fn build_conversation(&self, request: &AnalysisRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(self.system_prompt.clone()),
                ChatMessage::user(vec![
                    ContentPart::Text {
                        text: request.resolved_prompt().to_string(),
                    },
                    ContentPart::ImageUrl {
                        url: request.image_url.to_string(),
                    },
                ]),
            ],
            max_tokens: Some(self.max_tokens),
        }
    }

    /// Starts generation and returns the relayed event stream.
    ///
    /// The provider call and its first chunk are awaited here, so failures to
    /// set up the stream come back as `Err`. Later provider failures arrive as
    /// a terminal `AnalysisEvent::Error`. Dropping the returned stream abandons
    /// the generation.
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisStream, AnalysisError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("analysis", %request_id);
        self.start(request).instrument(span).await
    }

    async fn start(&self, request: AnalysisRequest) -> Result<AnalysisStream, AnalysisError> {
        info!(
            "Submitting analysis for image: {} (custom prompt: {})",
            request.image_url,
            request.prompt.is_some()
        );

        let conversation = self.build_conversation(&request);

        let mut upstream = self
            .llm
            .create_chat_completion_stream(conversation)
            .await
            .map_err(|e| {
                error!("Failed to start model stream: {}", e);
                AnalysisError::from(e)
            })?;

        let first = match upstream.next().await {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => {
                error!("Model stream failed before the first chunk: {}", e);
                return Err(AnalysisError::from(e));
            }
            None => {
                info!("Model stream ended without output");
                let finished = AnalysisEvent::Finish { finish_reason: None };
                return Ok(Box::pin(stream::iter([finished])));
            }
        };

        let (tx, rx) = mpsc::channel(RELAY_BUFFER);
        tokio::spawn(relay(first, upstream, tx).instrument(Span::current()));

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

async fn relay(
    first: CompletionChunk,
    mut upstream: CompletionStream,
    tx: mpsc::Sender<AnalysisEvent>,
) {
    let mut pending = Some(first);
    let mut finish_reason = None;
    let mut fragments = 0usize;

    loop {
        let item = match pending.take() {
            Some(chunk) => Some(Ok(chunk)),
            None => tokio::select! {
                _ = tx.closed() => {
                    debug!(
                        "Client disconnected after {} fragments, abandoning generation",
                        fragments
                    );
                    return;
                }
                item = upstream.next() => item,
            },
        };

        let Some(item) = item else {
            break;
        };

        match item {
            Ok(chunk) => {
                if chunk.finish_reason.is_some() {
                    finish_reason = chunk.finish_reason;
                }
                if chunk.delta.is_empty() {
                    continue;
                }
                fragments += 1;
                if tx.send(AnalysisEvent::Text(chunk.delta)).await.is_err() {
                    debug!(
                        "Client disconnected after {} fragments, abandoning generation",
                        fragments
                    );
                    return;
                }
            }
            Err(e) => {
                error!("Model stream failed after {} fragments: {}", fragments, e);
                let _ = tx.send(AnalysisEvent::Error(AnalysisError::from(e))).await;
                return;
            }
        }
    }

    info!(
        "Analysis completed: {} fragments, finish reason {:?}",
        fragments, finish_reason
    );
    let _ = tx.send(AnalysisEvent::Finish { finish_reason }).await;
}
