use async_trait::async_trait;
use foodscan_rust::{
    Error, Result,
    llm::{ChatCompletionRequest, CompletionChunk, CompletionStream, LlmClient},
};
use futures::stream::{self, StreamExt};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

/// One scripted item of a mock completion stream.
#[derive(Debug, Clone)]
pub enum MockStep {
    Chunk(String),
    Finish(String),
    Fail(String),
}

impl MockStep {
    pub fn chunk(text: &str) -> Self {
        Self::Chunk(text.to_string())
    }

    pub fn finish(reason: &str) -> Self {
        Self::Finish(reason.to_string())
    }

    pub fn fail(message: &str) -> Self {
        Self::Fail(message.to_string())
    }

    fn into_item(self) -> Result<CompletionChunk> {
        match self {
            Self::Chunk(delta) => Ok(CompletionChunk {
                delta,
                finish_reason: None,
            }),
            Self::Finish(reason) => Ok(CompletionChunk {
                delta: String::new(),
                finish_reason: Some(reason),
            }),
            Self::Fail(message) => Err(Error::llm(message)),
        }
    }
}

/// Mock LLM client replaying a fixed script and recording every request.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    pub steps: Vec<MockStep>,
    pub setup_error: Option<String>,
    pub endless: bool,
    pub requests: Arc<Mutex<Vec<ChatCompletionRequest>>>,
    pub upstream_dropped: Arc<AtomicBool>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_steps(mut self, steps: Vec<MockStep>) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_chunks(self, chunks: &[&str]) -> Self {
        let mut steps: Vec<MockStep> = chunks.iter().map(|c| MockStep::chunk(c)).collect();
        steps.push(MockStep::finish("stop"));
        self.with_steps(steps)
    }

    pub fn with_setup_error(mut self, error: &str) -> Self {
        self.setup_error = Some(error.to_string());
        self
    }

    /// After the scripted steps, the stream stays open forever.
    pub fn never_finishing(mut self) -> Self {
        self.endless = true;
        self
    }

    pub fn get_requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn was_upstream_dropped(&self) -> bool {
        self.upstream_dropped.load(Ordering::SeqCst)
    }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn create_chat_completion_stream(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<CompletionStream> {
        self.requests.lock().unwrap().push(request);

        if let Some(ref error) = self.setup_error {
            return Err(Error::llm(error.clone()));
        }

        let items: Vec<Result<CompletionChunk>> =
            self.steps.iter().cloned().map(MockStep::into_item).collect();
        let flag = DropFlag(self.upstream_dropped.clone());

        let scripted = stream::iter(items);
        let stream: CompletionStream = if self.endless {
            Box::pin(scripted.chain(stream::pending()).map(move |item| {
                let _ = &flag;
                item
            }))
        } else {
            Box::pin(scripted.map(move |item| {
                let _ = &flag;
                item
            }))
        };

        Ok(stream)
    }
}
