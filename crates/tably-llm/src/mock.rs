use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;

use tably_core::errors::ChatError;

use crate::provider::{CompletionProvider, TokenStream};

/// Pre-programmed responses for deterministic testing without API calls.
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// A full reply; streamed as a single token.
    Text(String),
    /// A token sequence, possibly ending in an error item.
    Stream(Vec<Result<String, ChatError>>),
    /// Fail the call itself.
    Error(ChatError),
    /// Wait a duration, then yield the inner response.
    Delay(Duration, Box<MockResponse>),
}

impl MockResponse {
    pub fn text(text: &str) -> Self {
        Self::Text(text.to_string())
    }

    pub fn tokens(tokens: &[&str]) -> Self {
        Self::Stream(tokens.iter().map(|t| Ok(t.to_string())).collect())
    }

    /// Tokens followed by a mid-stream interruption.
    pub fn interrupted(tokens: &[&str], reason: &str) -> Self {
        let mut items: Vec<Result<String, ChatError>> =
            tokens.iter().map(|t| Ok(t.to_string())).collect();
        items.push(Err(ChatError::StreamInterrupted(reason.to_string())));
        Self::Stream(items)
    }

    pub fn delayed(delay: Duration, inner: MockResponse) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Mock provider that returns pre-programmed responses in sequence.
/// `complete` and `stream` draw from the same sequence.
pub struct MockProvider {
    responses: Vec<MockResponse>,
    call_count: AtomicUsize,
}

impl MockProvider {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses,
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    async fn next_response(&self) -> Result<MockResponse, ChatError> {
        let idx = self.call_count.fetch_add(1, Ordering::Relaxed);
        let Some(response) = self.responses.get(idx) else {
            return Err(ChatError::InvalidArgument(format!(
                "MockProvider: no response configured for call {idx}"
            )));
        };

        // Unroll nested delays iteratively to avoid recursive async.
        let mut current = response;
        loop {
            match current {
                MockResponse::Delay(duration, inner) => {
                    tokio::time::sleep(*duration).await;
                    current = inner;
                }
                other => return Ok(other.clone()),
            }
        }
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, _system: &str, _user: &str) -> Result<String, ChatError> {
        match self.next_response().await? {
            MockResponse::Text(text) => Ok(text),
            MockResponse::Stream(items) => items.into_iter().collect::<Result<Vec<_>, _>>().map(|t| t.concat()),
            MockResponse::Error(e) => Err(e),
            MockResponse::Delay(..) => unreachable!("delays unrolled in next_response"),
        }
    }

    async fn stream(&self, _system: &str, _user: &str) -> Result<TokenStream, ChatError> {
        match self.next_response().await? {
            MockResponse::Text(text) => Ok(Box::pin(stream::iter(vec![Ok(text)]))),
            MockResponse::Stream(items) => Ok(Box::pin(stream::iter(items))),
            MockResponse::Error(e) => Err(e),
            MockResponse::Delay(..) => unreachable!("delays unrolled in next_response"),
        }
    }
}
