use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use tably_core::errors::ChatError;

/// Raw text tokens as the upstream model produces them. Finite: ends
/// when the upstream completion ends. A mid-stream transport failure
/// yields exactly one `Err(StreamInterrupted)` item and then ends.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

/// A chat-completion backend. One system + one user message in, either
/// a full reply or a token stream out.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    /// Blocking completion: the whole reply as one string. An upstream
    /// reply with no content is the empty string, not an error.
    async fn complete(&self, system: &str, user: &str) -> Result<String, ChatError>;

    /// Streaming completion. The call itself fails on connection or
    /// status errors; once a stream is returned, failures arrive as
    /// stream items.
    async fn stream(&self, system: &str, user: &str) -> Result<TokenStream, ChatError>;
}
