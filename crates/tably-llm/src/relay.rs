use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use serde::Deserialize;

use tably_core::errors::ChatError;

#[derive(Debug, Default, Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

/// Decodes an upstream `data: {...}` event stream and re-emits the raw
/// text tokens. Partial lines are buffered as raw bytes across chunk
/// boundaries and decoded only once their newline arrives, so a
/// multi-byte character split between chunks stays intact.
/// `data: [DONE]` ends the stream (anything after it is ignored);
/// payloads that fail to parse are skipped — heartbeats and partial
/// frames are expected noise, not errors. Dropping the relay drops the
/// upstream response, which cancels the completion.
pub struct TokenRelay {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, String>> + Send>>,
    buffer: BytesMut,
    pending: VecDeque<String>,
    done: bool,
}

impl TokenRelay {
    pub fn new<S, E>(byte_stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: std::fmt::Display,
    {
        Self {
            inner: Box::pin(byte_stream.map(|item| item.map_err(|e| e.to_string()))),
            buffer: BytesMut::new(),
            pending: VecDeque::new(),
            done: false,
        }
    }

    fn absorb(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.split_to(pos + 1);
            let line = String::from_utf8_lossy(&line[..pos]).into_owned();
            self.handle_line(&line);
        }
    }

    fn handle_line(&mut self, line: &str) {
        if self.done {
            return;
        }

        let line = line.trim_end_matches('\r');
        let Some(payload) = line.strip_prefix("data: ") else {
            return;
        };

        if payload == "[DONE]" {
            self.done = true;
            return;
        }

        if let Ok(parsed) = serde_json::from_str::<ChunkPayload>(payload) {
            let token = parsed
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content);
            if let Some(token) = token {
                if !token.is_empty() {
                    self.pending.push_back(token);
                }
            }
        }
    }
}

impl Stream for TokenRelay {
    type Item = Result<String, ChatError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Poll::Ready(Some(Ok(token)));
            }
            if self.done {
                return Poll::Ready(None);
            }

            match self.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => self.absorb(&bytes),
                Poll::Ready(Some(Err(e))) => {
                    self.done = true;
                    return Poll::Ready(Some(Err(ChatError::StreamInterrupted(e))));
                }
                Poll::Ready(None) => {
                    // Upstream ended without the sentinel: flush any
                    // final unterminated line, then end cleanly.
                    if !self.buffer.is_empty() {
                        let rest = std::mem::take(&mut self.buffer);
                        let rest = String::from_utf8_lossy(&rest).into_owned();
                        self.handle_line(&rest);
                    }
                    self.done = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
