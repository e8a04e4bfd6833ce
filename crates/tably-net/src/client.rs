use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use tracing::warn;

use tably_core::errors::ChatError;

const DEFAULT_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);
const DEFAULT_OVERALL_TIMEOUT: Duration = Duration::from_secs(8);

/// Retry behavior for outbound HTTP calls. The overall timeout bounds
/// the whole attempt sequence, not each attempt.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff_base: Duration,
    pub overall_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
            overall_timeout: DEFAULT_OVERALL_TIMEOUT,
        }
    }
}

/// HTTP client that retries transport failures and retryable statuses
/// (429, 5xx) with exponential backoff. Retries are invisible to
/// callers: they see one response or one error.
pub struct ResilientClient {
    client: Client,
    policy: RetryPolicy,
}

impl Default for ResilientClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ResilientClient {
    pub fn new() -> Self {
        Self::with_policy(RetryPolicy::default())
    }

    pub fn with_policy(policy: RetryPolicy) -> Self {
        Self {
            client: Client::new(),
            policy,
        }
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    /// Run the request through the retry loop under the overall
    /// timeout. A non-OK final response is returned as-is with its
    /// status preserved; callers decide what non-OK means.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response, ChatError> {
        match tokio::time::timeout(self.policy.overall_timeout, self.run_attempts(request)).await {
            Ok(result) => result,
            Err(_) => Err(ChatError::Timeout(self.policy.overall_timeout)),
        }
    }

    async fn run_attempts(&self, request: RequestBuilder) -> Result<Response, ChatError> {
        let mut last_error = None;

        for attempt in 1..=self.policy.attempts {
            let Some(req) = request.try_clone() else {
                return Err(ChatError::InvalidArgument(
                    "request body is not retry-safe".to_string(),
                ));
            };

            match req.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if ChatError::is_retryable_status(status) && attempt < self.policy.attempts {
                        let delay = self.retry_delay(attempt);
                        warn!(
                            status,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "retryable status, backing off"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Ok(response);
                }
                Err(e) => {
                    if attempt < self.policy.attempts {
                        let delay = self.retry_delay(attempt);
                        warn!(
                            error = %e,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "request failed, backing off"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(ChatError::Transport(e.to_string()));
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| ChatError::Transport("request failed with no attempts".to_string())))
    }

    /// Delay after failed attempt n: base * 2^n (2s, 4s with the 1s base).
    fn retry_delay(&self, failed_attempt: u32) -> Duration {
        self.policy.backoff_base * 2u32.saturating_pow(failed_attempt)
    }
}
