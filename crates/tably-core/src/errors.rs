use std::time::Duration;

/// Typed error hierarchy for the concierge pipeline.
/// Classifies errors as caller faults (reject), upstream faults
/// (retryable depending on status), or operational.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ChatError {
    // Caller faults — rejected before any I/O
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("not found: {0}")]
    NotFound(String),

    // Deployment faults
    #[error("configuration error: {0}")]
    Configuration(String),

    // Upstream faults
    #[error("upstream error {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("stream interrupted: {0}")]
    StreamInterrupted(String),

    // Operational
    #[error("timeout after {0:?}")]
    Timeout(Duration),
}

impl ChatError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream { status, .. } => Self::is_retryable_status(*status),
            Self::Transport(_) | Self::StreamInterrupted(_) => true,
            _ => false,
        }
    }

    pub fn is_caller_fault(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::NotFound(_))
    }

    /// Statuses worth another attempt: rate limiting and server errors.
    pub fn is_retryable_status(status: u16) -> bool {
        status == 429 || (500..=599).contains(&status)
    }

    /// Classify a non-success HTTP response into an error variant.
    pub fn from_status(status: u16, body: String) -> Self {
        Self::Upstream { status, body }
    }

    /// Short classification string for logging/metrics.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotFound(_) => "not_found",
            Self::Configuration(_) => "configuration",
            Self::Upstream { .. } => "upstream",
            Self::Transport(_) => "transport",
            Self::StreamInterrupted(_) => "stream_interrupted",
            Self::Timeout(_) => "timeout",
        }
    }

    /// HTTP status the service boundary reports for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidArgument(_) => 400,
            Self::NotFound(_) => 404,
            Self::Configuration(_) => 500,
            Self::Upstream { .. } | Self::StreamInterrupted(_) => 502,
            Self::Transport(_) | Self::Timeout(_) => 504,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(ChatError::Upstream { status: 429, body: "slow down".into() }.is_retryable());
        assert!(ChatError::Upstream { status: 500, body: "err".into() }.is_retryable());
        assert!(ChatError::Upstream { status: 503, body: "err".into() }.is_retryable());
        assert!(ChatError::Transport("tcp reset".into()).is_retryable());
        assert!(ChatError::StreamInterrupted("eof".into()).is_retryable());
    }

    #[test]
    fn non_retryable_classification() {
        assert!(!ChatError::Upstream { status: 400, body: "bad".into() }.is_retryable());
        assert!(!ChatError::Upstream { status: 404, body: "gone".into() }.is_retryable());
        assert!(!ChatError::InvalidArgument("bad".into()).is_retryable());
        assert!(!ChatError::Configuration("missing key".into()).is_retryable());
        assert!(!ChatError::Timeout(Duration::from_secs(8)).is_retryable());
    }

    #[test]
    fn caller_fault_classification() {
        assert!(ChatError::InvalidArgument("empty message".into()).is_caller_fault());
        assert!(ChatError::NotFound("no results".into()).is_caller_fault());
        assert!(!ChatError::Transport("dns".into()).is_caller_fault());
    }

    #[test]
    fn http_status_mapping() {
        assert_eq!(ChatError::InvalidArgument("x".into()).http_status(), 400);
        assert_eq!(ChatError::NotFound("x".into()).http_status(), 404);
        assert_eq!(ChatError::Configuration("x".into()).http_status(), 500);
        assert_eq!(ChatError::Upstream { status: 418, body: "x".into() }.http_status(), 502);
        assert_eq!(ChatError::Transport("x".into()).http_status(), 504);
        assert_eq!(ChatError::Timeout(Duration::from_secs(8)).http_status(), 504);
    }

    #[test]
    fn error_kind_strings() {
        assert_eq!(ChatError::NotFound("x".into()).error_kind(), "not_found");
        assert_eq!(
            ChatError::Upstream { status: 500, body: "x".into() }.error_kind(),
            "upstream"
        );
        assert_eq!(ChatError::StreamInterrupted("x".into()).error_kind(), "stream_interrupted");
    }
}
