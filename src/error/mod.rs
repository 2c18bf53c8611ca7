//! Error types for Cadence.
//!
//! [`CadenceError`] covers everything that can abort a turn or a session call.
//! Capability failures are a separate type ([`crate::capability::HandlerError`])
//! because they are folded into the transcript instead of propagating.

use thiserror::Error;

/// Primary error type for all Cadence operations.
#[derive(Error, Debug)]
pub enum CadenceError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Dialogue loop exceeded {max_loops} iterations without a final answer")]
    LoopExceeded { max_loops: usize },

    #[error("Rate limit exceeded for '{subject}'")]
    RateLimited { subject: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Reasoner rate limited: retry after {retry_after_ms:?}ms")]
    ReasonerRateLimited { retry_after_ms: Option<u64> },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Invalid reasoner response: {0}")]
    InvalidResponse(String),
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    RateLimit,
    Network,
    Timeout,
    Server,
    Api,
    Configuration,
    Serialization,
    Storage,
    Loop,
    Unknown,
}

impl CadenceError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::RateLimited { .. } | Self::ReasonerRateLimited { .. } => ErrorCategory::RateLimit,
            Self::Network(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Io(_) | Self::Backend(_) => ErrorCategory::Storage,
            Self::LoopExceeded { .. } => ErrorCategory::Loop,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::InvalidResponse(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether the caller may reasonably retry the whole operation.
    ///
    /// Nothing inside Cadence retries; this is a hint for the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit
                | ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::Server
        )
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, CadenceError>;
