//! Error types for claimcheck.
//!
//! Epistemic taxonomy:
//! - B_i falsified: Expected failures (missing credential, malformed model output)
//! - I^B materialized: Infrastructure failures (network, timeout, provider misconfiguration)
//! - K_i violated: Internal invariant violations (bugs)

use thiserror::Error;

/// Top-level error type for claimcheck.
#[derive(Debug, Error)]
pub enum ClaimCheckError {
    // ═══════════════════════════════════════════════════════════════════
    // B_i FALSIFIED: Belief proven wrong (expected failures)
    // ═══════════════════════════════════════════════════════════════════

    #[error("Configuration error: {0}")]
    Config(#[from] super::ConfigError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing credential for {service}: set {env_var} or configure it explicitly")]
    MissingCredential { service: String, env_var: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Model output violated the expected schema: {0}")]
    SchemaViolation(String),

    // ═══════════════════════════════════════════════════════════════════
    // I^B MATERIALIZED: Bounded ignorance became known-bad
    // ═══════════════════════════════════════════════════════════════════

    #[error("LLM API error: {0}")]
    LlmApi(#[from] LlmApiError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: f64 },

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // ═══════════════════════════════════════════════════════════════════
    // K_i VIOLATED (Invariant broken (bug, should not happen)
    // ═══════════════════════════════════════════════════════════════════

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Chat-completion API specific errors.
#[derive(Debug, Error)]
pub enum LlmApiError {
    #[error("Authentication failed: invalid API key")]
    AuthenticationFailed,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request failed after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },
}

/// Search provider errors.
///
/// Each failure mode is its own variant so callers never have to inspect
/// message text to tell a misconfigured proxy from a dead network.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Missing search credentials: {0}")]
    MissingCredentials(String),

    #[error("Search transport failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Search provider returned {content_type} instead of JSON (check proxy zone settings): {snippet}")]
    UnexpectedContent {
        content_type: String,
        snippet: String,
    },

    #[error("Search provider returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Search payload could not be decoded: {0}")]
    InvalidPayload(String),

    #[error("Concurrent search aggregation failed: {0}")]
    FanOut(String),
}

impl ClaimCheckError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether this error means a required credential was never configured.
    pub fn is_missing_credential(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential { .. } | Self::Search(SearchError::MissingCredentials(_))
        )
    }

    /// Check if this error is retryable at the transport level.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_)
                | Self::RateLimited { .. }
                | Self::Network(_)
                | Self::Search(SearchError::Transport(_))
        )
    }
}

/// Result type alias for claimcheck.
pub type Result<T> = std::result::Result<T, ClaimCheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_detection() {
        let err = ClaimCheckError::MissingCredential {
            service: "llm".to_string(),
            env_var: "OPENAI_API_KEY".to_string(),
        };
        assert!(err.is_missing_credential());
        assert!(!err.is_retryable());

        let err = ClaimCheckError::SchemaViolation("bad".to_string());
        assert!(!err.is_missing_credential());
    }

    #[test]
    fn test_search_error_messages_are_distinct() {
        let html = SearchError::UnexpectedContent {
            content_type: "text/html".to_string(),
            snippet: "<html>".to_string(),
        };
        let status = SearchError::HttpStatus {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert!(html.to_string().contains("text/html"));
        assert!(status.to_string().contains("502"));

        let wrapped: ClaimCheckError = status.into();
        assert!(matches!(
            wrapped,
            ClaimCheckError::Search(SearchError::HttpStatus { status: 502, .. })
        ));
    }
}
