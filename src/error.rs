//! Error taxonomy shared by the extractor, the pipeline and the HTTP layer.
//!
//! Every failure a caller can observe maps to one [`SummarizeError`] variant
//! with a stable [`kind`](SummarizeError::kind) string and an HTTP status.
//! Client-side problems (bad input, unreadable documents, unreachable pages,
//! empty content) are `400`; provider and internal failures are `500`.

use axum::http::StatusCode;

use crate::llm::LlmError;

/// Errors produced while turning a source into a summary.
#[derive(Debug, thiserror::Error)]
pub enum SummarizeError {
    /// The declared document format is not one we can parse.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    /// The parser could not read the document bytes.
    #[error("extraction failed: {0}")]
    Extraction(String),
    /// A web page could not be fetched.
    #[error("fetch failed: {0}")]
    Fetch(String),
    /// Extraction succeeded but produced no usable text.
    #[error("no content found: {0}")]
    NoContent(String),
    /// The provider kept rate limiting us until the retry budget ran out.
    #[error("LLM provider rate limited the request: {0}")]
    RateLimited(String),
    /// The provider kept timing out until the retry budget ran out.
    #[error("LLM provider timed out: {0}")]
    Timeout(String),
    #[error("LLM provider error: {0}")]
    Provider(String),
    /// Malformed request parameters (non-positive word count, bad URL, missing field).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl SummarizeError {
    /// Stable machine-readable error code.
    pub fn kind(&self) -> &'static str {
        match self {
            SummarizeError::UnsupportedFormat(_) => "unsupported_format",
            SummarizeError::Extraction(_) => "extraction_error",
            SummarizeError::Fetch(_) => "fetch_error",
            SummarizeError::NoContent(_) => "no_content",
            SummarizeError::RateLimited(_) => "rate_limited",
            SummarizeError::Timeout(_) => "timeout",
            SummarizeError::Provider(_) => "provider_error",
            SummarizeError::InvalidRequest(_) => "invalid_request",
            SummarizeError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            SummarizeError::UnsupportedFormat(_)
            | SummarizeError::Extraction(_)
            | SummarizeError::Fetch(_)
            | SummarizeError::NoContent(_)
            | SummarizeError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            SummarizeError::RateLimited(_)
            | SummarizeError::Timeout(_)
            | SummarizeError::Provider(_)
            | SummarizeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<LlmError> for SummarizeError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::RateLimited(msg) => SummarizeError::RateLimited(msg),
            LlmError::Timeout(msg) => SummarizeError::Timeout(msg),
            LlmError::Provider(msg) => SummarizeError::Provider(msg),
        }
    }
}
