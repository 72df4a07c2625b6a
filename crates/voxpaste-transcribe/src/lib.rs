//! Transcription backend library for voxpaste.
//!
//! This crate provides a trait-based abstraction for audio transcription,
//! with an implementation for OpenAI's transcription API.

mod openai;

use async_trait::async_trait;
pub use bytes::Bytes;
pub use openai::{DEFAULT_ENDPOINT, OpenAIClient, OpenAIConfig, parse_response};
use thiserror::Error;

/// Errors that can occur during transcription.
#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("API returned {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("No API key configured")]
    NoApiKey,

    #[error("API key unavailable: {0}")]
    ApiKey(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Transcription failed or the response format is not as expected: {0}")]
    UnexpectedResponse(String),
}

impl TranscribeError {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            TranscribeError::Network(_) => true,
            TranscribeError::ApiError { status, .. } => *status == 429 || *status >= 500,
            TranscribeError::NoApiKey
            | TranscribeError::ApiKey(_)
            | TranscribeError::UnexpectedResponse(_) => false,
        }
    }
}

/// Result type for transcription operations.
pub type Result<T> = std::result::Result<T, TranscribeError>;

/// Trait for transcription backends.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe audio to text.
    ///
    /// # Arguments
    /// * `audio` - WAV audio as reference-counted bytes. Cloning Bytes is
    ///   O(1), which keeps retries cheap.
    /// * `language` - Optional language hint (ISO 639-1 code, e.g., "en")
    async fn transcribe(&self, audio: Bytes, language: Option<&str>) -> Result<String>;

    /// Returns the name of this transcriber for logging/debugging.
    fn name(&self) -> &str;
}
