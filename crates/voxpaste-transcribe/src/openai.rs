//! OpenAI transcription API backend.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use crate::{Result, TranscribeError, Transcriber};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/audio/transcriptions";
const DEFAULT_MODEL: &str = "whisper-1";
const BODY_PREVIEW_CHARS: usize = 512;

/// Configuration for the OpenAI transcription client.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// OpenAI API key
    pub api_key: String,

    /// Model to use (defaults to whisper-1)
    pub model: Option<String>,

    /// Override for the transcription endpoint
    pub endpoint: Option<String>,
}

impl OpenAIConfig {
    /// Create a new OpenAI config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: None,
            endpoint: None,
        }
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Point the client at a different endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Get the model name, using default if not set.
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }
}

/// OpenAI transcription API client.
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    client: reqwest::Client,
    config: OpenAIConfig,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl OpenAIClient {
    /// Create a new OpenAI client with the given configuration.
    pub fn new(config: OpenAIConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Create a client reusing an existing connection pool.
    pub fn with_client(client: reqwest::Client, config: OpenAIConfig) -> Self {
        if config.api_key.trim().is_empty() {
            debug!("OpenAI client created without an API key");
        }
        Self { client, config }
    }

    /// Create a client from just an API key with default settings.
    pub fn from_api_key(api_key: impl Into<String>) -> Self {
        Self::new(OpenAIConfig::new(api_key))
    }

    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    fn form(&self, audio: Bytes, language: Option<&str>) -> Result<Form> {
        let file = Part::bytes(audio.to_vec())
            .file_name("recording.wav")
            .mime_str("audio/wav")?;

        let mut form = Form::new()
            .part("file", file)
            .text("model", self.config.model().to_owned());

        if let Some(lang) = language {
            form = form.text("language", lang.to_owned());
        }
        Ok(form)
    }
}

/// Interpret a transcription API response. Non-success statuses become
/// `ApiError`; a success body without a `text` field is `UnexpectedResponse`.
pub fn parse_response(status: u16, body: &str) -> Result<String> {
    if !(200..300).contains(&status) {
        return Err(TranscribeError::ApiError {
            status,
            body: preview(body),
        });
    }

    serde_json::from_str::<TranscriptionResponse>(body)
        .map(|response| response.text)
        .map_err(|e| TranscribeError::UnexpectedResponse(format!("{e}: {}", preview(body))))
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

#[async_trait]
impl Transcriber for OpenAIClient {
    async fn transcribe(&self, audio: Bytes, language: Option<&str>) -> Result<String> {
        if self.config.api_key.trim().is_empty() {
            return Err(TranscribeError::NoApiKey);
        }

        debug!(
            model = self.config.model(),
            endpoint = self.config.endpoint(),
            audio_bytes = audio.len(),
            language = ?language,
            "Sending transcription request to OpenAI"
        );

        let response = self
            .client
            .post(self.config.endpoint())
            .bearer_auth(&self.config.api_key)
            .multipart(self.form(audio, language)?)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        parse_response(status, &body)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success() {
        let text = parse_response(200, r#"{"text":"Hello there."}"#).unwrap();
        assert_eq!(text, "Hello there.");
    }

    #[test]
    fn test_parse_ignores_extra_fields() {
        let body = r#"{"text":"hi","usage":{"type":"duration","seconds":2}}"#;
        assert_eq!(parse_response(200, body).unwrap(), "hi");
    }

    #[test]
    fn test_parse_missing_text_is_unexpected() {
        let err = parse_response(200, r#"{"transcript":"hi"}"#).unwrap_err();
        assert!(matches!(err, TranscribeError::UnexpectedResponse(_)));
    }

    #[test]
    fn test_parse_error_status_keeps_body() {
        let body = r#"{"error":{"message":"Incorrect API key provided"}}"#;
        match parse_response(401, body).unwrap_err() {
            TranscribeError::ApiError { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("Incorrect API key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_error_body_is_truncated() {
        let body = "x".repeat(BODY_PREVIEW_CHARS * 2);
        match parse_response(500, &body).unwrap_err() {
            TranscribeError::ApiError { body, .. } => assert_eq!(body.len(), BODY_PREVIEW_CHARS),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = OpenAIConfig::new("sk-test");
        assert_eq!(config.model(), "whisper-1");
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);

        let config = config
            .with_model("gpt-4o-transcribe")
            .with_endpoint("http://localhost:8080/v1/audio/transcriptions");
        assert_eq!(config.model(), "gpt-4o-transcribe");
        assert_eq!(
            config.endpoint(),
            "http://localhost:8080/v1/audio/transcriptions"
        );
    }

    #[tokio::test]
    async fn test_empty_key_fails_without_request() {
        let client = OpenAIClient::from_api_key("  ");
        let err = client
            .transcribe(Bytes::from_static(b"RIFF"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, TranscribeError::NoApiKey));
        assert_eq!(client.name(), "openai");
    }
}
