//! Transcriber that follows the live configuration.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use voxpaste_core::resolve_api_key;
use voxpaste_transcribe::{Bytes, OpenAIClient, OpenAIConfig, TranscribeError, Transcriber};

use crate::Config;

/// Resolves the API key and model from the shared config on every call, so
/// edits to the config or key file apply to the next recording.
pub struct ConfiguredTranscriber {
    client: reqwest::Client,
    config: Arc<RwLock<Config>>,
    config_dir: PathBuf,
}

impl ConfiguredTranscriber {
    pub fn new(config: Arc<RwLock<Config>>, config_dir: PathBuf) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            config_dir,
        }
    }

    fn openai(&self) -> Result<OpenAIClient, TranscribeError> {
        let config = self.config.read();
        let api_key = resolve_api_key(&config, &self.config_dir)
            .map_err(|e| TranscribeError::ApiKey(e.to_string()))?;
        let openai = OpenAIConfig::new(api_key).with_model(config.model());
        Ok(OpenAIClient::with_client(self.client.clone(), openai))
    }
}

#[async_trait]
impl Transcriber for ConfiguredTranscriber {
    async fn transcribe(
        &self,
        audio: Bytes,
        language: Option<&str>,
    ) -> voxpaste_transcribe::Result<String> {
        let client = self.openai()?;
        client.transcribe(audio, language).await
    }

    fn name(&self) -> &str {
        "openai"
    }
}
