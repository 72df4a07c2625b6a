//! Configuration management for voxpaste.
//!
//! This module provides core configuration that doesn't depend on
//! platform-specific UI libraries.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use dirs::{cache_dir, config_dir};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::APP_NAME;

/// Default hotkey accelerator, in global-hotkey's string format.
pub const DEFAULT_HOTKEY: &str = "ctrl+KeyR";

/// Transcription model used when none is configured.
pub const DEFAULT_MODEL: &str = "whisper-1";

const RECORDING_FILE: &str = "recording.wav";

/// Core configuration structure for the application.
///
/// Platform-specific settings like hotkeys are stored as plain strings and
/// parsed by the main application.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// OpenAI API key. Takes precedence over the environment and key file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_key: Option<String>,

    /// Explicit path to a file holding the API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_file: Option<PathBuf>,

    /// Preferred language for transcription (ISO 639-1 code)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Model to use for transcriptions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Hotkey configuration, e.g. "ctrl+KeyR" or "super+shift+Semicolon"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotkey: Option<String>,

    /// Restore the clipboard contents after pasting. This only takes effect
    /// when auto-paste is on.
    #[serde(default, skip_serializing_if = "is_false")]
    pub restore_clipboard: bool,

    /// Paste contents automatically after transcribing
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub auto_paste: bool,

    /// Discard recordings under this duration (in seconds)
    #[serde(
        default = "default_discard_duration",
        skip_serializing_if = "is_default_discard_duration"
    )]
    pub discard_duration: f32,

    /// Number of retries for failed transcription requests
    #[serde(
        default = "default_retries",
        skip_serializing_if = "is_default_retries"
    )]
    pub retries: u8,

    /// Keep the last recording on disk
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub save_recording: bool,

    /// Where the last recording is written, defaults to the cache directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

fn is_false(v: &bool) -> bool {
    !*v
}

fn default_discard_duration() -> f32 {
    0.5
}

fn is_default_discard_duration(v: &f32) -> bool {
    (*v - default_discard_duration()).abs() < f32::EPSILON
}

fn default_retries() -> u8 {
    3
}

fn is_default_retries(v: &u8) -> bool {
    *v == default_retries()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_key: None,
            api_key_file: None,
            language: None,
            model: None,
            hotkey: None,
            restore_clipboard: false,
            auto_paste: true,
            discard_duration: default_discard_duration(),
            retries: default_retries(),
            save_recording: true,
            recording_path: None,
        }
    }
}

impl Config {
    /// Get the OpenAI API key
    pub fn key_openai(&self) -> Option<&str> {
        self.openai_key.as_deref()
    }

    /// Sets a new OpenAI API key.
    pub fn set_key_openai(&mut self, key: &str) {
        self.openai_key = Some(key.to_owned());
    }

    /// Get the explicit key file path, if set
    pub fn api_key_file(&self) -> Option<&Path> {
        self.api_key_file.as_deref()
    }

    /// Get the preferred language
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Get the model name, falling back to the default model
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// Get the hotkey string, falling back to the default
    pub fn hotkey(&self) -> &str {
        self.hotkey.as_deref().unwrap_or(DEFAULT_HOTKEY)
    }

    pub fn restore_clipboard(&self) -> bool {
        self.restore_clipboard
    }

    pub fn auto_paste(&self) -> bool {
        self.auto_paste
    }

    pub fn retries(&self) -> u8 {
        self.retries
    }

    pub fn save_recording(&self) -> bool {
        self.save_recording
    }

    /// Get the discard duration as a Duration. Negative or non-finite values
    /// disable discarding.
    pub fn discard_duration(&self) -> Duration {
        Duration::try_from_secs_f32(self.discard_duration).unwrap_or(Duration::ZERO)
    }

    /// Path the last recording is written to, if one can be determined.
    pub fn recording_path(&self) -> Option<PathBuf> {
        self.recording_path
            .clone()
            .or_else(|| cache_dir().map(|dir| dir.join(APP_NAME).join(RECORDING_FILE)))
    }
}

/// Manages loading and saving configuration files.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Creates a new ConfigManager with the default configuration directory.
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Creates a new ConfigManager with a specified configuration directory.
    pub fn with_config_dir<P: AsRef<Path>>(dir: P) -> Self {
        let config_path = dir.as_ref().join(format!("{}.toml", APP_NAME));
        Self { config_path }
    }

    /// Returns the default path to the configuration file.
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to retrieve configuration directory")?;
        Ok(config_dir.join(APP_NAME).join(format!("{}.toml", APP_NAME)))
    }

    /// Loads the configuration from the config file or returns default.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let config_content = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config file at {:?}", self.config_path))?;

        let config: Config = toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse config file at {:?}", self.config_path))?;

        if config.discard_duration.is_sign_negative() {
            warn!(
                discard_duration = config.discard_duration,
                "Negative discard duration, no recordings will be discarded"
            );
        }

        Ok(config)
    }

    /// Saves the configuration to the config file, only writing non-default
    /// fields.
    pub fn save(&self, config: &Config) -> Result<()> {
        let config_dir = self.config_dir()?;

        fs::create_dir_all(config_dir)
            .with_context(|| format!("Failed to create config directory at {:?}", config_dir))?;

        let serialized =
            toml::to_string_pretty(&config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, serialized)
            .with_context(|| format!("Failed to write config file at {:?}", self.config_path))?;

        Ok(())
    }

    /// Reloads the configuration and returns `true` if there are changes.
    pub fn reload(&self, current_config: &mut Config) -> Result<bool> {
        let old_config = current_config.clone();
        *current_config = self.load()?;
        Ok(*current_config != old_config)
    }

    /// Returns the path to the configuration file.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Returns the directory holding the configuration file.
    pub fn config_dir(&self) -> Result<&Path> {
        self.config_path
            .parent()
            .with_context(|| format!("Failed to get parent directory of {:?}", self.config_path))
    }
}
