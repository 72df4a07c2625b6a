//! Core types and configuration for voxpaste.
//!
//! This crate provides platform-agnostic types that can be used across
//! all voxpaste sub-crates.

mod config;
mod event;
mod key;
mod state;

pub use config::{Config, ConfigManager, DEFAULT_HOTKEY, DEFAULT_MODEL};
pub use event::AudioEvent;
pub use key::{API_KEY_ENV, API_KEY_FILE, KeyError, resolve_api_key};
pub use state::{HotkeyAction, MicState};

/// Application name
pub const APP_NAME: &str = "voxpaste";

/// Pretty application name for display
pub const APP_NAME_PRETTY: &str = "Voxpaste";

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";
