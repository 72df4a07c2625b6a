// Re-export from sub-crates
pub use voxpaste_audio::{Recorder, RecorderError, Recording, RecordingHandle};
pub use voxpaste_core::{
    APP_NAME, APP_NAME_PRETTY, AudioEvent, Config, ConfigManager, DEFAULT_LOG_LEVEL,
    HotkeyAction, MicState,
};
pub use voxpaste_transcribe::{OpenAIClient, OpenAIConfig, TranscribeError, Transcriber};

// App-specific modules
pub mod event;
pub mod hotkey;
pub mod icon;
pub mod notify;
pub mod paste;
pub mod process;
pub mod transcriber;

// Version from this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
