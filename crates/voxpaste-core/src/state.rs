//! Microphone/recording state types.

/// The current state of the microphone/recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MicState {
    /// Waiting for audio input to begin (hotkey pressed, mic warming up)
    Activating,
    /// Actively recording audio
    Active,
    /// Idle, not recording
    #[default]
    Idle,
    /// Processing recorded audio (transcribing)
    Processing,
}

/// What a hotkey press should do given the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    StartRecording,
    StopRecording,
    Ignore,
}

impl MicState {
    /// Map a hotkey press onto the idle → recording → transcribing cycle.
    /// Presses while a transcription is in flight are ignored.
    pub fn on_hotkey(self) -> HotkeyAction {
        match self {
            MicState::Idle => HotkeyAction::StartRecording,
            MicState::Activating | MicState::Active => HotkeyAction::StopRecording,
            MicState::Processing => HotkeyAction::Ignore,
        }
    }

    /// Whether a recording stream is currently open.
    pub fn is_recording(self) -> bool {
        matches!(self, MicState::Activating | MicState::Active)
    }
}
