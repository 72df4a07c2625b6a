//! Event types for audio recording.

use crate::MicState;

/// Events emitted by the audio recording system, independent of any UI
/// framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioEvent {
    /// The recording state has changed
    StateChanged(MicState),
}
