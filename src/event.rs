//! Application events for the tao event loop.

use tao::event_loop::EventLoopProxy;

use crate::MicState;

/// Events for the tao event loop, extending the core AudioEvent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoxEvent {
    /// The microphone state has changed
    StateChanged(MicState),
    /// A transcription is ready to be inserted
    TranscriptReady(String),
    /// Transcription failed, the message is already logged
    TranscriptionFailed(String),
}

/// Anything that can deliver [`VoxEvent`]s back to the event loop.
pub trait EventSink: Send + 'static {
    fn emit(&self, event: VoxEvent);
}

impl EventSink for EventLoopProxy<VoxEvent> {
    fn emit(&self, event: VoxEvent) {
        // Only fails once the event loop has exited.
        self.send_event(event).ok();
    }
}
