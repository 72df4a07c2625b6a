//! Audio recording for voxpaste. There can only be one active recording at a
//! time and storage/processing are not managed by this crate.
//!
//! ## Format notes
//!
//! Recordings are mono 16-bit PCM WAV at the device's native sample rate.
//! At 44.1kHz that is ~430KiB every 5 seconds, well under the 25MiB upload
//! limit for any reasonable dictation.

mod recorder;
mod recording;

pub use recorder::{EventCallback, MIN_DB, Recorder, RecorderError, RecordingHandle, db_fs};
pub use recording::Recording;
