use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Host, Sample, SizedSample};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{error, info};
use voxpaste_core::{AudioEvent, MicState};

use crate::Recording;

#[derive(Debug, Error)]
pub enum RecorderError {
    /// No recording device available
    #[error("no input device available")]
    NoInputDevice,
    /// Could not query the device's default input config
    #[error(transparent)]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),
    /// Sample format not supported
    #[error("sample format not supported: {0}")]
    SampleFormatNotSupported(String),
    /// Build stream error
    #[error(transparent)]
    BuildStream(#[from] cpal::BuildStreamError),
    /// Stream refused to start
    #[error(transparent)]
    PlayStream(#[from] cpal::PlayStreamError),
    /// WAV encoding failed
    #[error(transparent)]
    Wav(#[from] hound::Error),
    /// Writing the recording to disk failed
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

type Result<T> = std::result::Result<T, RecorderError>;
type SampleBuffer = Arc<Mutex<Vec<i16>>>;

/// Callback invoked from the audio thread with state updates.
pub type EventCallback = Box<dyn Fn(AudioEvent) + Send + 'static>;

pub struct Recorder {
    host: Host,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-stream state tracked on the audio thread.
struct CaptureState {
    channels: usize,
    mic_active: bool,
    on_event: EventCallback,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// Start recording from the default input device. `on_event` is called
    /// once with `MicState::Active` when the first non-silent audio arrives.
    pub fn start_recording(&self, on_event: EventCallback) -> Result<RecordingHandle> {
        let device = self
            .host
            .default_input_device()
            .ok_or(RecorderError::NoInputDevice)?;
        let config = device.default_input_config()?;

        info!(
            device_name = %device.name().unwrap_or_else(|_| "unknown".to_owned()),
            config = ?config,
            "Recording from device"
        );

        let sample_rate = config.sample_rate().0;
        let sample_format = config.sample_format();
        let stream_config: cpal::StreamConfig = config.into();

        let buffer: SampleBuffer = Arc::new(Mutex::new(Vec::with_capacity(
            sample_rate as usize * 10,
        )));
        let state = CaptureState {
            channels: usize::from(stream_config.channels.max(1)),
            mic_active: false,
            on_event,
        };

        let stream = match sample_format {
            cpal::SampleFormat::I8 => build_stream::<i8>(&device, &stream_config, state, &buffer)?,
            cpal::SampleFormat::I16 => {
                build_stream::<i16>(&device, &stream_config, state, &buffer)?
            }
            cpal::SampleFormat::I32 => {
                build_stream::<i32>(&device, &stream_config, state, &buffer)?
            }
            cpal::SampleFormat::U16 => {
                build_stream::<u16>(&device, &stream_config, state, &buffer)?
            }
            cpal::SampleFormat::F32 => {
                build_stream::<f32>(&device, &stream_config, state, &buffer)?
            }
            cpal::SampleFormat::F64 => {
                build_stream::<f64>(&device, &stream_config, state, &buffer)?
            }
            sample_format => {
                return Err(RecorderError::SampleFormatNotSupported(format!(
                    "{:?}",
                    sample_format
                )));
            }
        };

        stream.play()?;

        Ok(RecordingHandle {
            stream,
            buffer: Some(buffer),
            sample_rate,
        })
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut state: CaptureState,
    buffer: &SampleBuffer,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let buffer = buffer.clone();
    let err_fn = move |err| {
        error!("an error occurred on stream: {}", err);
    };

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| write_data(&mut state, data, &buffer),
        err_fn,
        None,
    )?;
    Ok(stream)
}

fn write_data<T>(state: &mut CaptureState, data: &[T], buffer: &SampleBuffer)
where
    T: Sample,
    f32: FromSample<T>,
{
    let mono = downmix(data, state.channels);

    if !state.mic_active && db_fs(&mono) > MIN_DB {
        state.mic_active = true;
        (state.on_event)(AudioEvent::StateChanged(MicState::Active));
    }

    buffer.lock().extend(mono.into_iter().map(to_pcm16));
}

/// Average interleaved frames down to a single channel of f32 samples.
fn downmix<T>(data: &[T], channels: usize) -> Vec<f32>
where
    T: Sample,
    f32: FromSample<T>,
{
    let channels = channels.max(1);
    data.chunks(channels)
        .map(|frame| {
            let sum: f32 = frame.iter().map(|&s| f32::from_sample(s)).sum();
            sum / frame.len() as f32
        })
        .collect()
}

fn to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}

/// Handle to the active recording. When dropped or finished, the recording
/// will end. You must call `finish` to receive the data.
pub struct RecordingHandle {
    stream: cpal::Stream,
    // Presence of this buffer indicates the recording has not been finished.
    buffer: Option<SampleBuffer>,
    sample_rate: u32,
}

impl RecordingHandle {
    /// Stop the stream and encode what was captured. Returns `None` if the
    /// recording was already finished.
    pub fn finish(&mut self) -> Result<Option<Recording>> {
        let Some(buffer) = self.buffer.take() else {
            return Ok(None);
        };
        info!("Ending recording.");
        // Pause rather than drop since we only hold &mut self.
        self.stream.pause().ok();

        let samples = std::mem::take(&mut *buffer.lock());
        Recording::from_samples(&samples, self.sample_rate).map(Some)
    }
}

impl Drop for RecordingHandle {
    fn drop(&mut self) {
        if self.buffer.is_some() {
            if let Err(e) = self.finish() {
                error!("failed to finalize recording: {}", e);
            }
        }
    }
}

pub const MIN_DB: f32 = -96.0;

/// Peak level of a slice of f32 samples in dBFS.
pub fn db_fs(data: &[f32]) -> f32 {
    let max_sample = data
        .iter()
        .fold(f32::EQUILIBRIUM, |max, &sample| sample.abs().max(max));

    (20.0 * max_sample.log10()).clamp(MIN_DB, 0.0)
}
