use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use voxpaste_transcribe::{Bytes, TranscribeError, Transcriber};

use crate::event::{EventSink, VoxEvent};
use crate::{Config, MicState, Recording};

const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Processing pipeline for audio data. This accepts finished recordings and
/// carries them through transcription, handing the text back to the event
/// loop for insertion.
pub struct AudioPipeline {
    runtime: Runtime,
    transcriber: Arc<dyn Transcriber>,
    config: Arc<RwLock<Config>>,
    transcription_handles: mpsc::UnboundedSender<TranscriptionTask>,
}

type TranscriptionTask = tokio::task::JoinHandle<TranscriptionResult>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitResult {
    Sent,
    Discarded,
}

impl AudioPipeline {
    /// Create a new pipeline instance.
    pub fn new(
        config: Arc<RwLock<Config>>,
        transcriber: Arc<dyn Transcriber>,
        event_sink: impl EventSink,
    ) -> anyhow::Result<Self> {
        // A single worker, transcriptions are handled one at a time.
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;

        let transcription_handles = start_results_collector(&runtime, event_sink);

        Ok(Self {
            runtime,
            transcriber,
            config,
            transcription_handles,
        })
    }

    /// Submits a recording to the processing pipeline. This is non-blocking
    /// and all recordings will be processed in order.
    pub fn submit(&self, recording: Recording) -> anyhow::Result<SubmitResult> {
        info!(
            samples = recording.samples(),
            bytes = recording.data().len(),
            bytes_mb = recording.data().len() as f64 / (1024.0 * 1024.0),
            length_seconds = recording.duration().as_secs_f64(),
            "audio submitted"
        );

        let discard_duration = self.config.read().discard_duration();
        if recording.duration() < discard_duration {
            info!(discard_duration = ?discard_duration, "discarding recording");
            return Ok(SubmitResult::Discarded);
        }

        self.save_recording(&recording);

        let transcriber = self.transcriber.clone();
        let config = self.config.clone();

        let handle = self.runtime.spawn(transcribe(transcriber, config, recording));

        self.transcription_handles.send(handle)?;
        Ok(SubmitResult::Sent)
    }

    fn save_recording(&self, recording: &Recording) {
        let config = self.config.read();
        if !config.save_recording() {
            return;
        }
        let Some(path) = config.recording_path() else {
            warn!("No location available to save the recording");
            return;
        };
        match recording.save(&path) {
            Ok(()) => info!(path = ?path, "recording saved"),
            Err(e) => warn!("Failed to save recording to {:?}: {}", path, e),
        }
    }
}

/// Helper to call the transcription model and collect some basic stats.
async fn transcribe(
    transcriber: Arc<dyn Transcriber>,
    config: Arc<RwLock<Config>>,
    recording: Recording,
) -> TranscriptionResult {
    let audio = Bytes::from(recording.into_data());
    let bytes = audio.len();
    let (retries, language) = {
        let config = config.read();
        (config.retries(), config.language().map(str::to_owned))
    };
    let mut remaining = retries;

    let mut before = Instant::now();
    let mut result = transcriber
        .transcribe(audio.clone(), language.as_deref())
        .await;
    while let Err(e) = &result {
        if !e.is_retryable() || remaining == 0 {
            break;
        }
        warn!("Retrying transcription, previous error: {}", e);
        tokio::time::sleep(RETRY_DELAY).await;
        remaining -= 1;
        before = Instant::now();
        result = transcriber
            .transcribe(audio.clone(), language.as_deref())
            .await;
    }

    let text = match result {
        Ok(text) => text,
        Err(error) => {
            return TranscriptionResult::Failed {
                attempts: u16::from(retries - remaining) + 1,
                error,
            };
        }
    };
    let duration = before.elapsed();

    let mb_per_second = bytes as f64 / (1024.0 * 1024.0) / duration.as_secs_f64();
    info!(
        transcriber = transcriber.name(),
        duration = ?duration,
        mb_per_second = mb_per_second,
        "transcription completed"
    );

    TranscriptionResult::Success(text)
}

#[derive(Debug)]
enum TranscriptionResult {
    Success(String),
    Failed {
        attempts: u16,
        error: TranscribeError,
    },
}

fn start_results_collector(
    runtime: &Runtime,
    event_sink: impl EventSink,
) -> mpsc::UnboundedSender<TranscriptionTask> {
    let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<TranscriptionTask>();

    runtime.spawn(async move {
        while let Some(task) = task_receiver.recv().await {
            match task.await {
                Ok(TranscriptionResult::Success(text)) if !text.trim().is_empty() => {
                    info!("Transcription: {}", text);
                    event_sink.emit(VoxEvent::TranscriptReady(text));
                }
                Ok(TranscriptionResult::Success(_)) => {
                    warn!("Transcription returned no text");
                    event_sink.emit(VoxEvent::StateChanged(MicState::Idle));
                    event_sink.emit(VoxEvent::TranscriptionFailed(
                        "no speech recognized".to_owned(),
                    ));
                }
                Ok(TranscriptionResult::Failed { attempts, error }) => {
                    error!("Transcription failed after {} attempt(s): {}", attempts, error);
                    event_sink.emit(VoxEvent::StateChanged(MicState::Idle));
                    event_sink.emit(VoxEvent::TranscriptionFailed(error.to_string()));
                }
                Err(e) => {
                    error!("Error joining transcription task: {:?}", e);
                    event_sink.emit(VoxEvent::StateChanged(MicState::Idle));
                }
            }
        }

        info!("Results collector stopped");
    });

    task_sender
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc as std_mpsc;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;

    impl EventSink for std_mpsc::Sender<VoxEvent> {
        fn emit(&self, event: VoxEvent) {
            self.send(event).ok();
        }
    }

    /// Replays canned results and records what it was asked.
    struct ScriptedTranscriber {
        results: Mutex<VecDeque<voxpaste_transcribe::Result<String>>>,
        calls: AtomicUsize,
        languages: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedTranscriber {
        fn new(results: Vec<voxpaste_transcribe::Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(results.into()),
                calls: AtomicUsize::new(0),
                languages: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transcriber for ScriptedTranscriber {
        async fn transcribe(
            &self,
            _audio: Bytes,
            language: Option<&str>,
        ) -> voxpaste_transcribe::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.languages.lock().push(language.map(str::to_owned));
            self.results
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(TranscribeError::UnexpectedResponse("script ended".into())))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn server_error() -> TranscribeError {
        TranscribeError::ApiError {
            status: 503,
            body: "busy".into(),
        }
    }

    fn test_config(temp: &tempfile::TempDir) -> Config {
        Config {
            recording_path: Some(temp.path().join("recording.wav")),
            ..Default::default()
        }
    }

    fn one_second() -> Recording {
        Recording::from_samples(&[0; 8_000], 8_000).unwrap()
    }

    fn recv(rx: &std_mpsc::Receiver<VoxEvent>) -> VoxEvent {
        rx.recv_timeout(Duration::from_secs(10)).unwrap()
    }

    #[test]
    fn test_short_recordings_are_discarded() {
        let temp = tempfile::tempdir().unwrap();
        let transcriber = ScriptedTranscriber::new(vec![]);
        let (tx, _rx) = std_mpsc::channel();
        let config = Arc::new(RwLock::new(test_config(&temp)));
        let pipeline = AudioPipeline::new(config, transcriber.clone(), tx).unwrap();

        let short = Recording::from_samples(&[0; 100], 8_000).unwrap();
        assert_eq!(pipeline.submit(short).unwrap(), SubmitResult::Discarded);
        assert_eq!(transcriber.calls.load(Ordering::SeqCst), 0);
        assert!(!temp.path().join("recording.wav").exists());
    }

    #[test]
    fn test_transcript_is_delivered_and_recording_saved() {
        let temp = tempfile::tempdir().unwrap();
        let transcriber = ScriptedTranscriber::new(vec![Ok("hello world".into())]);
        let (tx, rx) = std_mpsc::channel();
        let config = Arc::new(RwLock::new(Config {
            language: Some("en".into()),
            ..test_config(&temp)
        }));
        let pipeline = AudioPipeline::new(config, transcriber.clone(), tx).unwrap();

        assert_eq!(pipeline.submit(one_second()).unwrap(), SubmitResult::Sent);
        assert_eq!(recv(&rx), VoxEvent::TranscriptReady("hello world".into()));
        assert!(temp.path().join("recording.wav").exists());
        assert_eq!(*transcriber.languages.lock(), vec![Some("en".to_owned())]);
    }

    #[test]
    fn test_retryable_errors_are_retried() {
        let temp = tempfile::tempdir().unwrap();
        let transcriber =
            ScriptedTranscriber::new(vec![Err(server_error()), Ok("second try".into())]);
        let (tx, rx) = std_mpsc::channel();
        let config = Arc::new(RwLock::new(test_config(&temp)));
        let pipeline = AudioPipeline::new(config, transcriber.clone(), tx).unwrap();

        pipeline.submit(one_second()).unwrap();
        assert_eq!(recv(&rx), VoxEvent::TranscriptReady("second try".into()));
        assert_eq!(transcriber.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failure_returns_to_idle() {
        let temp = tempfile::tempdir().unwrap();
        let transcriber = ScriptedTranscriber::new(vec![Err(server_error()), Err(server_error())]);
        let (tx, rx) = std_mpsc::channel();
        let config = Arc::new(RwLock::new(Config {
            retries: 1,
            save_recording: false,
            ..test_config(&temp)
        }));
        let pipeline = AudioPipeline::new(config, transcriber.clone(), tx).unwrap();

        pipeline.submit(one_second()).unwrap();
        assert_eq!(recv(&rx), VoxEvent::StateChanged(MicState::Idle));
        assert!(matches!(recv(&rx), VoxEvent::TranscriptionFailed(_)));
        assert_eq!(transcriber.calls.load(Ordering::SeqCst), 2);
        assert!(!temp.path().join("recording.wav").exists());
    }

    #[test]
    fn test_unexpected_response_is_not_retried() {
        let temp = tempfile::tempdir().unwrap();
        let transcriber = ScriptedTranscriber::new(vec![Err(
            TranscribeError::UnexpectedResponse("{}".into()),
        )]);
        let (tx, rx) = std_mpsc::channel();
        let config = Arc::new(RwLock::new(test_config(&temp)));
        let pipeline = AudioPipeline::new(config, transcriber.clone(), tx).unwrap();

        pipeline.submit(one_second()).unwrap();
        assert_eq!(recv(&rx), VoxEvent::StateChanged(MicState::Idle));
        match recv(&rx) {
            VoxEvent::TranscriptionFailed(message) => {
                assert!(message.contains("not as expected"), "got {message}")
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(transcriber.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_blank_transcript_is_not_inserted() {
        let temp = tempfile::tempdir().unwrap();
        let transcriber = ScriptedTranscriber::new(vec![Ok("  \n".into())]);
        let (tx, rx) = std_mpsc::channel();
        let config = Arc::new(RwLock::new(test_config(&temp)));
        let pipeline = AudioPipeline::new(config, transcriber, tx).unwrap();

        pipeline.submit(one_second()).unwrap();
        assert_eq!(recv(&rx), VoxEvent::StateChanged(MicState::Idle));
        assert!(matches!(recv(&rx), VoxEvent::TranscriptionFailed(_)));
    }

    /// Answers with the size of the audio it was given, after a delay that
    /// shrinks with size so later submissions finish first.
    struct SizeTranscriber;

    #[async_trait]
    impl Transcriber for SizeTranscriber {
        async fn transcribe(
            &self,
            audio: Bytes,
            _language: Option<&str>,
        ) -> voxpaste_transcribe::Result<String> {
            let delay = if audio.len() > 20_000 { 200 } else { 0 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(audio.len().to_string())
        }

        fn name(&self) -> &str {
            "size"
        }
    }

    #[test]
    fn test_results_arrive_in_submission_order() {
        let temp = tempfile::tempdir().unwrap();
        let (tx, rx) = std_mpsc::channel();
        let config = Arc::new(RwLock::new(test_config(&temp)));
        let pipeline = AudioPipeline::new(config, Arc::new(SizeTranscriber), tx).unwrap();

        let long = Recording::from_samples(&[0; 16_000], 8_000).unwrap();
        let short = one_second();
        let (long_len, short_len) = (long.data().len(), short.data().len());

        pipeline.submit(long).unwrap();
        pipeline.submit(short).unwrap();
        assert_eq!(recv(&rx), VoxEvent::TranscriptReady(long_len.to_string()));
        assert_eq!(recv(&rx), VoxEvent::TranscriptReady(short_len.to_string()));
    }
}
