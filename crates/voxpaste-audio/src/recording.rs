use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::RecorderError;

/// A finished recording, encoded as a mono 16-bit WAV file in memory.
#[derive(Debug, Clone)]
pub struct Recording {
    data: Vec<u8>,
    samples: usize,
    sample_rate: u32,
}

impl Recording {
    /// Encode mono PCM samples into a WAV recording.
    pub fn from_samples(samples: &[i16], sample_rate: u32) -> Result<Self, RecorderError> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        // Finalize so the header carries the proper data length.
        writer.finalize()?;

        Ok(Self {
            data: cursor.into_inner(),
            samples: samples.len(),
            sample_rate,
        })
    }

    /// The encoded WAV bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Number of mono samples recorded.
    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples as f64 / f64::from(self.sample_rate))
    }

    /// Write the WAV file to `path`, replacing any previous recording and
    /// creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), RecorderError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &self.data)?;
        Ok(())
    }
}
