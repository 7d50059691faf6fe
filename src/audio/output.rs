//! Audio encoding
//!
//! The pipeline hands its final post-processed mono PCM to an [`AudioEncoder`].
//! [`WavEncoder`] writes 16-bit PCM WAV; compressed containers plug in through
//! the same trait.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{Result, TtsError};

/// Descriptive tags passed to the encoder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
}

/// Writes final PCM to a container file
pub trait AudioEncoder: Send + Sync {
    /// Encoder name for logs
    fn name(&self) -> &str;

    /// Encode mono `pcm` at `sample_rate` to `path`
    fn encode(
        &self,
        pcm: &[f32],
        sample_rate: u32,
        path: &Path,
        bitrate_kbps: u32,
        metadata: &AudioMetadata,
    ) -> Result<()>;
}

/// Convert a float sample to 16-bit PCM, clamping out-of-range values
pub fn sample_to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// Incremental 16-bit mono WAV writer, shared by one-shot and streamed output
pub struct PcmWavWriter {
    writer: hound::WavWriter<BufWriter<File>>,
    path: PathBuf,
    samples: usize,
}

impl PcmWavWriter {
    pub fn create(path: &Path, sample_rate: u32) -> Result<Self> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(path, spec).map_err(|e| TtsError::Audio {
            message: format!("Failed to create WAV file {:?}: {}", path, e),
            path: Some(path.to_path_buf()),
        })?;
        Ok(Self {
            writer,
            path: path.to_path_buf(),
            samples: 0,
        })
    }

    /// Append samples
    pub fn write(&mut self, pcm: &[f32]) -> Result<()> {
        for &sample in pcm {
            self.writer.write_sample(sample_to_i16(sample))?;
        }
        self.samples += pcm.len();
        Ok(())
    }

    /// Samples written so far
    pub fn len(&self) -> usize {
        self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }

    /// Write the header lengths and close the file
    pub fn finalize(self) -> Result<()> {
        let path = self.path;
        self.writer.finalize().map_err(|e| TtsError::Audio {
            message: format!("Failed to finalize WAV file {:?}: {}", path, e),
            path: Some(path.clone()),
        })
    }
}

/// 16-bit PCM WAV encoder
#[derive(Debug, Clone, Copy, Default)]
pub struct WavEncoder;

impl AudioEncoder for WavEncoder {
    fn name(&self) -> &str {
        "wav"
    }

    fn encode(
        &self,
        pcm: &[f32],
        sample_rate: u32,
        path: &Path,
        bitrate_kbps: u32,
        metadata: &AudioMetadata,
    ) -> Result<()> {
        let mut writer = PcmWavWriter::create(path, sample_rate)?;
        writer.write(pcm)?;
        writer.finalize()?;

        debug!(
            "Wrote {} samples to {:?} (bitrate {} kbps not applicable to PCM, title {:?})",
            pcm.len(),
            path,
            bitrate_kbps,
            metadata.title
        );
        Ok(())
    }
}
