//! Audio processing modules
//!
//! - Post-processing DSP chain (trim through stereo imaging)
//! - Quality analysis (peak, RMS, SNR, clipping)
//! - Encoding of the final PCM

pub mod dsp;
mod output;
mod quality;

pub use dsp::{DspChain, DspStage};
pub use output::{sample_to_i16, AudioEncoder, AudioMetadata, PcmWavWriter, WavEncoder};
pub use quality::QualityReport;
