//! Pipeline configuration types matching the `pipeline.yaml` structure
//!
//! Every field is defaulted, so an empty YAML document is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::error::{Result, TtsError};
use crate::subtitle::MIN_CHAPTER_SECS;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Default locale used when a request does not name one
    pub locale: String,

    /// Directory holding `<voice>.json` metadata and `<voice>.bin` embeddings
    pub voices_dir: PathBuf,

    /// Optional pronunciation dictionary (word -> phrase table)
    pub dictionary: Option<PathBuf>,

    /// Optional per-locale vocabulary file (YAML)
    pub vocabulary: Option<PathBuf>,

    /// Output bitrate handed to the encoder (kbps)
    pub bitrate: u32,

    /// Per-locale model registry
    pub models: Vec<LanguageModelConfig>,

    /// Inference adapter settings
    pub inference: InferenceSettings,

    /// Streaming delivery settings
    pub streaming: StreamingConfig,

    /// Post-processing chain settings
    pub dsp: DspConfig,

    /// Subtitle/chapter alignment settings
    pub alignment: AlignmentConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            locale: "en-US".to_string(),
            voices_dir: PathBuf::from("voices"),
            dictionary: None,
            vocabulary: None,
            bitrate: 320,
            models: default_models(),
            inference: InferenceSettings::default(),
            streaming: StreamingConfig::default(),
            dsp: DspConfig::default(),
            alignment: AlignmentConfig::default(),
        }
    }
}

fn default_models() -> Vec<LanguageModelConfig> {
    vec![
        LanguageModelConfig::new("en-US", "models/tts.onnx", "models/tokenizer_en.json"),
        LanguageModelConfig::new("es-ES", "models/tts_es.onnx", "models/tokenizer_es.json"),
        LanguageModelConfig::new("fr-FR", "models/tts_fr.onnx", "models/tokenizer_fr.json"),
    ]
}

impl PipelineConfig {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| TtsError::Config {
            message: format!("Failed to read config file: {}", e),
            path: Some(path.to_path_buf()),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| TtsError::Config {
            message: format!("Failed to parse config YAML: {}", e),
            path: Some(path.to_path_buf()),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, message: String| {
            Err(TtsError::Validation {
                message,
                field: Some(field.to_string()),
            })
        };

        if self.bitrate == 0 {
            return invalid("bitrate", "bitrate must be > 0".into());
        }
        if self.inference.breath_duration_secs < 0.0 {
            return invalid(
                "inference.breath_duration_secs",
                "breath_duration_secs must be >= 0".into(),
            );
        }
        if self.streaming.chunk_tokens == 0 {
            return invalid("streaming.chunk_tokens", "chunk_tokens must be > 0".into());
        }
        if self.streaming.delivery_threshold == 0 {
            return invalid("streaming.delivery_threshold", "delivery_threshold must be > 0".into());
        }
        if !(self.alignment.chapter_length_secs >= MIN_CHAPTER_SECS) {
            return invalid(
                "alignment.chapter_length_secs",
                format!(
                    "chapter length must be >= {}s, got {}",
                    MIN_CHAPTER_SECS, self.alignment.chapter_length_secs
                ),
            );
        }
        if !(1..=32).contains(&self.dsp.dither_bits) {
            return invalid(
                "dsp.dither_bits",
                format!("dither_bits must be in 1..=32, got {}", self.dsp.dither_bits),
            );
        }
        if self.dsp.gate_ratio < 1.0 {
            return invalid("dsp.gate_ratio", "gate_ratio must be >= 1".into());
        }
        if self.dsp.compressor_ratio < 1.0 {
            return invalid("dsp.compressor_ratio", "compressor_ratio must be >= 1".into());
        }
        if self.inference.fallback_duration_secs <= 0.0 {
            return invalid(
                "inference.fallback_duration_secs",
                "fallback_duration_secs must be > 0".into(),
            );
        }
        Ok(())
    }

    /// Find the model entry for a locale, falling back to `en-US` (or the first entry)
    pub fn model_for_locale(&self, locale: &str) -> Option<&LanguageModelConfig> {
        self.models
            .iter()
            .find(|m| m.locale == locale)
            .or_else(|| self.models.iter().find(|m| m.locale == "en-US"))
            .or_else(|| self.models.first())
    }
}

/// Per-locale model registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageModelConfig {
    /// Locale tag, e.g. `en-US`
    pub locale: String,
    /// Path to the inference model
    pub model_path: PathBuf,
    /// Path to the tokenizer/vocabulary table
    #[serde(default)]
    pub tokenizer_path: Option<PathBuf>,
}

impl LanguageModelConfig {
    pub fn new(locale: &str, model_path: &str, tokenizer_path: &str) -> Self {
        Self {
            locale: locale.to_string(),
            model_path: PathBuf::from(model_path),
            tokenizer_path: Some(PathBuf::from(tokenizer_path)),
        }
    }
}

/// Inference adapter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceSettings {
    /// Seed for every noise source (fallback waveform, jitter, breath)
    pub seed: u64,
    /// Peak-ish amplitude of the fallback noise generator
    pub fallback_amplitude: f32,
    /// Length of audio produced by the fallback generator per call
    pub fallback_duration_secs: f32,
    /// Length of a rendered breath marker
    pub breath_duration_secs: f32,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            seed: 0x5d_4b_0f_2c,
            fallback_amplitude: 0.1,
            fallback_duration_secs: 1.0,
            breath_duration_secs: 0.3,
        }
    }
}

/// Streaming delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Tokens synthesized per group
    pub chunk_tokens: usize,
    /// Samples per delivered chunk
    pub delivery_threshold: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_tokens: 10,
            delivery_threshold: 1024,
        }
    }
}

/// Single-band EQ presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EqPreset {
    /// No EQ
    #[default]
    Neutral,
    /// Warmth boost around 300 Hz
    Narration,
    /// Gentle presence cut around 5 kHz
    Podcast,
}

impl std::str::FromStr for EqPreset {
    type Err = TtsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "neutral" => Ok(EqPreset::Neutral),
            "narration" => Ok(EqPreset::Narration),
            "podcast" => Ok(EqPreset::Podcast),
            other => Err(TtsError::Validation {
                message: format!("Unknown EQ preset: {}", other),
                field: Some("eq_preset".to_string()),
            }),
        }
    }
}

/// Post-processing chain configuration
///
/// Trim and normalize always run; every other stage has its own toggle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DspConfig {
    pub trim_threshold_db: f32,

    pub eq: bool,
    pub eq_preset: EqPreset,

    pub noise_gate: bool,
    pub gate_threshold_db: f32,
    pub gate_ratio: f32,

    pub compressor: bool,
    pub compressor_threshold_db: f32,
    pub compressor_ratio: f32,
    /// Additive gain recovery per sample while below threshold
    pub compressor_release_step: f32,

    pub loudness: bool,
    pub target_lufs: f32,

    pub limiter: bool,
    pub limiter_threshold_db: f32,

    pub dither: bool,
    pub dither_bits: u32,
    pub dither_seed: u64,

    pub stereo: bool,
    pub stereo_width: f32,
}

impl Default for DspConfig {
    fn default() -> Self {
        Self {
            trim_threshold_db: -60.0,
            eq: true,
            eq_preset: EqPreset::Neutral,
            noise_gate: true,
            gate_threshold_db: -60.0,
            gate_ratio: 10.0,
            compressor: true,
            compressor_threshold_db: -20.0,
            compressor_ratio: 4.0,
            compressor_release_step: 1e-4,
            loudness: true,
            target_lufs: -16.0,
            limiter: true,
            limiter_threshold_db: -6.0,
            dither: true,
            dither_bits: 16,
            dither_seed: 0x0d17_4e55,
            stereo: true,
            stereo_width: 1.0,
        }
    }
}

impl DspConfig {
    /// Only the always-on stages (trim, normalize)
    pub fn minimal() -> Self {
        Self {
            eq: false,
            noise_gate: false,
            compressor: false,
            loudness: false,
            limiter: false,
            dither: false,
            stereo: false,
            ..Default::default()
        }
    }
}

/// Subtitle and chapter alignment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Emit phoneme-like units instead of words
    pub phoneme_level: bool,
    /// Fixed chapter bucket length
    pub chapter_length_secs: f64,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            phoneme_level: false,
            chapter_length_secs: 300.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_is_default() {
        let config: PipelineConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.locale, "en-US");
        assert_eq!(config.streaming.chunk_tokens, 10);
        assert_eq!(config.streaming.delivery_threshold, 1024);
        assert_eq!(config.dsp.dither_bits, 16);
        assert_eq!(config.alignment.chapter_length_secs, 300.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let yaml = "locale: es-ES\ndsp:\n  eq_preset: narration\n  dither: false\nstreaming:\n  chunk_tokens: 4\n";
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.locale, "es-ES");
        assert_eq!(config.dsp.eq_preset, EqPreset::Narration);
        assert!(!config.dsp.dither);
        assert!(config.dsp.limiter);
        assert_eq!(config.streaming.chunk_tokens, 4);
        assert_eq!(config.streaming.delivery_threshold, 1024);
    }

    #[test]
    fn test_validate_rejects_zero_chunk() {
        let mut config = PipelineConfig::default();
        config.streaming.chunk_tokens = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, TtsError::Validation { field: Some(ref f), .. } if f == "streaming.chunk_tokens"));
    }

    #[test]
    fn test_validate_rejects_bad_dither_bits() {
        let mut config = PipelineConfig::default();
        config.dsp.dither_bits = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_tiny_chapter_length() {
        let mut config = PipelineConfig::default();
        config.alignment.chapter_length_secs = 1e-11;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, TtsError::Validation { field: Some(ref f), .. } if f == "alignment.chapter_length_secs"));
        config.alignment.chapter_length_secs = 0.001;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_bitrate() {
        let mut config = PipelineConfig::default();
        config.bitrate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_model_for_locale_fallback() {
        let config = PipelineConfig::default();
        assert_eq!(config.model_for_locale("es-ES").unwrap().locale, "es-ES");
        assert_eq!(config.model_for_locale("de-DE").unwrap().locale, "en-US");
    }

    #[test]
    fn test_eq_preset_from_str() {
        assert_eq!("Podcast".parse::<EqPreset>().unwrap(), EqPreset::Podcast);
        assert!("loud".parse::<EqPreset>().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = PipelineConfig::load("/nonexistent/pipeline.yaml").unwrap_err();
        assert!(matches!(err, TtsError::Config { .. }));
    }
}
