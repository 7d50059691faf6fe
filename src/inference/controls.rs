//! Synthesis control parameters handed to the model

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Emotion conditioning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    #[default]
    Neutral,
    Happy,
    Sad,
    Angry,
}

impl Emotion {
    /// Model-side emotion id
    pub fn id(self) -> u32 {
        match self {
            Emotion::Neutral => 0,
            Emotion::Happy => 1,
            Emotion::Sad => 2,
            Emotion::Angry => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
        }
    }

    /// Lenient parse: unknown names map to neutral
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| {
            warn!("Unknown emotion '{}', using neutral", s);
            Emotion::Neutral
        })
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Emotion {
    type Err = crate::core::error::TtsError;

    fn from_str(s: &str) -> crate::core::error::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "neutral" => Ok(Emotion::Neutral),
            "happy" => Ok(Emotion::Happy),
            "sad" => Ok(Emotion::Sad),
            "angry" => Ok(Emotion::Angry),
            other => Err(crate::core::error::TtsError::Validation {
                message: format!("Unknown emotion: {}", other),
                field: Some("emotion".to_string()),
            }),
        }
    }
}

/// Per-call controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisControls {
    pub rate: f32,
    /// Semitone offset
    pub pitch: f32,
    pub volume: f32,
    pub emotion: Emotion,
    /// Uniform additive noise amount
    pub jitter: f32,
    /// Delta-proportional noise amount
    pub shimmer: f32,
    pub emphasis: f32,
    /// Add a low-level noise floor
    pub breath: bool,
}

impl Default for SynthesisControls {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 0.0,
            volume: 1.0,
            emotion: Emotion::Neutral,
            jitter: 0.0,
            shimmer: 0.0,
            emphasis: 1.0,
            breath: false,
        }
    }
}

impl SynthesisControls {
    /// Clamp out-of-range values to something the model can take
    pub fn sanitized(&self) -> Self {
        let positive = |v: f32| if v.is_finite() && v > 0.0 { v } else { 1.0 };
        let non_negative = |v: f32| if v.is_finite() { v.max(0.0) } else { 0.0 };
        Self {
            rate: positive(self.rate),
            pitch: if self.pitch.is_finite() { self.pitch } else { 0.0 },
            volume: positive(self.volume),
            emotion: self.emotion,
            jitter: non_negative(self.jitter),
            shimmer: non_negative(self.shimmer),
            emphasis: non_negative(self.emphasis),
            breath: self.breath,
        }
    }
}
