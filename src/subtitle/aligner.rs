//! Word and phoneme timing
//!
//! Timing is proportional: the audio duration is split evenly across units in
//! reading order, so the sequence is contiguous and non-overlapping.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::SAMPLE_RATE;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("static regex"));

const VOWELS: &[char] = &['a', 'e', 'i', 'o', 'u'];

/// A timed word or phoneme-like unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timestamp {
    pub unit: String,
    pub start_time: f64,
    pub end_time: f64,
}

impl Timestamp {
    pub fn new(unit: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            unit: unit.into(),
            start_time,
            end_time,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Duration in seconds of `samples` at `sample_rate`
pub fn duration_secs(samples: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    samples as f64 / sample_rate as f64
}

/// Stateless aligner over a fixed sample rate
#[derive(Debug, Clone, Copy)]
pub struct TimestampAligner {
    sample_rate: u32,
}

impl Default for TimestampAligner {
    fn default() -> Self {
        Self::new(SAMPLE_RATE)
    }
}

impl TimestampAligner {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    /// Align `text` to the duration of `audio`
    pub fn align(&self, text: &str, audio: &[f32], phoneme_level: bool) -> Vec<Timestamp> {
        self.align_duration(text, duration_secs(audio.len(), self.sample_rate), phoneme_level)
    }

    /// Align `text` to an explicit duration in seconds
    pub fn align_duration(&self, text: &str, duration: f64, phoneme_level: bool) -> Vec<Timestamp> {
        let words = WORD.find_iter(text).map(|m| m.as_str());
        let units: Vec<String> = if phoneme_level {
            words.flat_map(split_into_phonemes).collect()
        } else {
            words.map(str::to_string).collect()
        };
        distribute(units, duration)
    }

    /// Rescale a sequence to the duration of `new_audio`
    pub fn realign(&self, timestamps: &[Timestamp], new_audio: &[f32]) -> Vec<Timestamp> {
        realign_to_duration(timestamps, duration_secs(new_audio.len(), self.sample_rate))
    }
}

/// Even split of `duration` across `units`
fn distribute(units: Vec<String>, duration: f64) -> Vec<Timestamp> {
    let n = units.len();
    if n == 0 {
        return Vec::new();
    }
    let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
    // Boundaries computed from the index so consecutive units share the exact same edge
    let boundary = |i: usize| duration * i as f64 / n as f64;

    units
        .into_iter()
        .enumerate()
        .map(|(i, unit)| Timestamp::new(unit, boundary(i), boundary(i + 1)))
        .collect()
}

/// Scale every time by `new_duration / old_duration`, where the old duration is
/// the last end time; a zero old duration leaves times unchanged
pub fn realign_to_duration(timestamps: &[Timestamp], new_duration: f64) -> Vec<Timestamp> {
    let old_duration = timestamps.last().map(|t| t.end_time).unwrap_or(0.0);
    let ratio = if old_duration > 0.0 && new_duration.is_finite() {
        new_duration / old_duration
    } else {
        1.0
    };

    timestamps
        .iter()
        .map(|t| Timestamp::new(t.unit.clone(), t.start_time * ratio, t.end_time * ratio))
        .collect()
}

/// Vowel-boundary split: each vowel is a unit, consonant runs merge into one
pub fn split_into_phonemes(word: &str) -> Vec<String> {
    let mut units = Vec::new();
    let mut consonants = String::new();

    for c in word.to_lowercase().chars() {
        if VOWELS.contains(&c) {
            if !consonants.is_empty() {
                units.push(std::mem::take(&mut consonants));
            }
            units.push(c.to_string());
        } else {
            consonants.push(c);
        }
    }
    if !consonants.is_empty() {
        units.push(consonants);
    }
    units
}
