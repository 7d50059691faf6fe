//! Markup-aware text segmentation
//!
//! Splits marked-up input into prosody-annotated segments. Four inline tags
//! are recognized:
//!
//! - `<break time="2s"/>` - a pure pause
//! - `<prosody rate=".." pitch=".." volume="..">text</prosody>`
//! - `<emphasis level="strong|moderate">text</emphasis>`
//! - `<breath/>` - a breath marker
//!
//! Tags do not nest; markup found inside a wrapped span is stripped.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

use super::PronunciationDictionary;
use crate::core::error::TtsError;

static BREAK_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<break\s+time\s*=\s*"([^"]*)"\s*/?>"#).expect("static regex"));
static PROSODY_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<prosody(\s[^>]*)?>(.*?)</prosody\s*>").expect("static regex"));
static EMPHASIS_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<emphasis(?:\s+level\s*=\s*"([^"]*)")?\s*>(.*?)</emphasis\s*>"#)
        .expect("static regex")
});
static BREATH_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<breath\s*/?>").expect("static regex"));
static RESIDUAL_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*</?\s*(?:break|prosody|emphasis|breath)\b[^>]*>\s*").expect("static regex")
});
static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\w+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).expect("static regex")
});

/// Pause used when a break duration cannot be parsed
pub const DEFAULT_BREAK_SECS: f32 = 1.0;

/// One unit of synthesis input
///
/// A segment is exactly one of: speakable text, a pure pause, or a breath marker.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSegment {
    pub text: String,
    /// Speaking rate multiplier (> 0)
    pub rate: f32,
    /// Pitch offset in semitones
    pub pitch: f32,
    /// Volume multiplier (> 0)
    pub volume: f32,
    /// Pause length in seconds
    pub break_time: f32,
    /// Emphasis gain multiplier
    pub emphasis: f32,
    pub breath: bool,
}

impl TextSegment {
    /// Speakable text with identity prosody
    pub fn speech(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rate: 1.0,
            pitch: 0.0,
            volume: 1.0,
            break_time: 0.0,
            emphasis: 1.0,
            breath: false,
        }
    }

    /// A pure pause
    pub fn pause(seconds: f32) -> Self {
        Self {
            break_time: seconds,
            ..Self::speech("")
        }
    }

    /// A breath marker
    pub fn breath_marker() -> Self {
        Self {
            breath: true,
            ..Self::speech("")
        }
    }

    pub fn is_pause(&self) -> bool {
        self.text.is_empty() && self.break_time > 0.0
    }

    pub fn is_breath_marker(&self) -> bool {
        self.text.is_empty() && self.breath
    }

    pub fn is_speakable(&self) -> bool {
        !self.text.is_empty() && self.break_time == 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Break,
    Prosody,
    Emphasis,
    Breath,
}

impl TagKind {
    /// Fixed scan order; also the tie-break order for equal start offsets
    const ALL: [TagKind; 4] = [TagKind::Break, TagKind::Prosody, TagKind::Emphasis, TagKind::Breath];

    fn pattern(self) -> &'static Regex {
        match self {
            TagKind::Break => &BREAK_TAG,
            TagKind::Prosody => &PROSODY_TAG,
            TagKind::Emphasis => &EMPHASIS_TAG,
            TagKind::Breath => &BREATH_TAG,
        }
    }
}

/// Markup segmenter with an injected pronunciation dictionary
#[derive(Debug, Clone, Default)]
pub struct MarkupSegmenter {
    dictionary: PronunciationDictionary,
}

impl MarkupSegmenter {
    pub fn new(dictionary: PronunciationDictionary) -> Self {
        Self { dictionary }
    }

    pub fn dictionary(&self) -> &PronunciationDictionary {
        &self.dictionary
    }

    /// Segment raw markup into an ordered, never-empty list of segments
    pub fn segment(&self, raw: &str, locale: &str) -> Vec<TextSegment> {
        let mut segments = Vec::new();
        let mut rest = raw;

        while !rest.is_empty() {
            let earliest = TagKind::ALL
                .iter()
                .filter_map(|&kind| kind.pattern().captures(rest).map(|caps| (kind, caps)))
                .min_by_key(|(_, caps)| caps.get(0).map_or(usize::MAX, |m| m.start()));

            let Some((kind, whole, caps)) =
                earliest.and_then(|(kind, caps)| caps.get(0).map(|whole| (kind, whole, caps)))
            else {
                self.push_plain(rest, &mut segments);
                break;
            };

            self.push_plain(&rest[..whole.start()], &mut segments);

            match kind {
                TagKind::Break => {
                    let seconds = parse_break_time(caps.get(1).map_or("", |m| m.as_str()));
                    if seconds > 0.0 {
                        segments.push(TextSegment::pause(seconds));
                    }
                }
                TagKind::Prosody => {
                    if let Some(mut segment) = self.speech_segment(caps.get(2).map_or("", |m| m.as_str())) {
                        apply_prosody_attributes(&mut segment, caps.get(1).map_or("", |m| m.as_str()));
                        segments.push(segment);
                    }
                }
                TagKind::Emphasis => {
                    if let Some(mut segment) = self.speech_segment(caps.get(2).map_or("", |m| m.as_str())) {
                        segment.emphasis = emphasis_level(caps.get(1).map(|m| m.as_str()));
                        segments.push(segment);
                    }
                }
                TagKind::Breath => segments.push(TextSegment::breath_marker()),
            }

            rest = &rest[whole.end()..];
        }

        if segments.is_empty() {
            segments.push(TextSegment::speech(self.normalize(raw)));
        }

        debug!(locale, count = segments.len(), "Segmented markup");
        segments
    }

    /// Strip residual markup, apply the dictionary and trim
    pub fn normalize(&self, span: &str) -> String {
        let stripped = strip_residual_tags(span);
        self.dictionary.apply(&stripped).trim().to_string()
    }

    fn speech_segment(&self, span: &str) -> Option<TextSegment> {
        let text = self.normalize(span);
        (!text.is_empty()).then(|| TextSegment::speech(text))
    }

    fn push_plain(&self, span: &str, segments: &mut Vec<TextSegment>) {
        if let Some(segment) = self.speech_segment(span) {
            segments.push(segment);
        }
    }
}

/// Each leftover tag and the whitespace around it becomes a single space
fn strip_residual_tags(span: &str) -> String {
    if !span.contains('<') {
        return span.to_string();
    }
    RESIDUAL_TAG.replace_all(span, " ").into_owned()
}

/// Parse `2s`, `2`, `1.5s` or `500ms`; anything else falls back to the default
fn parse_break_time(raw: &str) -> f32 {
    let raw = raw.trim();
    let parsed = if let Some(ms) = raw.strip_suffix("ms") {
        ms.trim().parse::<f32>().map(|v| v / 1000.0)
    } else {
        raw.trim_end_matches('s').trim().parse::<f32>()
    };

    match parsed {
        Ok(v) if v.is_finite() && v >= 0.0 => v,
        _ => {
            let err = TtsError::Parse {
                message: "unparsable break duration".to_string(),
                fragment: raw.to_string(),
            };
            debug!("{}; using {}s", err, DEFAULT_BREAK_SECS);
            DEFAULT_BREAK_SECS
        }
    }
}

fn parse_attribute_value(raw: &str) -> Option<f32> {
    let raw = raw.trim();
    let value = match raw.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f32>().ok()? / 100.0,
        None => raw.parse::<f32>().ok()?,
    };
    value.is_finite().then_some(value)
}

fn apply_prosody_attributes(segment: &mut TextSegment, attrs: &str) {
    for caps in ATTRIBUTE.captures_iter(attrs) {
        let name = &caps[1];
        let raw = attribute_raw_value(&caps);
        let Some(value) = parse_attribute_value(raw) else {
            debug!("{}", TtsError::Parse {
                message: format!("unparsable prosody {}", name),
                fragment: raw.to_string(),
            });
            continue;
        };
        match name {
            "rate" if value > 0.0 => segment.rate = value,
            "pitch" => segment.pitch = value,
            "volume" if value > 0.0 => segment.volume = value,
            _ => debug!("Ignoring prosody attribute {}={}", name, raw),
        }
    }
}

fn attribute_raw_value<'a>(caps: &Captures<'a>) -> &'a str {
    caps.get(2)
        .or_else(|| caps.get(3))
        .or_else(|| caps.get(4))
        .map_or("", |m| m.as_str())
}

fn emphasis_level(level: Option<&str>) -> f32 {
    match level.map(str::trim) {
        Some("strong") => 1.5,
        Some("moderate") => 1.2,
        _ => 1.0,
    }
}
