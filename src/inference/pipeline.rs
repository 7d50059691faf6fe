//! Voiceover pipeline
//!
//! Orchestrates one synthesis request:
//! 1. Markup segmentation with dictionary substitution
//! 2. Tokenization per locale
//! 3. Voice embedding lookup (with optional morphing)
//! 4. Per-segment inference, silence for breaks
//! 5. DSP post-processing
//! 6. Quality analysis and timestamp alignment on the final PCM

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use super::adapter::InferenceAdapter;
use super::backend::ModelRunner;
use super::controls::{Emotion, SynthesisControls};
use super::streaming::{AudioChunk, StreamingStats};
use crate::audio::{AudioEncoder, AudioMetadata, DspChain, QualityReport, WavEncoder};
use crate::config::PipelineConfig;
use crate::core::error::{ResourceType, Result, TtsError};
use crate::subtitle::{
    duration_secs, to_chapters, write_chapters, write_subtitles, SubtitleFormat, Timestamp,
    TimestampAligner,
};
use crate::text::{MarkupSegmenter, PronunciationDictionary, TextSegment, Tokenizer, VocabularyTokenizer};
use crate::voice::{Embedding, EmbeddingStore, FileEmbeddingStore};
use crate::SAMPLE_RATE;

/// Request-level options
#[derive(Debug, Clone)]
pub struct SynthesisOptions {
    pub voice: String,
    /// Second voice to blend toward
    pub morph_voice: Option<String>,
    /// Blend amount toward `morph_voice`, clamped to [0, 1]
    pub blend: f32,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub emotion: Emotion,
    pub jitter: f32,
    pub shimmer: f32,
    /// Overrides the configured default locale
    pub locale: Option<String>,
    /// Overrides `alignment.phoneme_level`
    pub phoneme_level: Option<bool>,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            voice: "default".to_string(),
            morph_voice: None,
            blend: 0.5,
            rate: 1.0,
            pitch: 0.0,
            volume: 1.0,
            emotion: Emotion::Neutral,
            jitter: 0.0,
            shimmer: 0.0,
            locale: None,
            phoneme_level: None,
        }
    }
}

impl SynthesisOptions {
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Segment prosody composed onto the request: rate and volume multiply, pitch adds
    pub fn controls_for(&self, segment: &TextSegment) -> SynthesisControls {
        SynthesisControls {
            rate: self.rate * segment.rate,
            pitch: self.pitch + segment.pitch,
            volume: self.volume * segment.volume,
            emotion: self.emotion,
            jitter: self.jitter,
            shimmer: self.shimmer,
            emphasis: segment.emphasis,
            breath: segment.breath,
        }
    }
}

/// One rendered piece of the timeline before concatenation
#[derive(Debug, Clone, PartialEq)]
pub enum RenderedSegment {
    Audio(Vec<f32>),
    /// Pause length in seconds
    Silence(f32),
}

/// Samples of silence for a pause: `floor(seconds * sample_rate)`
pub fn silence_samples(seconds: f32, sample_rate: u32) -> usize {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds as f64 * sample_rate as f64).floor() as usize
}

/// Concatenate rendered segments in order, expanding pauses into zeros
pub fn assemble(parts: Vec<RenderedSegment>, sample_rate: u32) -> Vec<f32> {
    let total = parts
        .iter()
        .map(|p| match p {
            RenderedSegment::Audio(pcm) => pcm.len(),
            RenderedSegment::Silence(secs) => silence_samples(*secs, sample_rate),
        })
        .sum();

    let mut pcm = Vec::with_capacity(total);
    for part in parts {
        match part {
            RenderedSegment::Audio(samples) => pcm.extend(samples),
            RenderedSegment::Silence(secs) => {
                pcm.resize(pcm.len() + silence_samples(secs, sample_rate), 0.0)
            }
        }
    }
    pcm
}

/// Final audio plus its sidecar data
#[derive(Debug, Clone)]
pub struct SynthesisOutput {
    /// Post-processed mono PCM
    pub pcm: Vec<f32>,
    pub sample_rate: u32,
    /// Spoken text the timestamps are aligned over (markup removed)
    pub spoken_text: String,
    pub timestamps: Vec<Timestamp>,
    pub quality: QualityReport,
    pub segment_count: usize,
}

impl SynthesisOutput {
    pub fn duration_secs(&self) -> f64 {
        duration_secs(self.pcm.len(), self.sample_rate)
    }

    /// Word-level timing, whatever granularity `timestamps` uses
    pub fn word_timestamps(&self) -> Vec<Timestamp> {
        TimestampAligner::new(self.sample_rate).align(&self.spoken_text, &self.pcm, false)
    }

    pub fn subtitles(&self, format: SubtitleFormat) -> String {
        format.render(&self.timestamps)
    }

    pub fn chapters(&self, chapter_length_secs: f64) -> String {
        to_chapters(&self.word_timestamps(), chapter_length_secs)
    }
}

/// End-to-end synthesis over injected collaborators
pub struct VoiceoverPipeline {
    config: PipelineConfig,
    segmenter: MarkupSegmenter,
    tokenizer: Arc<dyn Tokenizer>,
    voices: Arc<dyn EmbeddingStore>,
    adapter: InferenceAdapter,
    dsp: DspChain,
    aligner: TimestampAligner,
    encoder: Arc<dyn AudioEncoder>,
}

impl VoiceoverPipeline {
    /// Build from explicit collaborators
    pub fn new(
        config: PipelineConfig,
        dictionary: PronunciationDictionary,
        tokenizer: Arc<dyn Tokenizer>,
        voices: Arc<dyn EmbeddingStore>,
        adapter: InferenceAdapter,
    ) -> Self {
        let dsp = DspChain::new(config.dsp.clone());
        Self {
            segmenter: MarkupSegmenter::new(dictionary),
            tokenizer,
            voices,
            adapter,
            dsp,
            aligner: TimestampAligner::new(SAMPLE_RATE),
            encoder: Arc::new(WavEncoder),
            config,
        }
    }

    /// Build from configuration: dictionary, vocabulary and voice directory are
    /// read from the configured paths; inference uses the deterministic fallback
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        let dictionary = match &config.dictionary {
            Some(path) => PronunciationDictionary::load(path)?,
            None => PronunciationDictionary::new(),
        };
        let tokenizer = match &config.vocabulary {
            Some(path) => VocabularyTokenizer::load(path, &config.locale)?,
            None => VocabularyTokenizer::empty(config.locale.clone()),
        };
        let voices = FileEmbeddingStore::new(config.voices_dir.clone());
        let adapter = InferenceAdapter::fallback_only(&config.inference, &config.streaming);

        Ok(Self::new(
            config,
            dictionary,
            Arc::new(tokenizer),
            Arc::new(voices),
            adapter,
        ))
    }

    /// Replace the backend with a real model runner
    pub fn with_model_runner(mut self, runner: Box<dyn ModelRunner>) -> Self {
        self.adapter =
            InferenceAdapter::with_model(runner, &self.config.inference, &self.config.streaming);
        self
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn AudioEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn adapter(&self) -> &InferenceAdapter {
        &self.adapter
    }

    pub fn dsp(&self) -> &DspChain {
        &self.dsp
    }

    pub fn voices(&self) -> &dyn EmbeddingStore {
        self.voices.as_ref()
    }

    /// Segment markup with the pipeline's dictionary
    pub fn segment(&self, text: &str, locale: &str) -> Vec<TextSegment> {
        self.segmenter.segment(text, locale)
    }

    /// Resolve the request voice, blending toward `morph_voice` when set
    pub fn resolve_embedding(&self, options: &SynthesisOptions) -> Embedding {
        let base = self.voices.load_or_fallback(&options.voice);
        match &options.morph_voice {
            Some(other) => {
                let other = self.voices.load_or_fallback(other);
                base.blend(&other, options.blend)
            }
            None => (*base).clone(),
        }
    }

    fn locale<'a>(&'a self, options: &'a SynthesisOptions) -> &'a str {
        let locale = options.locale.as_deref().unwrap_or(&self.config.locale);
        if let Some(model) = self.config.model_for_locale(locale) {
            debug!("Locale {} -> model {:?}", locale, model.model_path);
        }
        locale
    }

    fn render(
        &self,
        segment: &TextSegment,
        locale: &str,
        embedding: &Embedding,
        options: &SynthesisOptions,
    ) -> Option<RenderedSegment> {
        let controls = options.controls_for(segment);
        if segment.is_pause() {
            Some(RenderedSegment::Silence(segment.break_time))
        } else if segment.is_breath_marker() {
            Some(RenderedSegment::Audio(self.adapter.synthesize_breath(&controls)))
        } else if segment.is_speakable() {
            let tokens = self.tokenizer.tokenize(&segment.text, locale);
            Some(RenderedSegment::Audio(self.adapter.synthesize(&tokens, embedding, &controls)))
        } else {
            None
        }
    }

    /// Synthesize marked-up text into final PCM with timestamps and quality report
    pub fn synthesize(&self, text: &str, options: &SynthesisOptions) -> Result<SynthesisOutput> {
        let start = Instant::now();
        let locale = self.locale(options);

        let segments = self.segmenter.segment(text, locale);
        let embedding = self.resolve_embedding(options);

        let parts: Vec<RenderedSegment> = segments
            .iter()
            .filter_map(|s| self.render(s, locale, &embedding, options))
            .collect();
        let raw = assemble(parts, SAMPLE_RATE);
        debug!("Assembled {} segments into {} samples", segments.len(), raw.len());

        let pcm = self.dsp.process(raw);
        let quality = QualityReport::analyze(&pcm);

        let spoken_text = spoken_text(&segments);
        let phoneme_level = options
            .phoneme_level
            .unwrap_or(self.config.alignment.phoneme_level);
        let timestamps = self.aligner.align(&spoken_text, &pcm, phoneme_level);

        info!(
            "Synthesized {} segments ({:.2}s audio) in {:.0}ms",
            segments.len(),
            duration_secs(pcm.len(), SAMPLE_RATE),
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(SynthesisOutput {
            pcm,
            sample_rate: SAMPLE_RATE,
            spoken_text,
            timestamps,
            quality,
            segment_count: segments.len(),
        })
    }

    /// Stream raw synthesized audio for the speakable text, in delivery-sized chunks
    ///
    /// Streaming output skips DSP post-processing, which needs the whole buffer.
    pub fn stream<F>(&self, text: &str, options: &SynthesisOptions, on_chunk: F) -> Result<StreamingStats>
    where
        F: FnMut(AudioChunk) -> Result<()>,
    {
        let locale = self.locale(options);
        let segments = self.segmenter.segment(text, locale);
        let embedding = self.resolve_embedding(options);

        let tokens: Vec<u32> = segments
            .iter()
            .filter(|s| s.is_speakable())
            .flat_map(|s| self.tokenizer.tokenize(&s.text, locale))
            .collect();
        let controls = options.controls_for(&TextSegment::speech(""));

        self.adapter
            .synthesize_streaming(tokens, &embedding, &controls, on_chunk)
    }

    /// Encode final audio with the pipeline's encoder and configured bitrate
    pub fn save_audio(&self, output: &SynthesisOutput, path: &Path, metadata: &AudioMetadata) -> Result<()> {
        self.encoder.encode(
            &output.pcm,
            output.sample_rate,
            path,
            self.config.bitrate,
            metadata,
        )
    }

    /// Write subtitles (format from extension) next to the audio
    pub fn save_subtitles(&self, output: &SynthesisOutput, path: &Path) -> Result<SubtitleFormat> {
        write_subtitles(&output.timestamps, path)
    }

    /// Write chapter metadata using word-level timing
    pub fn save_chapters(&self, output: &SynthesisOutput, path: &Path) -> Result<()> {
        write_chapters(
            &output.word_timestamps(),
            path,
            self.config.alignment.chapter_length_secs,
        )
    }

    /// Read a text file, synthesize it and encode to `output_path`
    pub fn synthesize_file(
        &self,
        input_path: &Path,
        output_path: &Path,
        options: &SynthesisOptions,
    ) -> Result<SynthesisOutput> {
        let text = std::fs::read_to_string(input_path).map_err(|e| {
            TtsError::not_found(
                ResourceType::InputFile,
                input_path.display().to_string(),
                e.to_string(),
            )
        })?;
        let output = self.synthesize(&text, options)?;
        let metadata = AudioMetadata {
            title: input_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned()),
            ..Default::default()
        };
        self.save_audio(&output, output_path, &metadata)?;
        Ok(output)
    }
}

/// Spoken text of the speakable segments, joined by spaces
fn spoken_text(segments: &[TextSegment]) -> String {
    segments
        .iter()
        .filter(|s| s.is_speakable())
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
