//! SDKWork Voiceover CLI - marked-up text to mastered speech
//!
//! Thin caller of [`VoiceoverPipeline`]: loads configuration, runs the
//! pipeline and writes audio plus sidecar files.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use sdkwork_voiceover::audio::{AudioMetadata, PcmWavWriter};
use sdkwork_voiceover::inference::{BatchSynthesisRequest, Emotion, SynthesisOptions};
use sdkwork_voiceover::voice::FileEmbeddingStore;
use sdkwork_voiceover::{EqPreset, PipelineConfig, VoiceoverPipeline, SAMPLE_RATE, VERSION};

/// SDKWork Voiceover - offline TTS voiceover pipeline
#[derive(Parser, Debug)]
#[command(name = "sdkwork-voiceover")]
#[command(author, version, about, long_about = None)]
#[command(long_about = "
Offline voiceover synthesis with inline markup, DSP mastering and subtitles.

Markup:
  <break time=\"2s\"/>                 pause (s or ms)
  <prosody rate=\"1.2\" pitch=\"2\">..</prosody>
  <emphasis level=\"strong\">..</emphasis>
  <breath/>

Examples:
  sdkwork-voiceover synth --text \"Hello <break time=\\\"1s\\\"/> world\" --out hello.wav
  sdkwork-voiceover synth --input chapter1.txt --out ch1.wav --subtitle ch1.srt --chapters ch1.ffmeta
  sdkwork-voiceover batch --input-dir book/ --output-dir audio/ --workers 4
")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to pipeline config (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Voice and prosody flags shared by synthesis commands
#[derive(Args, Debug, Clone)]
struct VoiceArgs {
    /// Voice name (looked up in the voices directory)
    #[arg(long, default_value = "default")]
    voice: String,

    /// Second voice to morph toward
    #[arg(long)]
    morph_voice: Option<String>,

    /// Morph amount (0.0 - 1.0)
    #[arg(long, default_value = "0.5")]
    blend: f32,

    /// Speaking rate multiplier
    #[arg(long, default_value = "1.0")]
    rate: f32,

    /// Pitch offset in semitones
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    pitch: f32,

    /// Volume multiplier
    #[arg(long, default_value = "1.0")]
    volume: f32,

    /// Emotion: neutral, happy, sad, angry
    #[arg(long, default_value = "neutral")]
    emotion: String,

    /// Additive voice jitter
    #[arg(long, default_value = "0.0")]
    jitter: f32,

    /// Amplitude shimmer
    #[arg(long, default_value = "0.0")]
    shimmer: f32,

    /// Locale (defaults to the configured locale)
    #[arg(long)]
    locale: Option<String>,
}

impl VoiceArgs {
    fn to_options(&self) -> SynthesisOptions {
        SynthesisOptions {
            voice: self.voice.clone(),
            morph_voice: self.morph_voice.clone(),
            blend: self.blend,
            rate: self.rate,
            pitch: self.pitch,
            volume: self.volume,
            emotion: Emotion::parse_lenient(&self.emotion),
            jitter: self.jitter,
            shimmer: self.shimmer,
            locale: self.locale.clone(),
            phoneme_level: None,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synthesize marked-up text to an audio file
    Synth {
        /// Text to synthesize
        #[arg(short, long, conflicts_with = "input")]
        text: Option<String>,

        /// Read text from a file
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output audio file path
        #[arg(short, long, default_value = "output.wav")]
        out: PathBuf,

        #[command(flatten)]
        voice: VoiceArgs,

        /// Pronunciation dictionary (overrides config)
        #[arg(long)]
        dict: Option<PathBuf>,

        /// Subtitle output (.srt or .vtt)
        #[arg(long)]
        subtitle: Option<PathBuf>,

        /// Chapter metadata output
        #[arg(long)]
        chapters: Option<PathBuf>,

        /// Phoneme-level subtitles
        #[arg(long)]
        phoneme_subtitles: bool,

        /// EQ preset: neutral, narration, podcast
        #[arg(long)]
        eq_preset: Option<String>,

        /// Loudness target
        #[arg(long, allow_hyphen_values = true)]
        normalize_lufs: Option<f32>,

        /// Dither bit depth
        #[arg(long)]
        dither_bits: Option<u32>,

        /// Print a quality report
        #[arg(long)]
        analyze_quality: bool,

        /// Title tag
        #[arg(long)]
        title: Option<String>,

        /// Artist tag
        #[arg(long)]
        artist: Option<String>,

        /// Album tag
        #[arg(long)]
        album: Option<String>,
    },

    /// Stream synthesis in chunks and write the raw result
    Stream {
        /// Text to synthesize
        #[arg(short, long)]
        text: String,

        /// Output audio file path
        #[arg(short, long, default_value = "stream.wav")]
        out: PathBuf,

        #[command(flatten)]
        voice: VoiceArgs,
    },

    /// Synthesize every .txt file in a directory
    Batch {
        /// Directory of .txt files
        #[arg(long)]
        input_dir: PathBuf,

        /// Directory for .wav output
        #[arg(long)]
        output_dir: PathBuf,

        /// Worker threads
        #[arg(long)]
        workers: Option<usize>,

        #[command(flatten)]
        voice: VoiceArgs,
    },

    /// List voices in the voices directory
    Voices,

    /// Show the effective configuration
    Info,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn create_progress_bar(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config {:?}", path)),
        None => Ok(PipelineConfig::default()),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_synth(
    mut config: PipelineConfig,
    text: Option<&str>,
    input: Option<&Path>,
    out: &Path,
    voice: &VoiceArgs,
    dict: Option<&Path>,
    subtitle: Option<&Path>,
    chapters: Option<&Path>,
    phoneme_subtitles: bool,
    eq_preset: Option<&str>,
    normalize_lufs: Option<f32>,
    dither_bits: Option<u32>,
    analyze_quality: bool,
    metadata: AudioMetadata,
) -> Result<()> {
    let text = match (text, input) {
        (Some(text), _) => text.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {:?}", path))?,
        (None, None) => anyhow::bail!("Provide --text or --input"),
    };

    if let Some(dict) = dict {
        config.dictionary = Some(dict.to_path_buf());
    }
    if let Some(preset) = eq_preset {
        config.dsp.eq_preset = preset.parse::<EqPreset>()?;
    }
    if let Some(lufs) = normalize_lufs {
        config.dsp.target_lufs = lufs;
    }
    if let Some(bits) = dither_bits {
        config.dsp.dither_bits = bits;
    }
    config.alignment.phoneme_level |= phoneme_subtitles;

    let pipeline = VoiceoverPipeline::from_config(config)?;
    let options = voice.to_options();

    let pb = create_progress_bar("Synthesizing...");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    let start = Instant::now();
    let output = pipeline.synthesize(&text, &options)?;
    pb.finish_with_message(format!(
        "Synthesized {:.2}s of audio in {:.1}s",
        output.duration_secs(),
        start.elapsed().as_secs_f32()
    ));

    pipeline.save_audio(&output, out, &metadata)?;
    info!("Saved to {:?}", out);

    if analyze_quality {
        println!("{}", output.quality);
    }
    if let Some(path) = subtitle {
        let format = pipeline.save_subtitles(&output, path)?;
        info!("Subtitles ({:?}) exported to {:?}", format, path);
    }
    if let Some(path) = chapters {
        pipeline.save_chapters(&output, path)?;
        info!("Chapters exported to {:?}", path);
    }
    Ok(())
}

fn run_stream(config: PipelineConfig, text: &str, out: &Path, voice: &VoiceArgs) -> Result<()> {
    let pipeline = VoiceoverPipeline::from_config(config)?;
    let mut writer = PcmWavWriter::create(out, SAMPLE_RATE)
        .with_context(|| format!("Failed to create WAV file: {:?}", out))?;

    let stats = pipeline.stream(text, &voice.to_options(), |chunk| {
        info!(
            "Chunk {} at sample {} ({:.3}s)",
            chunk.index,
            chunk.offset,
            chunk.duration_secs()
        );
        writer.write(&chunk.samples)
    })?;
    writer.finalize()?;

    info!(
        "Streamed {} chunks ({} samples) to {:?}",
        stats.chunks, stats.samples, out
    );
    Ok(())
}

fn run_batch(
    config: PipelineConfig,
    input_dir: &Path,
    output_dir: &Path,
    workers: Option<usize>,
    voice: &VoiceArgs,
) -> Result<()> {
    let pipeline = VoiceoverPipeline::from_config(config)?;
    let mut request = BatchSynthesisRequest::from_directory(input_dir, output_dir)?
        .with_options(voice.to_options());
    if let Some(workers) = workers {
        request = request.with_parallelism(workers);
    }
    if request.is_empty() {
        warn!("No .txt files found in {:?}", input_dir);
        return Ok(());
    }

    let pb = create_progress_bar(&format!("Synthesizing {} files...", request.len()));
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    let result = pipeline.process_batch(&request)?;
    pb.finish_with_message(format!(
        "{} succeeded, {} failed ({:.1}s of audio)",
        result.succeeded.len(),
        result.failed.len(),
        result.total_duration()
    ));

    for (path, error) in &result.failed {
        warn!("{:?}: {}", path, error);
    }
    Ok(())
}

fn run_voices(config: &PipelineConfig) -> Result<()> {
    let store = FileEmbeddingStore::new(config.voices_dir.clone());
    let voices = store.list_voices()?;
    if voices.is_empty() {
        println!("No voices in {:?}", config.voices_dir);
    }
    for voice in voices {
        println!(
            "{:<20} {:<8} {:<6} {}",
            voice.name,
            voice.gender.to_string(),
            voice.locale,
            voice.description
        );
    }
    Ok(())
}

fn run_info(config: &PipelineConfig) -> Result<()> {
    let pipeline = VoiceoverPipeline::from_config(config.clone())?;
    println!("SDKWork Voiceover v{}", VERSION);
    println!("Sample rate: {} Hz (mono)", SAMPLE_RATE);
    println!("Locale: {}", config.locale);
    println!("Backend: {}", pipeline.adapter().backend().name());
    println!("DSP stages: {}", pipeline.dsp().stage_names().join(" -> "));
    for model in &config.models {
        println!("Model [{}]: {:?}", model.locale, model.model_path);
    }
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    info!("SDKWork Voiceover v{}", VERSION);
    let config = load_config(cli.config.as_deref())?;

    match &cli.command {
        Commands::Synth {
            text,
            input,
            out,
            voice,
            dict,
            subtitle,
            chapters,
            phoneme_subtitles,
            eq_preset,
            normalize_lufs,
            dither_bits,
            analyze_quality,
            title,
            artist,
            album,
        } => run_synth(
            config,
            text.as_deref(),
            input.as_deref(),
            out,
            voice,
            dict.as_deref(),
            subtitle.as_deref(),
            chapters.as_deref(),
            *phoneme_subtitles,
            eq_preset.as_deref(),
            *normalize_lufs,
            *dither_bits,
            *analyze_quality,
            AudioMetadata {
                title: title.clone(),
                artist: artist.clone(),
                album: album.clone(),
            },
        ),
        Commands::Stream { text, out, voice } => run_stream(config, text, out, voice),
        Commands::Batch {
            input_dir,
            output_dir,
            workers,
            voice,
        } => run_batch(config, input_dir, output_dir, *workers, voice),
        Commands::Voices => run_voices(&config),
        Commands::Info => run_info(&config),
    }
}
