//! Batch synthesis over a directory of text files
//!
//! Each file is an independent pipeline run. Files are distributed across a
//! bounded pool of scoped worker threads sharing the read-only pipeline; a
//! failing file is recorded and the batch continues.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use tracing::{info, warn};

use super::pipeline::{SynthesisOptions, VoiceoverPipeline};
use crate::core::error::{Result, TtsError};

/// Batch synthesis request
#[derive(Debug, Clone)]
pub struct BatchSynthesisRequest {
    /// Input `.txt` files, in processing order
    pub inputs: Vec<PathBuf>,
    /// Directory receiving `<stem>.wav`
    pub output_dir: PathBuf,
    pub options: SynthesisOptions,
    /// Maximum parallelism
    pub max_parallelism: usize,
}

impl BatchSynthesisRequest {
    /// Collect every `.txt` file in `input_dir`, sorted by path
    pub fn from_directory(input_dir: &Path, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let entries =
            std::fs::read_dir(input_dir).map_err(|e| TtsError::io_at(e, input_dir))?;

        let mut inputs: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "txt"))
            .collect();
        inputs.sort();

        Ok(Self {
            inputs,
            output_dir: output_dir.into(),
            options: SynthesisOptions::default(),
            max_parallelism: default_parallelism(),
        })
    }

    pub fn with_options(mut self, options: SynthesisOptions) -> Self {
        self.options = options;
        self
    }

    /// Set maximum parallelism
    pub fn with_parallelism(mut self, n: usize) -> Self {
        self.max_parallelism = n.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Output path for an input file
    pub fn output_for(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        self.output_dir.join(format!("{}.wav", stem))
    }
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// One successfully synthesized file
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub input: PathBuf,
    pub output: PathBuf,
    pub duration_secs: f64,
}

/// Batch synthesis result
#[derive(Debug, Clone, Default)]
pub struct BatchSynthesisResult {
    /// Successful files, in input order
    pub succeeded: Vec<BatchItem>,
    /// Failed files with their error message, in input order
    pub failed: Vec<(PathBuf, String)>,
    /// Total processing time in milliseconds
    pub total_time_ms: u64,
}

impl BatchSynthesisResult {
    /// Get success rate
    pub fn success_rate(&self) -> f64 {
        let total = self.succeeded.len() + self.failed.len();
        if total == 0 {
            1.0
        } else {
            self.succeeded.len() as f64 / total as f64
        }
    }

    /// Get total audio duration
    pub fn total_duration(&self) -> f64 {
        self.succeeded.iter().map(|item| item.duration_secs).sum()
    }
}

impl VoiceoverPipeline {
    /// Run every file of the batch; per-file failures do not abort the batch
    pub fn process_batch(&self, batch: &BatchSynthesisRequest) -> Result<BatchSynthesisResult> {
        let start = Instant::now();
        std::fs::create_dir_all(&batch.output_dir)
            .map_err(|e| TtsError::io_at(e, batch.output_dir.clone()))?;

        let workers = batch.max_parallelism.clamp(1, batch.len().max(1));
        let next = AtomicUsize::new(0);
        let outcomes: Mutex<Vec<(usize, std::result::Result<BatchItem, String>)>> =
            Mutex::new(Vec::with_capacity(batch.len()));

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(input) = batch.inputs.get(index) else {
                        break;
                    };
                    let output = batch.output_for(input);
                    let outcome = self
                        .synthesize_file(input, &output, &batch.options)
                        .map(|synth| BatchItem {
                            input: input.clone(),
                            output,
                            duration_secs: synth.duration_secs(),
                        })
                        .map_err(|e| {
                            warn!("Batch item {:?} failed: {}", input, e);
                            e.to_string()
                        });
                    if let Ok(mut guard) = outcomes.lock() {
                        guard.push((index, outcome));
                    }
                });
            }
        });

        let mut outcomes = outcomes.into_inner().map_err(|_| TtsError::Internal {
            message: "batch worker panicked".to_string(),
            location: Some("process_batch".to_string()),
        })?;
        outcomes.sort_by_key(|(index, _)| *index);

        let mut result = BatchSynthesisResult::default();
        for (index, outcome) in outcomes {
            match outcome {
                Ok(item) => result.succeeded.push(item),
                Err(message) => result.failed.push((batch.inputs[index].clone(), message)),
            }
        }
        result.total_time_ms = start.elapsed().as_millis() as u64;

        info!(
            "Batch finished: {} ok, {} failed in {}ms ({} workers)",
            result.succeeded.len(),
            result.failed.len(),
            result.total_time_ms,
            workers
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_request_builder() {
        let batch = BatchSynthesisRequest {
            inputs: vec![PathBuf::from("in/a.txt")],
            output_dir: PathBuf::from("out"),
            options: SynthesisOptions::default(),
            max_parallelism: 4,
        }
        .with_parallelism(0);

        assert_eq!(batch.max_parallelism, 1);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.output_for(Path::new("in/a.txt")), PathBuf::from("out/a.wav"));
    }

    #[test]
    fn test_batch_result_stats() {
        let result = BatchSynthesisResult {
            succeeded: vec![BatchItem {
                input: PathBuf::from("a.txt"),
                output: PathBuf::from("a.wav"),
                duration_secs: 1.5,
            }],
            failed: vec![(PathBuf::from("b.txt"), "error".to_string())],
            total_time_ms: 10,
        };
        assert_eq!(result.success_rate(), 0.5);
        assert_eq!(result.total_duration(), 1.5);
        assert_eq!(BatchSynthesisResult::default().success_rate(), 1.0);
    }

    #[test]
    fn test_from_directory_filters_txt() {
        let dir = std::env::temp_dir().join(format!("sdkwork_voiceover_batch_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("b.txt"), "two").unwrap();
        std::fs::write(dir.join("a.txt"), "one").unwrap();
        std::fs::write(dir.join("notes.md"), "skip").unwrap();

        let batch = BatchSynthesisRequest::from_directory(&dir, dir.join("out")).unwrap();
        let names: Vec<_> = batch
            .inputs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        std::fs::remove_dir_all(&dir).ok();
    }
}
