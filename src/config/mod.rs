//! Configuration loading

mod pipeline_config;

pub use pipeline_config::{
    AlignmentConfig, DspConfig, EqPreset, InferenceSettings, LanguageModelConfig, PipelineConfig,
    StreamingConfig,
};
