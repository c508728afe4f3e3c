//! Generation parameters and the model's `config.json`.

use std::fs::File;
use std::path::Path;

use anyhow::Context;
use clinote_core::Settings;
use serde::Deserialize;

/// Decoding parameters for a generation call.
///
/// Derived from [`Settings`]; summarization and Q&A share one budget. There
/// is no sampling, so generation is deterministic for fixed inputs.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub max_input_length: usize,
    pub max_output_length: usize,
    pub num_beams: usize,
    /// Exponent applied to hypothesis length when ranking finished beams.
    pub length_penalty: f32,
    /// Stop once `num_beams` hypotheses have reached the terminal token.
    pub early_stopping: bool,
}

impl GenerationParams {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_input_length: settings.max_input_length,
            max_output_length: settings.max_output_length,
            num_beams: settings.num_beams,
            length_penalty: 1.0,
            early_stopping: true,
        }
    }
}

/// Subset of the exported model's `config.json` needed for decoding.
///
/// Defaults match the T5 family: decoder start and pad are token 0, EOS is
/// token 1.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub decoder_start_token_id: i64,
    #[serde(default = "default_eos_token_id")]
    pub eos_token_id: i64,
    #[serde(default)]
    pub pad_token_id: i64,
}

fn default_eos_token_id() -> i64 {
    1
}

impl ModelConfig {
    /// Parse `config.json` from a model directory.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let path = model_dir.join("config.json");
        let file = File::open(&path).with_context(|| format!("open {}", path.display()))?;
        let config: Self = serde_json::from_reader(file)
            .with_context(|| format!("parse {}", path.display()))?;
        Ok(config)
    }
}
