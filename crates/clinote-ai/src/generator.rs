//! ONNX Runtime generation pipeline for T5-style seq2seq models.
//!
//! The model directory must contain `encoder_model.onnx`,
//! `decoder_model.onnx`, `tokenizer.json`, and `config.json` (the layout
//! produced by an optimum export of e.g. t5-small).

use std::path::Path;

use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::info;

use clinote_core::Settings;

use crate::decode::BeamSearch;
use crate::params::{GenerationParams, ModelConfig};
use crate::{NoteProcessor, prompt};

/// Seq2seq text generator using ONNX Runtime.
///
/// Holds one encoder and one decoder session plus the tokenizer; built once
/// and reused for every call. Execution providers are chosen at session
/// build, so an accelerator is used when one is available.
pub struct T5Generator {
    encoder: Session,
    decoder: Session,
    tokenizer: Tokenizer,
    params: GenerationParams,
    config: ModelConfig,
}

impl T5Generator {
    /// Load an exported seq2seq model from a directory. Any failure here is
    /// fatal to the process; there is no fallback model.
    pub fn load(model_dir: &Path, settings: &Settings) -> anyhow::Result<Self> {
        let encoder_path = model_dir.join("encoder_model.onnx");
        let decoder_path = model_dir.join("decoder_model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        anyhow::ensure!(
            encoder_path.exists(),
            "encoder_model.onnx not found in {model_dir:?}"
        );
        anyhow::ensure!(
            decoder_path.exists(),
            "decoder_model.onnx not found in {model_dir:?}"
        );
        anyhow::ensure!(
            tokenizer_path.exists(),
            "tokenizer.json not found in {model_dir:?}"
        );

        let encoder = Session::builder()?.commit_from_file(&encoder_path)?;
        let decoder = Session::builder()?.commit_from_file(&decoder_path)?;

        let config = ModelConfig::load(model_dir)?;
        let params = GenerationParams::from_settings(settings);

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;

        // Input beyond the budget is silently dropped, not rejected.
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: params.max_input_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("set truncation: {e}"))?;

        info!(
            model = %model_dir.display(),
            num_beams = params.num_beams,
            max_output_length = params.max_output_length,
            "loaded seq2seq model"
        );
        Ok(Self {
            encoder,
            decoder,
            tokenizer,
            params,
            config,
        })
    }

    /// Generate text for a fully templated prompt: encode, beam-search over
    /// the decoder, decode with special tokens stripped.
    pub fn generate(&mut self, text: &str) -> anyhow::Result<String> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let src_len = input_ids.len();
        anyhow::ensure!(src_len > 0, "tokenizer produced an empty encoding");

        // Encoder runs once per call; its states are tiled across beams.
        let (hidden, hidden_dim) = self.run_encoder(&input_ids, &attention_mask)?;

        let mut search = BeamSearch::new(
            self.params.num_beams,
            self.params.max_output_length,
            self.config.decoder_start_token_id,
            self.config.eos_token_id,
            self.params.length_penalty,
            self.params.early_stopping,
        );

        while !search.is_done() {
            let rows = search.live().len();
            let cur_len = search.live()[0].tokens.len();

            let mut decoder_ids = Vec::with_capacity(rows * cur_len);
            for hyp in search.live() {
                decoder_ids.extend_from_slice(&hyp.tokens);
            }

            let mut encoder_states = Vec::with_capacity(rows * hidden.len());
            let mut encoder_mask = Vec::with_capacity(rows * src_len);
            for _ in 0..rows {
                encoder_states.extend_from_slice(&hidden);
                encoder_mask.extend_from_slice(&attention_mask);
            }

            let ids_tensor = Tensor::from_array((
                [rows as i64, cur_len as i64],
                decoder_ids.into_boxed_slice(),
            ))?;
            let mask_tensor = Tensor::from_array((
                [rows as i64, src_len as i64],
                encoder_mask.into_boxed_slice(),
            ))?;
            let states_tensor = Tensor::from_array((
                [rows as i64, src_len as i64, hidden_dim as i64],
                encoder_states.into_boxed_slice(),
            ))?;

            let outputs = self.decoder.run(ort::inputs![
                "input_ids" => ids_tensor,
                "encoder_attention_mask" => mask_tensor,
                "encoder_hidden_states" => states_tensor,
            ])?;

            // Logits: [rows, cur_len, vocab]; only the last position matters.
            let (logits_shape, logits) = outputs[0].try_extract_tensor::<f32>()?;
            let dims: &[i64] = logits_shape;
            anyhow::ensure!(
                dims.len() == 3 && dims[0] as usize == rows,
                "unexpected decoder output shape: {dims:?}, expected [{rows}, {cur_len}, vocab]"
            );
            let positions = dims[1] as usize;
            let vocab = dims[2] as usize;

            let mut last = Vec::with_capacity(rows * vocab);
            for row in 0..rows {
                let offset = (row * positions + (positions - 1)) * vocab;
                last.extend_from_slice(&logits[offset..offset + vocab]);
            }

            search.step(&last, vocab);
        }

        let tokens: Vec<u32> = search.into_best().iter().map(|&t| t as u32).collect();
        let output = self
            .tokenizer
            .decode(&tokens, true)
            .map_err(|e| anyhow::anyhow!("decode: {e}"))?;
        Ok(output)
    }

    /// Run the encoder on one sequence, returning flat hidden states
    /// `[src_len * hidden_dim]` and the hidden dimension.
    fn run_encoder(
        &mut self,
        input_ids: &[i64],
        attention_mask: &[i64],
    ) -> anyhow::Result<(Vec<f32>, usize)> {
        let src_len = input_ids.len();
        let shape = [1i64, src_len as i64];

        let ids_tensor = Tensor::from_array((shape, input_ids.to_vec().into_boxed_slice()))?;
        let mask_tensor = Tensor::from_array((shape, attention_mask.to_vec().into_boxed_slice()))?;

        let outputs = self.encoder.run(ort::inputs![
            "input_ids" => ids_tensor,
            "attention_mask" => mask_tensor,
        ])?;

        let (hidden_shape, hidden) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: &[i64] = hidden_shape;
        anyhow::ensure!(
            dims.len() == 3 && dims[0] == 1 && dims[1] as usize == src_len,
            "unexpected encoder output shape: {dims:?}, expected [1, {src_len}, hidden]"
        );
        Ok((hidden.to_vec(), dims[2] as usize))
    }
}

impl NoteProcessor for T5Generator {
    fn summarize(&mut self, text: &str) -> anyhow::Result<String> {
        self.generate(&prompt::summarize(text))
    }

    fn answer(&mut self, note: &str, question: &str) -> anyhow::Result<String> {
        self.generate(&prompt::answer(question, note))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn model_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("models")
            .join("t5-small")
    }

    /// Tests that need weights skip when the export is not present, so the
    /// suite stays green on machines without the model. Download with:
    ///   optimum-cli export onnx --model t5-small models/t5-small
    fn try_model_dir() -> Option<PathBuf> {
        let dir = model_dir();
        if dir.join("encoder_model.onnx").exists() {
            Some(dir)
        } else {
            eprintln!("skipping: model not found at {}", dir.display());
            None
        }
    }

    fn small_settings(dir: &Path) -> Settings {
        Settings {
            model_dir: dir.to_path_buf(),
            max_output_length: 24,
            num_beams: 2,
            ..Settings::default()
        }
    }

    #[test]
    fn summarize_produces_nonempty_text() {
        let Some(dir) = try_model_dir() else { return };
        let mut generator = T5Generator::load(&dir, &small_settings(&dir)).unwrap();
        let summary = generator
            .summarize("Patient presents with mild fever and cough. Advised rest and fluids.")
            .unwrap();
        assert!(!summary.trim().is_empty());
    }

    #[test]
    fn generation_is_idempotent() {
        let Some(dir) = try_model_dir() else { return };
        let mut generator = T5Generator::load(&dir, &small_settings(&dir)).unwrap();
        let note = "Patient has a broken left arm.";
        let a = generator.answer(note, "Which arm is broken?").unwrap();
        let b = generator.answer(note, "Which arm is broken?").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn encoding_is_truncated_to_budget() {
        let Some(dir) = try_model_dir() else { return };
        let settings = Settings {
            model_dir: dir.clone(),
            max_input_length: 16,
            max_output_length: 8,
            num_beams: 1,
            ..Settings::default()
        };
        let generator = T5Generator::load(&dir, &settings).unwrap();

        let long_input = "fever and cough ".repeat(100);
        let encoding = generator.tokenizer.encode(long_input, true).unwrap();
        assert!(encoding.get_ids().len() <= 16);
    }
}
