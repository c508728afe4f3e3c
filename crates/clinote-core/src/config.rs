//! Process-wide settings, fixed at startup.
//!
//! Constructed once in `main` and passed explicitly into the generator and
//! pipelines, so tests can substitute values without touching shared state.

use std::path::PathBuf;

/// Immutable runtime settings.
///
/// Both tasks (summarization and Q&A) share the same input/output length
/// budgets and beam count.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory holding the exported model: `encoder_model.onnx`,
    /// `decoder_model.onnx`, `tokenizer.json`, `config.json`.
    pub model_dir: PathBuf,
    /// Default input CSV for the summarize command.
    pub input_path: PathBuf,
    /// Default output CSV for the summarize command.
    pub output_path: PathBuf,
    /// Token budget for the encoded prompt. Input beyond this is silently
    /// truncated, not rejected.
    pub max_input_length: usize,
    /// Token budget for generated output.
    pub max_output_length: usize,
    /// Beam count for beam-search decoding.
    pub num_beams: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models/t5-small"),
            input_path: PathBuf::from("data/clinical_notes.csv"),
            output_path: PathBuf::from("output/summarized_clinical_notes.csv"),
            max_input_length: 512,
            max_output_length: 150,
            num_beams: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_positive() {
        let s = Settings::default();
        assert!(s.max_input_length > 0);
        assert!(s.max_output_length > 0);
        assert!(s.num_beams > 0);
    }

    #[test]
    fn default_model_dir_is_t5_small() {
        let s = Settings::default();
        assert_eq!(s.model_dir, PathBuf::from("models/t5-small"));
    }
}
