//! AI inference layer: prompt templating plus ONNX Runtime beam-search
//! generation for summarization and question answering.

pub mod decode;
pub mod params;
pub mod prompt;

#[cfg(feature = "onnx")]
mod generator;
#[cfg(feature = "onnx")]
pub use generator::T5Generator;

/// Capability interface for the two text operations.
///
/// Pipelines depend on this trait rather than on a concrete model so they can
/// be tested against a stub without loading weights.
pub trait NoteProcessor {
    /// Summarize a clinical note.
    fn summarize(&mut self, text: &str) -> anyhow::Result<String>;

    /// Answer a question about a single note.
    fn answer(&mut self, note: &str, question: &str) -> anyhow::Result<String>;
}
