//! Task prompt templates.
//!
//! A fixed prefix signals the desired task to the general-purpose model; the
//! same mechanics serve both operations.

/// Prompt for the summarization task.
pub fn summarize(text: &str) -> String {
    format!("summarize: {text}")
}

/// Prompt for the question-answering task. Embeds both the question and the
/// note, so the generated answer depends on both.
pub fn answer(question: &str, note: &str) -> String {
    format!("question: {question} context: {note}")
}
