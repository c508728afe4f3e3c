//! Q&A pipeline: one answer call on a single note/question pair.

use std::io::Write;

use clinote_ai::NoteProcessor;

/// Answer a question about one note and print note, question, and answer.
pub fn run(
    processor: &mut dyn NoteProcessor,
    note: &str,
    question: &str,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let answer = processor.answer(note, question)?;

    writeln!(out)?;
    writeln!(out, "Note: {note}")?;
    writeln!(out, "Question: {question}")?;
    writeln!(out, "Answer: {answer}")?;
    Ok(())
}
