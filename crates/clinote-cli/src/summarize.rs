//! Summarization pipeline: read the notes CSV, summarize each row in order,
//! write the augmented CSV, and print a short preview.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, LargeStringArray, StringArray, StringBuilder, UInt64Array};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use clinote_ai::NoteProcessor;
use clinote_core::{NOTE_COLUMN, PipelineError, SUMMARY_COLUMN, schema, table};

const PREVIEW_ROWS: usize = 5;

/// Run the full pipeline: read CSV → summarize row by row → write CSV.
///
/// Fail-fast: the first failed generation call aborts the run and no output
/// file is written.
pub fn run(processor: &mut dyn NoteProcessor, input: &Path, output: &Path) -> anyhow::Result<()> {
    eprintln!("Loading data from: {}", input.display());
    let (source_schema, batches) = table::read_csv(input)?;

    if source_schema.index_of(NOTE_COLUMN).is_err() {
        return Err(PipelineError::MissingColumn(NOTE_COLUMN).into());
    }

    let total: usize = batches.iter().map(|b| b.num_rows()).sum();
    eprintln!("Starting summarization of {total} notes...");

    let output_schema = schema::summarized_schema(&source_schema);
    let mut output_batches = Vec::with_capacity(batches.len().max(1));
    let mut processed = 0usize;
    let mut next_row_id = 0u64;

    for batch in &batches {
        let notes = extract_notes(batch)?;

        // Strictly sequential, one generation call per row.
        let mut summaries = StringBuilder::new();
        for note in &notes {
            summaries.append_value(processor.summarize(note)?);
            processed += 1;
            eprint!("\r  Summarized {processed}/{total}");
        }

        output_batches.push(augment_batch(
            batch,
            &output_schema,
            summaries.finish(),
            &mut next_row_id,
        )?);
    }
    if total > 0 {
        eprintln!();
    }

    // Zero data rows still produce a header-only output file.
    if output_batches.is_empty() {
        output_batches.push(RecordBatch::new_empty(output_schema.clone()));
    }

    table::write_csv(output, &output_batches)?;
    eprintln!("Results saved to: {}", output.display());

    println!("\n--- Sample Summaries ---");
    println!("{}", preview(&output_batches)?);
    println!("------------------------");

    Ok(())
}

/// Extract note strings from a batch's note column. A null note passes
/// through as an empty string; the model decides what to do with it.
fn extract_notes(batch: &RecordBatch) -> anyhow::Result<Vec<String>> {
    let col = batch
        .column_by_name(NOTE_COLUMN)
        .ok_or(PipelineError::MissingColumn(NOTE_COLUMN))?;

    let values = if let Some(arr) = col.as_any().downcast_ref::<StringArray>() {
        (0..arr.len())
            .map(|i| if arr.is_null(i) { String::new() } else { arr.value(i).to_string() })
            .collect()
    } else if let Some(arr) = col.as_any().downcast_ref::<LargeStringArray>() {
        (0..arr.len())
            .map(|i| if arr.is_null(i) { String::new() } else { arr.value(i).to_string() })
            .collect()
    } else {
        anyhow::bail!(
            "'{NOTE_COLUMN}' column is not text: {:?}",
            col.data_type()
        );
    };
    Ok(values)
}

/// Rebuild a batch with a leading row-index column and a trailing summary
/// column; every source column is carried over unchanged.
fn augment_batch(
    batch: &RecordBatch,
    output_schema: &SchemaRef,
    summaries: StringArray,
    next_row_id: &mut u64,
) -> anyhow::Result<RecordBatch> {
    let n = batch.num_rows() as u64;
    let row_ids: Vec<u64> = (*next_row_id..*next_row_id + n).collect();
    *next_row_id += n;

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns() + 2);
    columns.push(Arc::new(UInt64Array::from(row_ids)));
    columns.extend(batch.columns().iter().cloned());
    columns.push(Arc::new(summaries));

    Ok(RecordBatch::try_new(output_schema.clone(), columns)?)
}

/// Format the first few note/summary pairs for operator sanity-checking.
fn preview(batches: &[RecordBatch]) -> anyhow::Result<String> {
    let first = &batches[0];
    let shown = first.slice(0, first.num_rows().min(PREVIEW_ROWS));

    let schema = shown.schema();
    let pairs = shown.project(&[
        schema.index_of(NOTE_COLUMN)?,
        schema.index_of(SUMMARY_COLUMN)?,
    ])?;

    Ok(pretty_format_batches(&[pairs])?.to_string())
}
