//! Flat CSV read/write over Arrow record batches.
//!
//! The output file is overwritten wholesale on each run; there are no
//! incremental or append semantics.

use std::fs::File;
use std::io::Seek;
use std::path::Path;
use std::sync::Arc;

use arrow::csv::reader::Format;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use tracing::debug;

use crate::error::PipelineError;

/// Read a headered CSV file into record batches, inferring the schema from
/// the full file. The schema is returned separately so a file with zero data
/// rows still describes its columns.
pub fn read_csv(path: &Path) -> Result<(SchemaRef, Vec<RecordBatch>), PipelineError> {
    if !path.exists() {
        return Err(PipelineError::InputNotFound(path.to_path_buf()));
    }

    let mut file = File::open(path)?;
    let format = Format::default().with_header(true);
    let (schema, _) = format.infer_schema(&mut file, None)?;
    file.rewind()?;

    let schema = Arc::new(schema);
    let reader = ReaderBuilder::new(schema.clone())
        .with_format(format)
        .build(file)?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;

    debug!(path = %path.display(), batches = batches.len(), "read csv");
    Ok((schema, batches))
}

/// Write record batches to a headered CSV file, creating parent directories
/// as needed. An empty batch produces a header-only file.
pub fn write_csv(path: &Path, batches: &[RecordBatch]) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    for batch in batches {
        writer.write(batch)?;
    }

    debug!(path = %path.display(), "wrote csv");
    Ok(())
}
