//! Schema helpers for the clinical-notes table.

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema};

/// Required input column holding the free-text note.
pub const NOTE_COLUMN: &str = "clinical_note";
/// Output column added by the summarization pipeline.
pub const SUMMARY_COLUMN: &str = "summary";
/// Output row-index column.
pub const ROW_ID_COLUMN: &str = "row_id";

/// Build the output schema: a leading `row_id` index column, every source
/// field unchanged, and a trailing `summary` column.
pub fn summarized_schema(source: &Schema) -> Arc<Schema> {
    let mut fields: Vec<Field> = vec![Field::new(ROW_ID_COLUMN, DataType::UInt64, false)];
    fields.extend(source.fields().iter().map(|f| f.as_ref().clone()));
    fields.push(Field::new(SUMMARY_COLUMN, DataType::Utf8, false));
    Arc::new(Schema::new(fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_schema() -> Schema {
        Schema::new(vec![
            Field::new("patient_id", DataType::Int64, true),
            Field::new(NOTE_COLUMN, DataType::Utf8, true),
        ])
    }

    #[test]
    fn summarized_schema_appends_summary_and_row_id() {
        let out = summarized_schema(&source_schema());
        assert_eq!(out.fields().len(), 4);
        assert_eq!(out.field(0).name(), ROW_ID_COLUMN);
        assert_eq!(out.field(out.fields().len() - 1).name(), SUMMARY_COLUMN);
    }

    #[test]
    fn summarized_schema_preserves_source_fields() {
        let src = source_schema();
        let out = summarized_schema(&src);
        for field in src.fields() {
            let kept = out.field_with_name(field.name()).unwrap();
            assert_eq!(kept.data_type(), field.data_type());
        }
    }
}
