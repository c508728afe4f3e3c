pub mod config;
pub mod error;
pub mod schema;
pub mod table;

pub use config::Settings;
pub use error::PipelineError;
pub use schema::{NOTE_COLUMN, ROW_ID_COLUMN, SUMMARY_COLUMN};
