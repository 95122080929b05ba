pub mod classify;
pub mod engine;
pub mod error;
pub mod io;
pub mod record;
pub mod run;

pub use classify::{classify, Classification};
pub use engine::{aggregate, annotate, process_csv_file, run_pipeline, PipelineOutput};
pub use error::PipelineError;
pub use io::{
    read_csv_file, read_csv_table, report_csv_string, table_from_json, write_report_csv,
    CSV_MIME, DOWNLOAD_FILE_NAME, REQUIRED_COLUMNS,
};
pub use record::{
    groups_view, value_text, AnnotatedRecord, AnnotatedTable, EntityType, Record, ReportGroup,
    Table, TableView,
};
pub use run::{RunErrorBody, RunId, RunInfo};
