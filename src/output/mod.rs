//! Exporters for courses, review queues and gradebooks
//!
//! This module handles:
//! - JSON, Markdown and CSV files named `<kind>_<course id>.<ext>`
//! - Plain-text tables for terminal display
//! - Batch download of the files attached to submissions

mod csv;
mod files;
mod json;
mod markdown;
mod table;
mod traits;

pub use self::csv::{CsvExporter, COURSE_STUDENT_COLUMNS, COURSE_TEACHER_COLUMNS, QUEUE_COLUMNS, SUBMISSION_COLUMNS};
pub use self::csv::save_submissions_csv;
pub use files::{download_submission_files, sanitize_file_name};
pub use json::JsonExporter;
pub use markdown::MarkdownExporter;
pub use table::{course_table, gradebook_tables, queue_table, submission_summary, TextTable};
pub use traits::{save_course, save_gradebook, save_queue, Exporter, OutputError, OutputResult};

/// Formats a score the way the site shows it: always with a fractional part
pub(crate) fn format_score(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}
