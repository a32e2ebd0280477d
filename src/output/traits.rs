//! Exporter trait and output error types

use crate::models::{Course, Gradebook, ReviewQueue};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while writing exports
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Renders course data into one file format
///
/// Implementations only build the text; [`save_course`], [`save_queue`]
/// and [`save_gradebook`] pick the file name and write it.
pub trait Exporter {
    /// File extension without the dot
    fn extension(&self) -> &'static str;

    fn render_course(&self, course: &Course) -> OutputResult<String>;

    fn render_queue(&self, queue: &ReviewQueue) -> OutputResult<String>;

    fn render_gradebook(&self, gradebook: &Gradebook) -> OutputResult<String>;
}

/// Writes `<stem>.<extension>` into `output_dir`, creating it if needed
pub(crate) fn write_export(
    output_dir: &Path,
    stem: &str,
    extension: &str,
    content: &str,
) -> OutputResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(format!("{}.{}", stem, extension));
    std::fs::write(&path, content)?;
    tracing::debug!("Wrote {}", path.display());
    Ok(path)
}

/// Writes `course_<id>.<ext>` into `output_dir`
pub fn save_course(exporter: &dyn Exporter, course: &Course, output_dir: &Path) -> OutputResult<PathBuf> {
    let content = exporter.render_course(course)?;
    write_export(
        output_dir,
        &format!("course_{}", course.course_id),
        exporter.extension(),
        &content,
    )
}

/// Writes `queue_<id>.<ext>` into `output_dir`
pub fn save_queue(exporter: &dyn Exporter, queue: &ReviewQueue, output_dir: &Path) -> OutputResult<PathBuf> {
    let content = exporter.render_queue(queue)?;
    write_export(
        output_dir,
        &format!("queue_{}", queue.course_id),
        exporter.extension(),
        &content,
    )
}

/// Writes `gradebook_<id>.<ext>` into `output_dir`
pub fn save_gradebook(
    exporter: &dyn Exporter,
    gradebook: &Gradebook,
    output_dir: &Path,
) -> OutputResult<PathBuf> {
    let content = exporter.render_gradebook(gradebook)?;
    write_export(
        output_dir,
        &format!("gradebook_{}", gradebook.course_id),
        exporter.extension(),
        &content,
    )
}
