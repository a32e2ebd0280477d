use super::traits::{Exporter, OutputResult};
use crate::models::{Course, Gradebook, ReviewQueue};

/// Pretty-printed JSON of the full records
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExporter;

impl Exporter for JsonExporter {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn render_course(&self, course: &Course) -> OutputResult<String> {
        Ok(serde_json::to_string_pretty(course)?)
    }

    fn render_queue(&self, queue: &ReviewQueue) -> OutputResult<String> {
        Ok(serde_json::to_string_pretty(queue)?)
    }

    fn render_gradebook(&self, gradebook: &Gradebook) -> OutputResult<String> {
        Ok(serde_json::to_string_pretty(gradebook)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Task;
    use crate::output::save_course;
    use tempfile::TempDir;

    #[test]
    fn test_course_json_keeps_unicode() {
        let mut course = Course::new(12);
        course.title = "Алгоритмы".to_string();
        course.tasks.push(Task::new(1, "Сортировки"));

        let json = JsonExporter.render_course(&course).unwrap();
        assert!(json.contains("Алгоритмы"));
        assert!(json.contains("\n  \"course_id\": 12"));

        let parsed: Course = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, course);
    }

    #[test]
    fn test_save_course_file_name() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("nested");
        let path = save_course(&JsonExporter, &Course::new(5), &out).unwrap();
        assert_eq!(path, out.join("course_5.json"));
        assert!(path.exists());
    }
}
