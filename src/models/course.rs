use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A task listed on a course page
///
/// Which optional fields are populated depends on the page layout: the
/// student view fills `score`, `status`, `submit_url` and `description`,
/// the teacher view fills `max_score`, `section` and `edit_url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: u64,
    pub title: String,

    /// Raw description markup
    pub description: Option<String>,

    /// Deadline in the site's local time
    pub deadline: Option<NaiveDateTime>,

    pub score: Option<f64>,
    pub max_score: Option<f64>,
    pub status: String,

    /// Section header; empty in the student view
    pub section: String,

    pub edit_url: Option<String>,
    pub submit_url: Option<String>,
}

impl Task {
    /// Creates a task with only the id and title set
    pub fn new(task_id: u64, title: impl Into<String>) -> Self {
        Self {
            task_id,
            title: title.into(),
            description: None,
            deadline: None,
            score: None,
            max_score: None,
            status: String::new(),
            section: String::new(),
            edit_url: None,
            submit_url: None,
        }
    }

    /// Returns true if the task was parsed from the teacher layout
    pub fn is_teacher_view(&self) -> bool {
        !self.section.is_empty() || self.max_score.is_some() || self.edit_url.is_some()
    }
}

/// A course with its teachers and tasks
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Course {
    pub course_id: u64,
    pub title: String,

    /// Teacher names in page order
    pub teachers: Vec<String>,

    pub tasks: Vec<Task>,
}

impl Course {
    /// Creates an empty course record
    pub fn new(course_id: u64) -> Self {
        Self {
            course_id,
            ..Self::default()
        }
    }

    /// Returns true if any task carries a teacher-view section
    pub fn has_sections(&self) -> bool {
        self.tasks.iter().any(|t| !t.section.is_empty())
    }

    /// Display title, falling back to the numeric id
    pub fn display_title(&self) -> String {
        if self.title.is_empty() {
            format!("Course {}", self.course_id)
        } else {
            self.title.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_has_no_view_fields() {
        let task = Task::new(7, "Intro");
        assert_eq!(task.task_id, 7);
        assert!(!task.is_teacher_view());
        assert!(task.section.is_empty());
    }

    #[test]
    fn test_has_sections() {
        let mut course = Course::new(1);
        course.tasks.push(Task::new(1, "A"));
        assert!(!course.has_sections());

        let mut sectioned = Task::new(2, "B");
        sectioned.section = "Homework".to_string();
        course.tasks.push(sectioned);
        assert!(course.has_sections());
    }

    #[test]
    fn test_display_title_fallback() {
        let course = Course::new(42);
        assert_eq!(course.display_title(), "Course 42");
    }
}
