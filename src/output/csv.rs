//! CSV rendering with optional column subsets
//!
//! A column subset never reorders columns: the canonical order is kept and
//! names outside it are ignored.

use super::format_score;
use super::traits::{write_export, Exporter, OutputResult};
use crate::models::{Course, Gradebook, ReviewQueue, Submission};
use std::path::{Path, PathBuf};

pub const COURSE_STUDENT_COLUMNS: [&str; 5] = ["#", "Title", "Score", "Status", "Deadline"];
pub const COURSE_TEACHER_COLUMNS: [&str; 5] = ["#", "Title", "Section", "Max Score", "Deadline"];
pub const QUEUE_COLUMNS: [&str; 7] = ["#", "Student", "Task", "Status", "Reviewer", "Updated", "Grade"];
pub const SUBMISSION_COLUMNS: [&str; 9] = [
    "Issue ID",
    "Task",
    "Student",
    "Reviewer",
    "Status",
    "Grade",
    "Max Score",
    "Deadline",
    "Comments",
];

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Accumulates CSV text for a fixed set of selected columns
struct CsvTable {
    columns: Vec<String>,
    out: String,
}

impl CsvTable {
    fn new(all: &[String], wanted: Option<&[String]>) -> Self {
        let columns: Vec<String> = match wanted {
            Some(wanted) => all.iter().filter(|c| wanted.contains(c)).cloned().collect(),
            None => all.to_vec(),
        };
        let mut table = Self {
            columns,
            out: String::new(),
        };
        let header = table.columns.clone();
        table.push_line(header.iter().map(String::as_str));
        table
    }

    fn push_line<'a>(&mut self, cells: impl Iterator<Item = &'a str>) {
        let line: Vec<String> = cells.map(csv_quote).collect();
        self.out.push_str(&line.join(","));
        self.out.push('\n');
    }

    /// Adds a row; `value` maps a column name to its cell text
    fn push_row(&mut self, value: impl Fn(&str) -> String) {
        let cells: Vec<String> = self.columns.iter().map(|c| value(c)).collect();
        self.push_line(cells.iter().map(String::as_str));
    }

    fn finish(self) -> String {
        self.out
    }
}

fn owned(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

fn csv_deadline(deadline: Option<chrono::NaiveDateTime>) -> String {
    deadline
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

/// CSV tables, optionally restricted to a subset of columns
#[derive(Debug, Clone, Default)]
pub struct CsvExporter {
    columns: Option<Vec<String>>,
}

impl CsvExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts every table to the given column names
    pub fn with_columns(columns: Vec<String>) -> Self {
        Self {
            columns: Some(columns),
        }
    }

    fn wanted(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    /// Renders the submission detail table in queue order
    pub fn render_submissions(&self, submissions: &[&Submission]) -> String {
        let mut table = CsvTable::new(&owned(&SUBMISSION_COLUMNS), self.wanted());
        for sub in submissions {
            table.push_row(|column| match column {
                "Issue ID" => sub.issue_id.to_string(),
                "Task" => sub.task_title.clone(),
                "Student" => sub.student_name.clone(),
                "Reviewer" => sub.reviewer_name.clone(),
                "Status" => sub.status.clone(),
                "Grade" => sub.grade.clone(),
                "Max Score" => sub.max_score.clone(),
                "Deadline" => sub.deadline.clone(),
                "Comments" => sub.comments.len().to_string(),
                _ => String::new(),
            });
        }
        table.finish()
    }
}

impl Exporter for CsvExporter {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn render_course(&self, course: &Course) -> OutputResult<String> {
        let teacher_view = course.has_sections();
        let all = if teacher_view {
            owned(&COURSE_TEACHER_COLUMNS)
        } else {
            owned(&COURSE_STUDENT_COLUMNS)
        };

        let mut table = CsvTable::new(&all, self.wanted());
        for (i, task) in course.tasks.iter().enumerate() {
            table.push_row(|column| match column {
                "#" => (i + 1).to_string(),
                "Title" => task.title.clone(),
                "Section" => task.section.clone(),
                "Max Score" => task.max_score.map(format_score).unwrap_or_default(),
                "Score" => task.score.map(format_score).unwrap_or_default(),
                "Status" => task.status.clone(),
                "Deadline" => csv_deadline(task.deadline),
                _ => String::new(),
            });
        }
        Ok(table.finish())
    }

    fn render_queue(&self, queue: &ReviewQueue) -> OutputResult<String> {
        let mut table = CsvTable::new(&owned(&QUEUE_COLUMNS), self.wanted());
        for (i, e) in queue.entries.iter().enumerate() {
            table.push_row(|column| match column {
                "#" => (i + 1).to_string(),
                "Student" => e.student_name.clone(),
                "Task" => e.task_title.clone(),
                "Status" => e.status_name.clone(),
                "Reviewer" => e.responsible_name.clone(),
                "Updated" => e.update_time.clone(),
                "Grade" => e.mark.clone(),
                _ => String::new(),
            });
        }
        Ok(table.finish())
    }

    fn render_gradebook(&self, gradebook: &Gradebook) -> OutputResult<String> {
        let tasks = gradebook.all_task_titles();
        let mut all = owned(&["Group", "Student"]);
        all.extend(tasks.iter().cloned());
        all.push("Total".to_string());

        let mut table = CsvTable::new(&all, self.wanted());
        for group in &gradebook.groups {
            for entry in &group.entries {
                table.push_row(|column| match column {
                    "Group" => group.group_name.clone(),
                    "Student" => entry.student_name.clone(),
                    "Total" => format_score(entry.total_score),
                    task => entry.scores.get(task).copied().map(format_score).unwrap_or_default(),
                });
            }
        }
        Ok(table.finish())
    }
}

/// Writes `submissions_<course id>.csv` with the queue's fetched submissions
pub fn save_submissions_csv(
    exporter: &CsvExporter,
    queue: &ReviewQueue,
    output_dir: &Path,
) -> OutputResult<PathBuf> {
    let content = exporter.render_submissions(&queue.submissions_in_order());
    write_export(
        output_dir,
        &format!("submissions_{}", queue.course_id),
        "csv",
        &content,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GradebookEntry, GradebookGroup, QueueEntry, Task};
    use chrono::NaiveDate;

    #[test]
    fn test_csv_quote() {
        assert_eq!(csv_quote("plain"), "plain");
        assert_eq!(csv_quote("a,b"), "\"a,b\"");
        assert_eq!(csv_quote("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_student_course() {
        let mut course = Course::new(1);
        let mut task = Task::new(1, "HW 1, part 2");
        task.score = Some(7.5);
        task.status = "Зачтено".to_string();
        task.deadline = NaiveDate::from_ymd_opt(2025, 3, 15)
            .unwrap()
            .and_hms_opt(23, 59, 0);
        course.tasks.push(task);

        let csv = CsvExporter::new().render_course(&course).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "#,Title,Score,Status,Deadline");
        assert_eq!(lines[1], "1,\"HW 1, part 2\",7.5,Зачтено,2025-03-15 23:59");
    }

    #[test]
    fn test_teacher_course_columns_keep_canonical_order() {
        let mut course = Course::new(1);
        let mut task = Task::new(1, "HW 1");
        task.section = "Week 1".to_string();
        task.max_score = Some(10.0);
        course.tasks.push(task);

        let exporter = CsvExporter::with_columns(vec![
            "Max Score".to_string(),
            "Title".to_string(),
            "Bogus".to_string(),
        ]);
        let csv = exporter.render_course(&course).unwrap();
        assert_eq!(csv, "Title,Max Score\nHW 1,10.0\n");
    }

    #[test]
    fn test_queue() {
        let queue = ReviewQueue::new(
            2,
            vec![QueueEntry {
                student_name: "Ivan".to_string(),
                task_title: "HW 1".to_string(),
                status_name: "На проверке".to_string(),
                responsible_name: "Anna".to_string(),
                update_time: "06-02-2025".to_string(),
                mark: "0".to_string(),
                ..QueueEntry::default()
            }],
        );
        let csv = CsvExporter::new().render_queue(&queue).unwrap();
        assert_eq!(
            csv,
            "#,Student,Task,Status,Reviewer,Updated,Grade\n1,Ivan,HW 1,На проверке,Anna,06-02-2025,0\n"
        );
    }

    #[test]
    fn test_submissions() {
        let sub = Submission {
            issue_id: 42,
            task_title: "HW 1".to_string(),
            grade: "7".to_string(),
            max_score: "10".to_string(),
            comments: vec![Default::default(), Default::default()],
            ..Submission::default()
        };
        let exporter = CsvExporter::with_columns(vec![
            "Comments".to_string(),
            "Issue ID".to_string(),
            "Grade".to_string(),
        ]);
        assert_eq!(exporter.render_submissions(&[&sub]), "Issue ID,Grade,Comments\n42,7,2\n");
    }

    #[test]
    fn test_gradebook_union_of_tasks() {
        let mut ivan = GradebookEntry {
            student_name: "Ivan".to_string(),
            total_score: 12.0,
            ..GradebookEntry::default()
        };
        ivan.scores.insert("HW 1".to_string(), 10.0);
        ivan.scores.insert("HW 2".to_string(), 2.0);
        let mut olga = GradebookEntry {
            student_name: "Olga".to_string(),
            total_score: 3.0,
            ..GradebookEntry::default()
        };
        olga.scores.insert("HW 3".to_string(), 3.0);

        let gradebook = Gradebook {
            course_id: 1,
            groups: vec![
                GradebookGroup {
                    group_name: "A".to_string(),
                    task_titles: vec!["HW 1".to_string(), "HW 2".to_string()],
                    entries: vec![ivan],
                    ..GradebookGroup::default()
                },
                GradebookGroup {
                    group_name: "B".to_string(),
                    task_titles: vec!["HW 1".to_string(), "HW 3".to_string()],
                    entries: vec![olga],
                    ..GradebookGroup::default()
                },
            ],
        };

        let csv = CsvExporter::new().render_gradebook(&gradebook).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Group,Student,HW 1,HW 2,HW 3,Total");
        assert_eq!(lines[1], "A,Ivan,10.0,2.0,,12.0");
        assert_eq!(lines[2], "B,Olga,,,3.0,3.0");
    }
}
