//! Plain-text tables for terminal output

use super::format_score;
use crate::models::{Course, Gradebook, ReviewQueue, Submission};
use std::fmt;

/// Column-aligned text table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextTable {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TextTable {
    pub fn new(title: impl Into<String>, headers: &[&str]) -> Self {
        Self {
            title: title.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row, padding or truncating it to the header width
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }
        widths
    }
}

fn write_line(f: &mut fmt::Formatter<'_>, cells: &[String], widths: &[usize]) -> fmt::Result {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &w)| format!("{:<w$}", cell, w = w))
        .collect();
    writeln!(f, "{}", padded.join("  ").trim_end())
}

impl fmt::Display for TextTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.widths();
        if !self.title.is_empty() {
            writeln!(f, "{}", self.title)?;
        }
        write_line(f, &self.headers, &widths)?;
        let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
        writeln!(f, "{}", rule.join("  "))?;
        for row in &self.rows {
            write_line(f, row, &widths)?;
        }
        Ok(())
    }
}

fn score_or_dash(score: Option<f64>) -> String {
    score.map(format_score).unwrap_or_else(|| "-".to_string())
}

pub fn course_table(course: &Course) -> TextTable {
    let teacher_view = course.has_sections();
    let headers: &[&str] = if teacher_view {
        &["#", "Title", "Section", "Max", "Deadline"]
    } else {
        &["#", "Title", "Score", "Status", "Deadline"]
    };

    let mut table = TextTable::new(course.display_title(), headers);
    for (i, task) in course.tasks.iter().enumerate() {
        let deadline = task
            .deadline
            .map(|d| d.format("%d.%m.%Y %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let row = if teacher_view {
            vec![
                (i + 1).to_string(),
                task.title.clone(),
                task.section.clone(),
                score_or_dash(task.max_score),
                deadline,
            ]
        } else {
            vec![
                (i + 1).to_string(),
                task.title.clone(),
                score_or_dash(task.score),
                task.status.clone(),
                deadline,
            ]
        };
        table.push_row(row);
    }
    table
}

pub fn queue_table(queue: &ReviewQueue) -> TextTable {
    let mut table = TextTable::new(
        format!("Review queue: course {} ({} entries)", queue.course_id, queue.entries.len()),
        &["#", "Student", "Task", "Status", "Reviewer", "Updated", "Grade"],
    );
    for (i, e) in queue.entries.iter().enumerate() {
        table.push_row(vec![
            (i + 1).to_string(),
            e.student_name.clone(),
            e.task_title.clone(),
            e.status_name.clone(),
            e.responsible_name.clone(),
            e.update_time.clone(),
            e.mark.clone(),
        ]);
    }
    table
}

/// One table per gradebook group
pub fn gradebook_tables(gradebook: &Gradebook) -> Vec<TextTable> {
    gradebook
        .groups
        .iter()
        .map(|group| {
            let mut title = group.group_name.clone();
            if !group.teacher_name.is_empty() {
                title.push_str(&format!(" ({})", group.teacher_name));
            }

            let mut headers = vec!["Student"];
            headers.extend(group.task_titles.iter().map(String::as_str));
            headers.push("Total");

            let mut table = TextTable::new(title, &headers);
            for entry in &group.entries {
                let mut row = vec![entry.student_name.clone()];
                row.extend(
                    group
                        .task_titles
                        .iter()
                        .map(|t| score_or_dash(entry.scores.get(t).copied())),
                );
                row.push(format_score(entry.total_score));
                table.push_row(row);
            }
            table
        })
        .collect()
}

/// Short multi-line summary of a submission and its thread
pub fn submission_summary(submission: &Submission) -> String {
    let mut out = format!(
        "Issue {}: {} / {}\n",
        submission.issue_id, submission.task_title, submission.student_name
    );
    out.push_str(&format!(
        "Status: {}  Grade: {}/{}  Reviewer: {}\n",
        submission.status, submission.grade, submission.max_score, submission.reviewer_name
    ));

    let files = submission.files().count();
    let visible = submission.comments.iter().filter(|c| !c.is_system_event).count();
    out.push_str(&format!(
        "Comments: {}  Files: {}  Links: {}\n",
        visible,
        files,
        submission.links().count()
    ));
    out
}
