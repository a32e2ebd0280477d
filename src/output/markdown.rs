//! Markdown rendering
//!
//! Courses become a task table (or one table per section in the teacher
//! view) followed by task descriptions, queues become an entry table plus a
//! prose block per fetched submission, gradebooks become one table per group.

use super::format_score;
use super::traits::{Exporter, OutputResult};
use crate::models::{Course, Gradebook, ReviewQueue, Submission, Task};
use crate::parser::strip_html;

/// Markdown documents for reading and sharing
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownExporter;

fn md_deadline(task: &Task) -> String {
    task.deadline
        .map(|d| d.format("%H:%M %d-%m-%Y").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn md_optional_score(score: Option<f64>) -> String {
    score.map(format_score).unwrap_or_else(|| "-".to_string())
}

fn student_tasks(tasks: &[Task], md: &mut String) {
    md.push_str("| # | Title | Score | Status | Deadline |\n");
    md.push_str("|---|-------|------:|--------|----------|\n");
    for (i, task) in tasks.iter().enumerate() {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            i + 1,
            task.title,
            md_optional_score(task.score),
            task.status,
            md_deadline(task)
        ));
    }
    md.push('\n');

    for task in tasks {
        let Some(description) = task.description.as_deref().filter(|d| !d.is_empty()) else {
            continue;
        };
        md.push_str(&format!("### {}\n\n", task.title));
        md.push_str(&strip_html(description));
        md.push_str("\n\n");
    }
}

fn teacher_tasks(tasks: &[Task], md: &mut String) {
    // Sections keep the order of their first task
    let mut sections: Vec<(&str, Vec<&Task>)> = Vec::new();
    for task in tasks {
        let name = if task.section.is_empty() {
            "Unsorted"
        } else {
            task.section.as_str()
        };
        match sections.iter_mut().find(|(n, _)| *n == name) {
            Some((_, list)) => list.push(task),
            None => sections.push((name, vec![task])),
        }
    }

    for (name, section_tasks) in sections {
        md.push_str(&format!("## {}\n\n", name));
        md.push_str("| # | Title | Max Score | Deadline |\n");
        md.push_str("|---|-------|----------:|----------|\n");
        for (i, task) in section_tasks.iter().enumerate() {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                i + 1,
                task.title,
                md_optional_score(task.max_score),
                md_deadline(task)
            ));
        }
        md.push('\n');

        for task in section_tasks {
            if let Some(description) = task.description.as_deref().filter(|d| !d.is_empty()) {
                md.push_str(&format!("### {}\n\n{}\n\n", task.title, strip_html(description)));
            }
        }
    }
}

fn submission_block(sub: &Submission, md: &mut String) {
    md.push_str(&format!("### Issue {}: {}\n", sub.issue_id, sub.task_title));
    md.push_str(&format!("**Student:** {}  \n", sub.student_name));
    let reviewer = if sub.reviewer_name.is_empty() {
        "-"
    } else {
        sub.reviewer_name.as_str()
    };
    md.push_str(&format!("**Reviewer:** {}  \n", reviewer));
    md.push_str(&format!("**Status:** {}  \n", sub.status));
    md.push_str(&format!("**Grade:** {}/{}  \n", sub.grade, sub.max_score));
    md.push_str(&format!("**Deadline:** {}\n\n", sub.deadline));

    for (j, comment) in sub.comments.iter().enumerate() {
        let ts = comment
            .timestamp
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        let after = if comment.is_after_deadline {
            " [AFTER DEADLINE]"
        } else {
            ""
        };
        md.push_str(&format!("**{}. {}** ({}){}\n", j + 1, comment.author_name, ts, after));
        if !comment.content_html.is_empty() {
            md.push_str(&format!("> {}\n", strip_html(&comment.content_html)));
        }
        for file in &comment.files {
            md.push_str(&format!("  - File: {}\n", file.filename));
        }
        for link in &comment.links {
            md.push_str(&format!("  - Link: {}\n", link));
        }
        md.push('\n');
    }
}

impl Exporter for MarkdownExporter {
    fn extension(&self) -> &'static str {
        "md"
    }

    fn render_course(&self, course: &Course) -> OutputResult<String> {
        let mut md = String::new();
        md.push_str(&format!("# {}\n\n", course.display_title()));
        if !course.teachers.is_empty() {
            md.push_str(&format!("**Teachers:** {}\n\n", course.teachers.join(", ")));
        }

        if course.has_sections() {
            teacher_tasks(&course.tasks, &mut md);
        } else {
            student_tasks(&course.tasks, &mut md);
        }
        Ok(md)
    }

    fn render_queue(&self, queue: &ReviewQueue) -> OutputResult<String> {
        let mut md = String::new();
        md.push_str(&format!("# Review Queue - Course {}\n\n", queue.course_id));

        if !queue.entries.is_empty() {
            md.push_str("| # | Student | Task | Status | Reviewer | Updated | Grade |\n");
            md.push_str("|---|---------|------|--------|----------|---------|-------|\n");
            for (i, e) in queue.entries.iter().enumerate() {
                md.push_str(&format!(
                    "| {} | {} | {} | {} | {} | {} | {} |\n",
                    i + 1,
                    e.student_name,
                    e.task_title,
                    e.status_name,
                    e.responsible_name,
                    e.update_time,
                    e.mark
                ));
            }
            md.push('\n');
        }

        let submissions = queue.submissions_in_order();
        if !submissions.is_empty() {
            md.push_str("## Submissions\n\n");
            for sub in submissions {
                submission_block(sub, &mut md);
            }
        }
        Ok(md)
    }

    fn render_gradebook(&self, gradebook: &Gradebook) -> OutputResult<String> {
        let mut md = String::new();
        md.push_str(&format!("# Gradebook - Course {}\n\n", gradebook.course_id));

        for group in &gradebook.groups {
            if group.teacher_name.is_empty() {
                md.push_str(&format!("## {}\n\n", group.group_name));
            } else {
                md.push_str(&format!("## {} ({})\n\n", group.group_name, group.teacher_name));
            }

            md.push_str(&format!("| # | Student | {} | Total |\n", group.task_titles.join(" | ")));
            let numeric = vec!["------:"; group.task_titles.len()].join("|");
            md.push_str(&format!("|---|---------|{}|------:|\n", numeric));

            for (i, entry) in group.entries.iter().enumerate() {
                let scores: Vec<String> = group
                    .task_titles
                    .iter()
                    .map(|t| md_optional_score(entry.scores.get(t).copied()))
                    .collect();
                md.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    i + 1,
                    entry.student_name,
                    scores.join(" | "),
                    format_score(entry.total_score)
                ));
            }
            md.push('\n');
        }
        Ok(md)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Comment, GradebookEntry, GradebookGroup, QueueEntry};
    use chrono::NaiveDate;

    fn deadline() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 15)
            .unwrap()
            .and_hms_opt(23, 59, 0)
            .unwrap()
    }

    #[test]
    fn test_student_course() {
        let mut course = Course::new(1);
        course.title = "Python".to_string();
        course.teachers = vec!["Anna".to_string(), "Boris".to_string()];
        let mut task = Task::new(10, "HW 1");
        task.score = Some(8.0);
        task.status = "Зачтено".to_string();
        task.deadline = Some(deadline());
        task.description = Some("<p>Write <b>sort</b></p>".to_string());
        course.tasks.push(task);
        course.tasks.push(Task::new(11, "HW 2"));

        let md = MarkdownExporter.render_course(&course).unwrap();
        assert!(md.starts_with("# Python\n\n**Teachers:** Anna, Boris\n"));
        assert!(md.contains("| 1 | HW 1 | 8.0 | Зачтено | 23:59 15-03-2025 |"));
        assert!(md.contains("| 2 | HW 2 | - |  | - |"));
        assert!(md.contains("### HW 1\n\nWrite sort"));
        assert!(!md.contains("### HW 2"));
    }

    #[test]
    fn test_teacher_course_sections_keep_order() {
        let mut course = Course::new(2);
        for (id, section) in [(1, "Week 2"), (2, "Week 1"), (3, "Week 2"), (4, "")] {
            let mut task = Task::new(id, format!("T{}", id));
            task.section = section.to_string();
            task.max_score = Some(10.0);
            course.tasks.push(task);
        }

        let md = MarkdownExporter.render_course(&course).unwrap();
        let week2 = md.find("## Week 2").unwrap();
        let week1 = md.find("## Week 1").unwrap();
        let unsorted = md.find("## Unsorted").unwrap();
        assert!(week2 < week1 && week1 < unsorted);
        assert!(md.contains("| 2 | T3 | 10.0 | - |"));
    }

    #[test]
    fn test_queue_with_submission() {
        let entry = QueueEntry {
            student_name: "Ivan".to_string(),
            task_title: "HW 1".to_string(),
            status_name: "На проверке".to_string(),
            issue_url: "/issue/5".to_string(),
            has_issue_access: true,
            ..QueueEntry::default()
        };
        let mut queue = ReviewQueue::new(3, vec![entry]);
        queue.submissions.insert(
            "/issue/5".to_string(),
            Submission {
                issue_id: 5,
                task_title: "HW 1".to_string(),
                student_name: "Ivan".to_string(),
                grade: "7".to_string(),
                max_score: "10".to_string(),
                comments: vec![Comment {
                    author_name: "Ivan".to_string(),
                    content_html: "<p>Done</p>".to_string(),
                    links: vec!["https://github.com/ivan/hw".to_string()],
                    is_after_deadline: true,
                    ..Comment::default()
                }],
                ..Submission::default()
            },
        );

        let md = MarkdownExporter.render_queue(&queue).unwrap();
        assert!(md.contains("# Review Queue - Course 3"));
        assert!(md.contains("| 1 | Ivan | HW 1 | На проверке |"));
        assert!(md.contains("### Issue 5: HW 1"));
        assert!(md.contains("**Reviewer:** -  "));
        assert!(md.contains("**Grade:** 7/10  "));
        assert!(md.contains("**1. Ivan** (-) [AFTER DEADLINE]"));
        assert!(md.contains("> Done"));
        assert!(md.contains("  - Link: https://github.com/ivan/hw"));
    }

    #[test]
    fn test_gradebook_tables() {
        let mut entry = GradebookEntry {
            student_name: "Ivan".to_string(),
            total_score: 15.0,
            ..GradebookEntry::default()
        };
        entry.scores.insert("HW 1".to_string(), 10.0);
        let gradebook = Gradebook {
            course_id: 4,
            groups: vec![GradebookGroup {
                group_name: "Group 231".to_string(),
                teacher_name: "Anna".to_string(),
                task_titles: vec!["HW 1".to_string(), "HW 2".to_string()],
                entries: vec![entry],
                ..GradebookGroup::default()
            }],
        };

        let md = MarkdownExporter.render_gradebook(&gradebook).unwrap();
        assert!(md.contains("## Group 231 (Anna)"));
        assert!(md.contains("| # | Student | HW 1 | HW 2 | Total |"));
        assert!(md.contains("|---|---------|------:|------:|------:|"));
        assert!(md.contains("| 1 | Ivan | 10.0 | - | 15.0 |"));
    }
}
