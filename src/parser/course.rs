//! Course page parsing
//!
//! The course page has two layouts. The teacher layout groups tasks under
//! `collapse_group_<n>` blocks with section headers; the student layout is a
//! flat list with per-task score, status and a collapsible description.

use super::selectors::*;
use super::text::{parse_deadline, parse_float};
use super::{attr, child_elements, first, text_of, text_without};
use crate::models::{Course, Task};
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;

static GROUP_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^collapse_group_\d+$").expect("group id pattern"));

static GROUP_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^collapse_group_\d+").expect("group prefix pattern"));

static TASK_COLLAPSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"collapse_(\d+)").expect("collapse pattern"));

static TASK_EDIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/task/edit/(\d+)").expect("task edit pattern"));

/// Parses a course page into a [`Course`]
///
/// # Arguments
///
/// * `html` - The full course page
/// * `course_id` - The id the page was requested for
pub fn parse_course_page(html: &str, course_id: u64) -> Course {
    tracing::debug!("Parsing course page for course {}", course_id);
    let document = Html::parse_document(html);
    let root = document.root_element();

    let mut course = Course {
        course_id,
        title: extract_course_title(root),
        teachers: extract_teachers(root),
        tasks: Vec::new(),
    };

    let Some(tasks_tab) = first(root, &TASKS_TAB) else {
        tracing::warn!("No tasks tab found for course {}", course_id);
        return course;
    };

    course.tasks = if is_teacher_view(tasks_tab) {
        parse_teacher_tasks(tasks_tab)
    } else {
        parse_student_tasks(tasks_tab)
    };

    tracing::debug!(
        "Parsed {} tasks for course {}",
        course.tasks.len(),
        course_id
    );
    course
}

/// A page is in teacher view when it contains a `collapse_group_<n>` block
fn is_teacher_view(tasks_tab: ElementRef<'_>) -> bool {
    tasks_tab
        .select(&GROUP_COLLAPSE)
        .any(|div| GROUP_ID_RE.is_match(div.value().id().unwrap_or_default()))
}

fn extract_course_title(root: ElementRef<'_>) -> String {
    first(root, &COURSE_TITLE)
        .map(|h5| text_without(h5, &["span"]))
        .unwrap_or_default()
}

fn extract_teachers(root: ElementRef<'_>) -> Vec<String> {
    root.select(&COURSE_TEACHERS).map(text_of).collect()
}

fn parse_student_tasks(tasks_tab: ElementRef<'_>) -> Vec<Task> {
    let Some(tasks_table) = first(tasks_tab, &TASKS_TABLE) else {
        return Vec::new();
    };

    let mut tasks = Vec::new();
    for row in tasks_table.select(&TASK_ROW) {
        let columns: Vec<ElementRef<'_>> = child_elements(row, "div").collect();
        if columns.len() < 4 {
            continue;
        }

        let (title, task_id) = match first(columns[0], &COLLAPSE_TOGGLE) {
            Some(link) => (text_of(link), task_id_from_collapse(link)),
            None => (text_of(columns[0]), 0),
        };

        let mut task = Task::new(task_id, title);
        task.score = parse_float(&text_of(columns[1]));
        task.status = first(columns[2], &SPAN_LABEL)
            .map(text_of)
            .unwrap_or_default();
        task.deadline = parse_deadline(&columns[3].text().collect::<String>());
        task.submit_url = columns
            .get(4)
            .and_then(|col| first(*col, &A_HREF))
            .map(|a| attr(a, "href"));
        if task_id != 0 {
            task.description = find_description(tasks_table, task_id);
        }

        tasks.push(task);
    }

    tasks
}

fn parse_teacher_tasks(tasks_tab: ElementRef<'_>) -> Vec<Task> {
    let Some(tasks_table) = first(tasks_tab, &TASKS_TABLE) else {
        return Vec::new();
    };

    let mut tasks = Vec::new();
    let groups = tasks_table
        .select(&GROUP_COLLAPSE)
        .filter(|div| GROUP_PREFIX_RE.is_match(div.value().id().unwrap_or_default()));

    for group in groups {
        let section = find_group_header(group);

        for row in group.select(&TASK_ROW) {
            let columns: Vec<ElementRef<'_>> = child_elements(row, "div").collect();
            if columns.len() < 4 {
                continue;
            }

            let edit_link = columns[1].select(&A_HREF).find(|a| {
                TASK_EDIT_RE.is_match(a.value().attr("href").unwrap_or_default())
            });
            let edit_url = edit_link.map(|a| attr(a, "href"));
            let task_id = edit_url
                .as_deref()
                .and_then(|href| TASK_EDIT_RE.captures(href))
                .and_then(|caps| caps[1].parse().ok())
                .unwrap_or(0);

            let mut task = Task::new(task_id, text_of(columns[0]));
            task.max_score = first(columns[2], &SPAN_LABEL).and_then(|s| parse_float(&text_of(s)));
            task.deadline = parse_deadline(&columns[3].text().collect::<String>());
            task.section = section.clone();
            task.edit_url = edit_url;

            tasks.push(task);
        }
    }

    tasks
}

/// Section header: the `h6` of the `div` preceding a group block, links removed
fn find_group_header(group: ElementRef<'_>) -> String {
    group
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| sibling.value().name() == "div")
        .and_then(|header| first(header, &H6))
        .map(|h6| text_without(h6, &["a"]))
        .unwrap_or_default()
}

fn task_id_from_collapse(link: ElementRef<'_>) -> u64 {
    TASK_COLLAPSE_RE
        .captures(link.value().attr("href").unwrap_or_default())
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}

fn find_description(tasks_table: ElementRef<'_>, task_id: u64) -> Option<String> {
    let target = format!("collapse_{}", task_id);
    tasks_table
        .select(&DIV)
        .find(|div| div.value().id() == Some(target.as_str()))
        .and_then(|collapse| first(collapse, &DIV))
        .map(|inner| inner.inner_html().trim().to_string())
}

/// Extracts the task description from a task edit page
pub fn parse_task_edit_page(html: &str) -> String {
    let document = Html::parse_document(html);
    let root = document.root_element();

    first(root, &TASK_TEXTAREA)
        .or_else(|| first(root, &CK_EDITOR))
        .map(|el| el.inner_html().trim().to_string())
        .unwrap_or_default()
}
