//! Queue page parsing and AJAX row conversion

use super::selectors::*;
use super::{first, text_of};
use crate::models::{QueueEntry, QueueFilters, QueueRow};
use scraper::{ElementRef, Html, Selector};

/// Parses the options of the queue page's filter dialog
pub fn parse_queue_filters(html: &str) -> QueueFilters {
    let document = Html::parse_document(html);
    let Some(modal) = first(document.root_element(), &FILTER_MODAL) else {
        return QueueFilters::default();
    };

    QueueFilters {
        students: select_options(modal, "students"),
        tasks: select_options(modal, "task"),
        reviewers: select_options(modal, "responsible"),
        statuses: select_options(modal, "status_field"),
    }
}

fn select_options(modal: ElementRef<'_>, name: &str) -> Vec<(String, String)> {
    let Ok(selector) = Selector::parse(&format!("select[name=\"{}\"]", name)) else {
        return Vec::new();
    };
    let Some(select) = first(modal, &selector) else {
        return Vec::new();
    };

    select
        .select(&OPTION)
        .filter_map(|opt| {
            let value = opt.value().attr("value").unwrap_or_default();
            if value.is_empty() {
                None
            } else {
                Some((value.to_string(), text_of(opt)))
            }
        })
        .collect()
}

/// Converts one AJAX row into a queue entry
pub fn queue_entry_from_row(row: QueueRow) -> QueueEntry {
    QueueEntry {
        student_name: row.student_name,
        student_url: row.student_url,
        task_title: row.task_title,
        update_time: row.update_time,
        mark: row.mark,
        status_color: if row.status_color.is_empty() {
            "default".to_string()
        } else {
            row.status_color
        },
        status_name: row.status_name,
        responsible_name: row.responsible_name,
        responsible_url: row.responsible_url,
        has_issue_access: row.has_issue_access,
        issue_url: row.issue_url,
    }
}
