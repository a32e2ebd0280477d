//! Gradebook page parsing

use super::selectors::*;
use super::text::parse_float;
use super::{attr, child_elements, first, has_class, text_of};
use crate::models::{Gradebook, GradebookEntry, GradebookGroup, StatusColor};
use regex::Regex;
use scraper::{ElementRef, Html};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static TABLE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"table_results_(\d+)").expect("table id pattern"));

static BACKGROUND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"background-color:\s*(#[0-9a-fA-F]+)").expect("background pattern")
});

/// Parses a gradebook page into a [`Gradebook`]
pub fn parse_gradebook_page(html: &str, course_id: u64) -> Gradebook {
    tracing::debug!("Parsing gradebook page for course {}", course_id);
    let document = Html::parse_document(html);

    let groups: Vec<GradebookGroup> = document
        .root_element()
        .select(&RESULTS_TABLE)
        .filter_map(parse_table)
        .collect();

    tracing::debug!(
        "Parsed {} gradebook groups for course {}",
        groups.len(),
        course_id
    );
    Gradebook { course_id, groups }
}

fn parse_table(table: ElementRef<'_>) -> Option<GradebookGroup> {
    let group_id = TABLE_ID_RE
        .captures(table.value().id().unwrap_or_default())
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0);

    let (group_name, teacher_name) = group_title(table);

    let header = first(table, &THEAD_ROW)?;
    let mut task_titles = Vec::new();
    let mut max_scores = BTreeMap::new();

    for th in header.select(&TH) {
        if !(has_class(th, "dom-number") && has_class(th, "word-wrap")) {
            continue;
        }
        let title = first(th, &A).map(text_of).unwrap_or_else(|| text_of(th));
        if let Some(max) = first(th, &LABEL_INVERSE).and_then(|s| parse_float(&text_of(s))) {
            max_scores.insert(title.clone(), max);
        }
        task_titles.push(title);
    }

    let entries = first(table, &TBODY)
        .map(|tbody| {
            child_elements(tbody, "tr")
                .filter_map(|tr| parse_row(tr, &task_titles))
                .collect()
        })
        .unwrap_or_default();

    Some(GradebookGroup {
        group_name,
        group_id,
        teacher_name,
        task_titles,
        max_scores,
        entries,
    })
}

/// Group name and teacher from the enclosing card's title links
fn group_title(table: ElementRef<'_>) -> (String, String) {
    let card = table
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "div" && has_class(*el, "card"));
    let Some(card) = card else {
        return (String::new(), String::new());
    };

    let links: Vec<ElementRef<'_>> = card.select(&CARD_TITLE_LINK).collect();
    let group_name = links.first().map(|a| text_of(*a)).unwrap_or_default();
    let teacher_name = if links.len() > 1 {
        links.last().map(|a| text_of(*a)).unwrap_or_default()
    } else {
        String::new()
    };
    (group_name, teacher_name)
}

fn parse_row(tr: ElementRef<'_>, task_titles: &[String]) -> Option<GradebookEntry> {
    let cells: Vec<ElementRef<'_>> = child_elements(tr, "td").collect();
    if cells.len() < 3 {
        return None;
    }

    let student = first(cells[1], &CARD_LINK)?;
    let mut entry = GradebookEntry {
        student_name: text_of(student).replace('\u{a0}', " "),
        student_url: attr(student, "href"),
        ..GradebookEntry::default()
    };

    for (title, cell) in task_titles.iter().zip(cells[2..].iter()) {
        if let Some(label) = first(*cell, &SPAN_LABEL) {
            let score = parse_float(&text_of(label)).unwrap_or(0.0);
            entry.scores.insert(title.clone(), score);
            let style = label.value().attr("style").unwrap_or_default();
            if let Some(caps) = BACKGROUND_RE.captures(style) {
                entry
                    .statuses
                    .insert(title.clone(), StatusColor::from_hex(&caps[1]));
            }
        }
        if let Some(link) = first(*cell, &A_HREF) {
            entry.issue_urls.insert(title.clone(), attr(link, "href"));
        }
    }

    entry.total_score = cells
        .iter()
        .find(|td| has_class(**td, "sum-score"))
        .and_then(|td| first(*td, &SPAN_LABEL))
        .and_then(|span| parse_float(&text_of(span)))
        .unwrap_or(0.0);

    Some(entry)
}
