//! HTML parsers for anytask pages
//!
//! Every parser takes a full page and returns a typed record. They never
//! fail: a missing element turns into an empty field, never an error.
//!
//! # Example
//!
//! ```
//! use anytask_scraper::parser::parse_course_page;
//!
//! let course = parse_course_page("<html><body></body></html>", 42);
//! assert_eq!(course.course_id, 42);
//! assert!(course.tasks.is_empty());
//! ```

mod course;
mod gradebook;
mod queue;
mod selectors;
mod submission;
mod text;

pub use course::{parse_course_page, parse_task_edit_page};
pub use gradebook::parse_gradebook_page;
pub use queue::{queue_entry_from_row, parse_queue_filters};
pub use submission::parse_submission_page;
pub use text::{
    extract_csrf_from_login_page, extract_csrf_from_queue_page, extract_issue_id_from_breadcrumb,
    extract_urls_from_html, format_student_folder, parse_comment_timestamp,
    parse_comment_timestamp_in_year, parse_deadline, parse_float, strip_html,
};

use scraper::{ElementRef, Selector};

/// Text of an element with each piece trimmed and concatenated
fn text_of(element: ElementRef<'_>) -> String {
    element.text().map(str::trim).collect()
}

/// Text of an element, ignoring anything inside the named descendant tags
fn text_without(element: ElementRef<'_>, skipped_tags: &[&str]) -> String {
    let root = element.id();
    let mut out = String::new();

    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let inside_skipped = node
            .ancestors()
            .take_while(|a| a.id() != root)
            .filter_map(ElementRef::wrap)
            .any(|a| skipped_tags.contains(&a.value().name()));
        if !inside_skipped {
            out.push_str(text.trim());
        }
    }

    out
}

/// First descendant matching a selector
fn first<'a>(element: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    element.select(selector).next()
}

/// Direct child elements with the given tag name
fn child_elements<'a>(element: ElementRef<'a>, tag: &'a str) -> impl Iterator<Item = ElementRef<'a>> {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |child| child.value().name() == tag)
}

fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

fn attr(element: ElementRef<'_>, name: &str) -> String {
    element.value().attr(name).unwrap_or_default().to_string()
}
