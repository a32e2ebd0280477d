//! Pattern-based extraction over raw page text
//!
//! Deadlines, comment timestamps, CSRF tokens, issue ids and bare URLs are
//! located with regular expressions rather than DOM queries.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;

static DEADLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{2}):(\d{2})\s+(\d{2})-(\d{2})-(\d{4})").expect("deadline pattern")
});

static COMMENT_TS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})\s+(\S+)\s+(\d{2}):(\d{2})").expect("timestamp pattern")
});

static LOGIN_CSRF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"name=['"]csrfmiddlewaretoken['"] value=['"]([^'"]+)['"]"#)
        .expect("login csrf pattern")
});

static QUEUE_CSRF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"csrfmiddlewaretoken["'\]]\s*[:=]\s*["']([^"']+)["']"#)
        .expect("queue csrf pattern")
});

static ISSUE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Issue:\s*(\d+)").expect("issue id pattern"));

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"']+"#).expect("url pattern"));

/// Month abbreviations used in comment timestamps
const RU_MONTHS: [(&str, u32); 12] = [
    ("Янв", 1),
    ("Фев", 2),
    ("Мар", 3),
    ("Апр", 4),
    ("Май", 5),
    ("Июн", 6),
    ("Июл", 7),
    ("Авг", 8),
    ("Сен", 9),
    ("Окт", 10),
    ("Ноя", 11),
    ("Дек", 12),
];

/// Parses the first `HH:MM DD-MM-YYYY` occurrence in `text`
///
/// # Example
///
/// ```
/// use anytask_scraper::parser::parse_deadline;
///
/// let deadline = parse_deadline("Deadline: 23:59 31-12-2024").unwrap();
/// assert_eq!(deadline.to_string(), "2024-12-31 23:59:00");
/// ```
pub fn parse_deadline(text: &str) -> Option<NaiveDateTime> {
    let caps = DEADLINE_RE.captures(text)?;
    let num = |i: usize| caps[i].parse::<u32>().ok();
    let year = caps[5].parse::<i32>().ok()?;
    NaiveDate::from_ymd_opt(year, num(4)?, num(3)?)?.and_hms_opt(num(1)?, num(2)?, 0)
}

/// Parses a comment timestamp such as `06 Фев 00:36` in the given year
///
/// The page omits the year, so the caller supplies it. An abbreviation
/// outside the month table yields `None`.
pub fn parse_comment_timestamp_in_year(text: &str, year: i32) -> Option<NaiveDateTime> {
    let caps = COMMENT_TS_RE.captures(text)?;
    let month = RU_MONTHS
        .iter()
        .find(|(name, _)| *name == &caps[2])
        .map(|(_, month)| *month)?;
    let day = caps[1].parse::<u32>().ok()?;
    let hour = caps[3].parse::<u32>().ok()?;
    let minute = caps[4].parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)
}

/// Parses a comment timestamp in the current local year
pub fn parse_comment_timestamp(text: &str) -> Option<NaiveDateTime> {
    parse_comment_timestamp_in_year(text, Local::now().year())
}

/// Extracts the CSRF token from the login form's hidden input
pub fn extract_csrf_from_login_page(html: &str) -> Option<String> {
    LOGIN_CSRF_RE.captures(html).map(|caps| caps[1].to_string())
}

/// Extracts the CSRF token assigned in the queue page's script
pub fn extract_csrf_from_queue_page(html: &str) -> Option<String> {
    QUEUE_CSRF_RE.captures(html).map(|caps| caps[1].to_string())
}

/// Extracts the issue id from the `Issue: <id>` breadcrumb
pub fn extract_issue_id_from_breadcrumb(html: &str) -> Option<u64> {
    ISSUE_ID_RE
        .captures(html)
        .and_then(|caps| caps[1].parse().ok())
}

/// Parses a float, returning `None` for anything unparsable
pub fn parse_float(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

/// Collects HTTP(S) links from comment markup
///
/// Anchor `href`s come first, then bare URLs from the rendered text;
/// duplicates keep their first position.
pub fn extract_urls_from_html(html: &str) -> Vec<String> {
    if html.trim().is_empty() {
        return Vec::new();
    }

    let fragment = Html::parse_fragment(html);
    let mut urls: Vec<String> = Vec::new();
    let mut push = |url: &str| {
        if !urls.iter().any(|u| u == url) {
            urls.push(url.to_string());
        }
    };

    for anchor in fragment.select(&super::selectors::A_HREF) {
        if let Some(href) = anchor.value().attr("href") {
            if href.starts_with("http") {
                push(href);
            }
        }
    }

    let text: String = fragment.root_element().text().collect();
    for found in URL_RE.find_iter(&text) {
        push(found.as_str());
    }

    urls
}

/// Strips markup, joining the remaining text pieces with single spaces
pub fn strip_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    fragment
        .root_element()
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Converts a student name into a folder name
pub fn format_student_folder(name: &str) -> String {
    name.trim().replace(' ', "_")
}
