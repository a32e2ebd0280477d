//! Issue page parsing: metadata accordion and comment thread

use super::selectors::*;
use super::text::{extract_urls_from_html, parse_comment_timestamp};
use super::{attr, first, has_class, text_of};
use crate::models::{Comment, FileAttachment, Submission};
use scraper::{ElementRef, Html};

/// Parses an issue page into a [`Submission`]
///
/// # Arguments
///
/// * `html` - The full issue page
/// * `issue_id` - Issue id, usually taken from the page breadcrumb
pub fn parse_submission_page(html: &str, issue_id: u64) -> Submission {
    tracing::debug!("Parsing submission page for issue {}", issue_id);
    let document = Html::parse_document(html);
    let root = document.root_element();

    let mut submission = Submission {
        issue_id,
        ..Submission::default()
    };
    fill_metadata(root, &mut submission);
    submission.comments = parse_comment_thread(root);
    submission
}

fn fill_metadata(root: ElementRef<'_>, submission: &mut Submission) {
    let Some(accordion) = first(root, &ACCORDION) else {
        return;
    };

    for card in accordion.select(&CARD) {
        let (Some(label), Some(result)) = (
            first(card, &ACCORDION_LABEL),
            first(card, &ACCORDION_RESULT),
        ) else {
            continue;
        };

        let label_text = text_of(label);
        let label_text = label_text.trim_end_matches(':');
        let result_text = text_of(result);

        if label_text.contains("Задача") {
            submission.task_title = first(result, &TASK_DESCRIPTION_BTN)
                .map(text_of)
                .unwrap_or(result_text);
        } else if label_text.contains("Студент") {
            if let Some(user) = first(result, &USER_LINK) {
                submission.student_name = text_of(user);
                submission.student_url = attr(user, "href");
            }
        } else if label_text.contains("Проверяющий") {
            if let Some(user) = first(result, &USER_LINK) {
                submission.reviewer_name = text_of(user);
                submission.reviewer_url = attr(user, "href");
            }
        } else if label_text.contains("Статус") {
            submission.status = result_text;
        } else if label_text.contains("Оценка") {
            let parts: Vec<&str> = result_text.split("из").collect();
            if parts.len() == 2 {
                submission.grade = parts[0].trim().to_string();
                submission.max_score = parts[1].trim().to_string();
            } else {
                submission.grade = result_text;
            }
        } else if label_text.contains("Дата сдачи") {
            submission.deadline = result_text;
        }
    }
}

fn parse_comment_thread(root: ElementRef<'_>) -> Vec<Comment> {
    let Some(history) = first(root, &HISTORY) else {
        return Vec::new();
    };

    history
        .select(&LI)
        .filter_map(|li| first(li, &ROW))
        .map(parse_single_comment)
        .collect()
}

fn parse_single_comment(row: ElementRef<'_>) -> Comment {
    let author = first(row, &STRONG).and_then(|strong| first(strong, &CARD_LINK));
    let (author_name, author_url) = author
        .map(|a| (text_of(a), attr(a, "href")))
        .unwrap_or_default();

    let timestamp = first(row, &COMMENT_TIME).and_then(|small| parse_comment_timestamp(&text_of(small)));

    let is_after_deadline = first(row, &HISTORY_BODY)
        .map(|body| has_class(body, "after_deadline"))
        .unwrap_or(false);

    let content_html = first(row, &COMMENT_CONTENT)
        .map(|div| div.inner_html().trim().to_string())
        .unwrap_or_default();

    let files = parse_comment_files(row);
    let links = extract_urls_from_html(&content_html);

    // Status and mark changes lack an author link or any user content
    let is_system_event = author.is_none() || (content_html.is_empty() && files.is_empty());

    Comment {
        author_name,
        author_url,
        timestamp,
        content_html,
        files,
        links,
        is_after_deadline,
        is_system_event,
    }
}

fn parse_comment_files(row: ElementRef<'_>) -> Vec<FileAttachment> {
    let Some(files_div) = first(row, &FILES) else {
        return Vec::new();
    };

    let mut files = Vec::new();

    for ipynb in files_div.select(&IPYNB_LINK) {
        let Some(toggle) = first(ipynb, &DROPDOWN_TOGGLE) else {
            continue;
        };
        let download_url = first(ipynb, &DROPDOWN_MENU)
            .map(choose_notebook_url)
            .unwrap_or_default();
        files.push(FileAttachment {
            filename: text_of(toggle),
            download_url,
            is_notebook: true,
        });
    }

    for link in files_div.select(&A) {
        if inside_notebook_block(link, files_div) {
            continue;
        }
        let href = attr(link, "href");
        let filename = text_of(link);
        if href.is_empty() || filename.is_empty() {
            continue;
        }
        let is_notebook = filename.ends_with(".ipynb");
        files.push(FileAttachment {
            filename,
            download_url: href,
            is_notebook,
        });
    }

    files
}

/// Picks a notebook's download link: one labelled as a download, then a
/// media-store link, then the first link
fn choose_notebook_url(menu: ElementRef<'_>) -> String {
    let mut preferred = None;
    let mut media = None;
    let mut fallback = None;

    for item in menu.select(&DROPDOWN_ITEM) {
        let href = attr(item, "href");
        if href.is_empty() {
            continue;
        }
        let label = text_of(item).to_lowercase();
        if fallback.is_none() {
            fallback = Some(href.clone());
        }
        if label.contains("скач") || label.contains("download") {
            preferred = Some(href.clone());
        }
        if href.contains("/media/files/") || href.starts_with("/media/") {
            media = Some(href);
        }
    }

    preferred.or(media).or(fallback).unwrap_or_default()
}

fn inside_notebook_block(link: ElementRef<'_>, files_div: ElementRef<'_>) -> bool {
    let stop = files_div.id();
    link.ancestors()
        .take_while(|node| node.id() != stop)
        .filter_map(ElementRef::wrap)
        .any(|el| el.value().name() == "div" && has_class(el, "ipynb-file-link"))
}
