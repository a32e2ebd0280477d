use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A file attached to a comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAttachment {
    pub filename: String,
    pub download_url: String,
    pub is_notebook: bool,
}

/// One entry of an issue's comment thread
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Comment {
    pub author_name: String,
    pub author_url: String,
    pub timestamp: Option<NaiveDateTime>,

    /// Raw comment markup
    pub content_html: String,

    pub files: Vec<FileAttachment>,

    /// HTTP(S) links found in the comment, first-seen order
    pub links: Vec<String>,

    /// Taken from the page's `after_deadline` marker, never computed
    pub is_after_deadline: bool,

    /// Status changes and other entries posted by the system rather than a user
    pub is_system_event: bool,
}

/// Full details of one issue page
///
/// Metadata fields are kept as the text the page shows; the page does not
/// expose machine-readable values for them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Submission {
    pub issue_id: u64,
    pub task_title: String,
    pub student_name: String,
    pub student_url: String,
    pub reviewer_name: String,
    pub reviewer_url: String,
    pub status: String,
    pub grade: String,
    pub max_score: String,
    pub deadline: String,

    /// Thread in page order
    pub comments: Vec<Comment>,
}

impl Submission {
    /// All attachments across the thread, in thread order
    pub fn files(&self) -> impl Iterator<Item = &FileAttachment> {
        self.comments.iter().flat_map(|c| c.files.iter())
    }

    /// All links across the thread, in thread order
    pub fn links(&self) -> impl Iterator<Item = &str> {
        self.comments
            .iter()
            .flat_map(|c| c.links.iter().map(String::as_str))
    }
}
