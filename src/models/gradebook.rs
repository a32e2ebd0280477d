use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Semantic status of a gradebook cell, mapped from its background colour
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusColor {
    Success,
    Warning,
    Danger,
    Info,
    Primary,
    Default,
    /// A colour outside the known table, kept verbatim
    Other(String),
}

impl StatusColor {
    /// Maps a `#rrggbb` background colour to its status
    pub fn from_hex(hex: &str) -> Self {
        match hex.trim().to_ascii_uppercase().as_str() {
            "#65E31B" => Self::Success,
            "#F0AD4E" => Self::Warning,
            "#D9534F" => Self::Danger,
            "#5BC0DE" => Self::Info,
            "#428BCA" => Self::Primary,
            "#818A91" | "#777777" | "#777" => Self::Default,
            _ => Self::Other(hex.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Danger => "danger",
            Self::Info => "info",
            Self::Primary => "primary",
            Self::Default => "default",
            Self::Other(hex) => hex,
        }
    }
}

impl fmt::Display for StatusColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One student row of a gradebook group
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GradebookEntry {
    pub student_name: String,
    pub student_url: String,
    pub scores: BTreeMap<String, f64>,
    pub statuses: BTreeMap<String, StatusColor>,
    pub issue_urls: BTreeMap<String, String>,

    /// The page's own total; never recomputed from `scores`
    pub total_score: f64,
}

/// One gradebook table (a class section)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GradebookGroup {
    pub group_name: String,
    pub group_id: u64,
    pub teacher_name: String,

    /// Column order of the table
    pub task_titles: Vec<String>,

    pub max_scores: BTreeMap<String, f64>,
    pub entries: Vec<GradebookEntry>,
}

/// All gradebook groups of a course
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Gradebook {
    pub course_id: u64,
    pub groups: Vec<GradebookGroup>,
}

impl Gradebook {
    pub fn new(course_id: u64) -> Self {
        Self {
            course_id,
            groups: Vec::new(),
        }
    }

    /// Union of task titles over all groups, first-seen order
    pub fn all_task_titles(&self) -> Vec<String> {
        let mut titles: Vec<String> = Vec::new();
        for title in self.groups.iter().flat_map(|g| g.task_titles.iter()) {
            if !titles.contains(title) {
                titles.push(title.clone());
            }
        }
        titles
    }

    pub fn student_count(&self) -> usize {
        self.groups.iter().map(|g| g.entries.len()).sum()
    }
}
