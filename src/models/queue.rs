//! Review queue records and the AJAX row schema they are built from

use crate::models::Submission;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One row of a course review queue
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueueEntry {
    pub student_name: String,
    pub student_url: String,
    pub task_title: String,

    /// Last update time as shown by the site (locale-specific free text)
    pub update_time: String,

    pub mark: String,
    pub status_color: String,
    pub status_name: String,
    pub responsible_name: String,
    pub responsible_url: String,
    pub has_issue_access: bool,

    /// Issue page URL; may be empty when the viewer has no access
    pub issue_url: String,
}

impl QueueEntry {
    /// Key used by the submission cache: the issue URL, or the row index when it is empty
    pub fn cache_key(&self, index: usize) -> String {
        if self.issue_url.is_empty() {
            format!("#{}", index)
        } else {
            self.issue_url.clone()
        }
    }

    /// Returns true if a deep fetch can open this entry's issue page
    pub fn is_accessible(&self) -> bool {
        self.has_issue_access && !self.issue_url.is_empty()
    }
}

/// Filter options offered by the queue page's filter dialog
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueueFilters {
    pub students: Vec<(String, String)>,
    pub tasks: Vec<(String, String)>,
    pub reviewers: Vec<(String, String)>,
    pub statuses: Vec<(String, String)>,
}

/// A course review queue with lazily filled submission details
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReviewQueue {
    pub course_id: u64,

    /// Entries in server order
    pub entries: Vec<QueueEntry>,

    /// Submission details keyed by issue URL
    pub submissions: BTreeMap<String, Submission>,
}

impl ReviewQueue {
    /// Creates a queue without submission details
    pub fn new(course_id: u64, entries: Vec<QueueEntry>) -> Self {
        Self {
            course_id,
            entries,
            submissions: BTreeMap::new(),
        }
    }

    /// Entries whose issue page can be fetched
    pub fn accessible_entries(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter().filter(|e| e.is_accessible())
    }

    /// Submissions in queue entry order, skipping entries not yet fetched
    pub fn submissions_in_order(&self) -> Vec<&Submission> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| self.submissions.get(&e.cache_key(i)))
            .collect()
    }
}

/// One row returned by the queue AJAX endpoint
///
/// The endpoint sends loosely typed JSON; every field defaults when it is
/// missing and scalars of any type are accepted as text.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct QueueRow {
    #[serde(deserialize_with = "lenient_string")]
    pub student_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub student_url: String,
    #[serde(deserialize_with = "lenient_string")]
    pub task_title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub update_time: String,
    #[serde(deserialize_with = "lenient_string")]
    pub mark: String,
    #[serde(deserialize_with = "lenient_string")]
    pub status_color: String,
    #[serde(deserialize_with = "lenient_string")]
    pub status_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub responsible_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub responsible_url: String,
    #[serde(deserialize_with = "lenient_bool")]
    pub has_issue_access: bool,
    #[serde(deserialize_with = "lenient_string")]
    pub issue_url: String,
}

/// One page of the queue AJAX endpoint
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct QueuePage {
    #[serde(rename = "recordsTotal", deserialize_with = "lenient_u64")]
    pub records_total: u64,

    #[serde(deserialize_with = "lenient_rows")]
    pub data: Vec<QueueRow>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    })
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn lenient_rows<'de, D>(deserializer: D) -> Result<Vec<QueueRow>, D::Error>
where
    D: Deserializer<'de>,
{
    let rows = match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    };
    Ok(rows)
}
