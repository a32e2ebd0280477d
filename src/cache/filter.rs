//! Queue filtering by task, reviewer, status and student

use crate::models::{QueueEntry, ReviewQueue};

/// Case-insensitive substring filter over queue entries
///
/// Empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueFilter {
    pub task: Option<String>,
    pub reviewer: Option<String>,
    pub status: Option<String>,
    pub student: Option<String>,
}

fn field_matches(needle: &Option<String>, value: &str) -> bool {
    match needle.as_deref().map(str::trim) {
        None | Some("") => true,
        Some(needle) => value.to_lowercase().contains(&needle.to_lowercase()),
    }
}

impl QueueFilter {
    pub fn is_empty(&self) -> bool {
        [&self.task, &self.reviewer, &self.status, &self.student]
            .iter()
            .all(|f| f.as_deref().map(str::trim).unwrap_or_default().is_empty())
    }

    pub fn matches(&self, entry: &QueueEntry) -> bool {
        field_matches(&self.task, &entry.task_title)
            && field_matches(&self.reviewer, &entry.responsible_name)
            && field_matches(&self.status, &entry.status_name)
            && field_matches(&self.student, &entry.student_name)
    }

    /// Copy of the queue with only matching entries and their submissions
    pub fn apply(&self, queue: &ReviewQueue) -> ReviewQueue {
        let mut filtered = ReviewQueue::new(queue.course_id, Vec::new());
        for (index, entry) in queue.entries.iter().enumerate() {
            if !self.matches(entry) {
                continue;
            }
            let key = entry.cache_key(index);
            if let Some(submission) = queue.submissions.get(&key) {
                filtered.submissions.insert(key, submission.clone());
            }
            filtered.entries.push(entry.clone());
        }
        filtered
    }
}
