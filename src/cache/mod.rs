//! Per-course memoization of queues, gradebooks and submissions
//!
//! Every (course, resource) pair owns one [`OnceCell`]. Concurrent callers
//! for the same pair await the same initialisation, so a resource is never
//! fetched twice while a fetch is in flight. A failed fetch leaves the cell
//! empty and the slot is dropped, returning the pair to `Unloaded`.

mod filter;
mod source;

pub use filter::QueueFilter;
pub use source::CourseSource;

use crate::client::lock;
use crate::models::{Course, Gradebook, ReviewQueue, Submission};
use crate::{AnytaskError, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

/// Cached resource kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Queue,
    Gradebook,
}

/// Load state of one (course, resource) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Loaded,
}

type Slot<T> = Arc<OnceCell<T>>;
type SharedQueue = Arc<Mutex<ReviewQueue>>;

/// Summary of a deep queue fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeepFetchReport {
    /// Submissions fetched by this call
    pub fetched: usize,
    /// Submissions that were already cached
    pub cached: usize,
    /// Entries without issue access
    pub skipped: usize,
    /// Issue URL and error message of each failed entry
    pub failures: Vec<(String, String)>,
}

/// Application state shared by the CLI commands
pub struct AppContext<S: CourseSource> {
    source: S,
    courses: Mutex<BTreeMap<u64, Course>>,
    queues: Mutex<HashMap<u64, Slot<SharedQueue>>>,
    gradebooks: Mutex<HashMap<u64, Slot<Arc<Gradebook>>>>,
}

fn slot_state<T>(slot: Option<&Slot<T>>) -> LoadState {
    match slot {
        None => LoadState::Unloaded,
        Some(cell) if cell.initialized() => LoadState::Loaded,
        Some(_) => LoadState::Loading,
    }
}

/// Returns the cell for `course_id`, creating an empty one if needed
fn slot_for<T>(map: &Mutex<HashMap<u64, Slot<T>>>, course_id: u64) -> Slot<T> {
    lock(map)
        .entry(course_id)
        .or_insert_with(|| Arc::new(OnceCell::new()))
        .clone()
}

/// Drops a slot whose initialisation failed, unless it was replaced meanwhile
fn discard_failed<T>(map: &Mutex<HashMap<u64, Slot<T>>>, course_id: u64, slot: &Slot<T>) {
    let mut map = lock(map);
    let same = map
        .get(&course_id)
        .map(|current| Arc::ptr_eq(current, slot) && !current.initialized())
        .unwrap_or(false);
    if same {
        map.remove(&course_id);
    }
}

impl<S: CourseSource> AppContext<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            courses: Mutex::new(BTreeMap::new()),
            queues: Mutex::new(HashMap::new()),
            gradebooks: Mutex::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetches a course and adds it to the course list
    pub async fn load_course(&self, course_id: u64) -> Result<Course> {
        let course = self.source.fetch_course(course_id).await?;
        lock(&self.courses).insert(course_id, course.clone());
        Ok(course)
    }

    pub fn course(&self, course_id: u64) -> Option<Course> {
        lock(&self.courses).get(&course_id).cloned()
    }

    /// Loaded courses ordered by id
    pub fn courses(&self) -> Vec<Course> {
        lock(&self.courses).values().cloned().collect()
    }

    pub fn load_state(&self, course_id: u64, resource: Resource) -> LoadState {
        match resource {
            Resource::Queue => slot_state(lock(&self.queues).get(&course_id)),
            Resource::Gradebook => slot_state(lock(&self.gradebooks).get(&course_id)),
        }
    }

    async fn queue_handle(&self, course_id: u64) -> Result<SharedQueue> {
        let slot = slot_for(&self.queues, course_id);
        let result = slot
            .get_or_try_init(|| async {
                tracing::debug!("Queue cache miss for course {}", course_id);
                let queue = self.source.fetch_review_queue(course_id).await?;
                Ok::<_, AnytaskError>(Arc::new(Mutex::new(queue)))
            })
            .await
            .cloned();

        if result.is_err() {
            discard_failed(&self.queues, course_id, &slot);
        }
        result
    }

    /// Returns the course's review queue, fetching it on first use
    pub async fn get_or_fetch_queue(&self, course_id: u64) -> Result<ReviewQueue> {
        let handle = self.queue_handle(course_id).await?;
        let queue = lock(&handle).clone();
        Ok(queue)
    }

    /// Returns the course's gradebook, fetching it on first use
    pub async fn get_or_fetch_gradebook(&self, course_id: u64) -> Result<Arc<Gradebook>> {
        let slot = slot_for(&self.gradebooks, course_id);
        let result = slot
            .get_or_try_init(|| async {
                tracing::debug!("Gradebook cache miss for course {}", course_id);
                let gradebook = self.source.fetch_gradebook(course_id).await?;
                Ok::<_, AnytaskError>(Arc::new(gradebook))
            })
            .await
            .cloned();

        if result.is_err() {
            discard_failed(&self.gradebooks, course_id, &slot);
        }
        result
    }

    /// Returns one submission of the course queue, fetching it on first use
    ///
    /// Submissions are stored in the cached queue keyed by issue URL and are
    /// never evicted by other fetches.
    pub async fn get_or_fetch_submission(
        &self,
        course_id: u64,
        issue_url: &str,
    ) -> Result<Submission> {
        let handle = self.queue_handle(course_id).await?;
        let cached = lock(&handle).submissions.get(issue_url).cloned();
        if let Some(submission) = cached {
            return Ok(submission);
        }

        let submission = self.source.fetch_submission(issue_url).await?;
        lock(&handle)
            .submissions
            .insert(issue_url.to_string(), submission.clone());
        Ok(submission)
    }

    /// Fetches every accessible submission of the queue, one at a time
    ///
    /// Per-entry failures are collected in the report; only a failure to
    /// load the queue itself is an error.
    pub async fn deep_fetch_queue(&self, course_id: u64) -> Result<DeepFetchReport> {
        let handle = self.queue_handle(course_id).await?;
        let entries = lock(&handle).entries.clone();
        let mut report = DeepFetchReport::default();

        for (index, entry) in entries.iter().enumerate() {
            if !entry.is_accessible() {
                report.skipped += 1;
                continue;
            }
            let key = entry.cache_key(index);
            if lock(&handle).submissions.contains_key(&key) {
                report.cached += 1;
                continue;
            }

            match self.source.fetch_submission(&entry.issue_url).await {
                Ok(submission) => {
                    lock(&handle).submissions.insert(key, submission);
                    report.fetched += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to fetch {}: {}", entry.issue_url, e);
                    report.failures.push((entry.issue_url.clone(), e.to_string()));
                }
            }
        }

        tracing::info!(
            "Deep fetch for course {}: {} fetched, {} cached, {} skipped, {} failed",
            course_id,
            report.fetched,
            report.cached,
            report.skipped,
            report.failures.len()
        );
        Ok(report)
    }

    /// Forgets a course together with its cached queue and gradebook
    pub fn remove_course(&self, course_id: u64) -> bool {
        let removed = lock(&self.courses).remove(&course_id).is_some();
        lock(&self.queues).remove(&course_id);
        lock(&self.gradebooks).remove(&course_id);
        tracing::debug!("Removed course {} from cache", course_id);
        removed
    }
}
