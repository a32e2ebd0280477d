//! Typed records produced by the page parsers
//!
//! Every record is a plain value built from a single page snapshot. Nothing
//! here holds a reference back to the page it came from.

mod course;
mod gradebook;
mod queue;
mod submission;

pub use course::{Course, Task};
pub use gradebook::{Gradebook, GradebookEntry, GradebookGroup, StatusColor};
pub use queue::{QueueEntry, QueueFilters, QueuePage, QueueRow, ReviewQueue};
pub use submission::{Comment, FileAttachment, Submission};
