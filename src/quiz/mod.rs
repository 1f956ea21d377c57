//! Adaptive quiz engine: pure scheduling and state-machine logic.
//!
//! Nothing in here touches storage; `services` feeds snapshots in and
//! persists what comes out.

pub mod completion;
pub mod mastery;
pub mod options;
pub mod priority;
pub mod report;
pub mod retry_queue;
pub mod streak;
pub mod types;

pub use completion::{evaluate_transition, GroupTally, GroupTransition};
pub use mastery::{apply_answer, next_due_date, review_interval_days};
pub use priority::{build_queue, PriorityBand, QueuedWord};
pub use retry_queue::RetryQueue;
pub use types::*;
