//! The scheduler's internal job representation: a submitted
//! [`Job`](moduly_ports::sandbox::Job) paired with its completion
//! channel and the bookkeeping the MLFQ needs (arrival time, for
//! aging; a stable id, for targeted removal during promotion).

use std::time::Instant;

use moduly_error::Error;
use moduly_ports::sandbox::{Job, JobOutcome};
use tokio::sync::oneshot;
use uuid::Uuid;

/// A job sitting in one of the scheduler's priority buckets.
pub struct QueuedJob {
    /// Stable identifier, unique for the lifetime of the scheduler.
    pub id: Uuid,
    /// The submitted job itself.
    pub job: Job,
    /// When this job was first enqueued — survives promotion across
    /// buckets so aging is measured from original arrival, not from
    /// the last promotion.
    pub enqueued_at: Instant,
    /// Fulfilled once the job has run (or been rejected/cancelled).
    pub completion: oneshot::Sender<Result<JobOutcome, Error>>,
}

impl QueuedJob {
    /// Wrap a freshly submitted job with a completion channel.
    #[must_use]
    pub fn new(job: Job) -> (Self, oneshot::Receiver<Result<JobOutcome, Error>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                id: Uuid::new_v4(),
                job,
                enqueued_at: Instant::now(),
                completion: tx,
            },
            rx,
        )
    }
}
