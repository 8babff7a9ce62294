//! Intake queues: per-class FIFO lanes feeding the scheduler.
//!
//! Producers (the submission surface) own `enqueue`; the scheduler
//! exclusively owns dequeue. A blocking dequeue is the composition of
//! `pop` and `wait_for_change`: the scheduler polls the lanes in
//! precedence order and suspends on the shared wake signal when its
//! policy yields nothing to run.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};

use super::job::{Job, JobClass};

/// FIFO queues keyed by job class, with a shared wake signal.
pub struct IntakeQueues {
    lanes: [Mutex<VecDeque<Job>>; JobClass::ORDERED.len()],
    wake: Notify,
}

impl IntakeQueues {
    pub fn new() -> Self {
        Self {
            lanes: [Mutex::new(VecDeque::new()), Mutex::new(VecDeque::new())],
            wake: Notify::new(),
        }
    }

    fn lane(&self, class: JobClass) -> &Mutex<VecDeque<Job>> {
        match class {
            JobClass::Priority => &self.lanes[0],
            JobClass::Normal => &self.lanes[1],
        }
    }

    /// Append a job to the tail of its class's queue. Never blocks beyond
    /// the lane lock; returns as soon as the job is queued.
    pub async fn enqueue(&self, job: Job) {
        tracing::debug!(job_id = %job.id, class = %job.class, kind = %job.kind, "Job enqueued");
        self.lane(job.class).lock().await.push_back(job);
        self.wake.notify_one();
    }

    /// Remove and return the head of the class's queue, if any.
    /// Scheduler-owned; FIFO order within the class is preserved.
    pub async fn pop(&self, class: JobClass) -> Option<Job> {
        self.lane(class).lock().await.pop_front()
    }

    pub async fn is_empty(&self, class: JobClass) -> bool {
        self.lane(class).lock().await.is_empty()
    }

    pub async fn len(&self, class: JobClass) -> usize {
        self.lane(class).lock().await.len()
    }

    /// Wake the scheduler so it re-evaluates its policy. Called by
    /// `enqueue` and by dispatch watchers when an outcome lands.
    pub fn poke(&self) {
        self.wake.notify_one();
    }

    /// Suspend until poked, or until `bound` elapses. The bound keeps the
    /// scheduler's waits short and re-checkable even if a wake-up is
    /// missed between a policy decision and the suspension.
    pub async fn wait_for_change(&self, bound: Duration) {
        let _ = tokio::time::timeout(bound, self.wake.notified()).await;
    }
}

impl Default for IntakeQueues {
    fn default() -> Self {
        Self::new()
    }
}
