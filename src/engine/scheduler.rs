//! Scheduler: the single arbitrating loop.
//!
//! Per iteration:
//! 1. If no PRIORITY job is in flight and the PRIORITY queue is
//!    non-empty, dequeue and dispatch it.
//! 2. Else if a PRIORITY job is in flight, leave the NORMAL queue alone
//!    and suspend until woken (bounded re-check delay).
//! 3. Else dequeue and dispatch from the NORMAL queue.
//! 4. Else suspend until any queue has work.
//!
//! Dispatch bodies never overlap each other: inline work is awaited on
//! the loop itself, pooled work is handed to the worker pool and a
//! watcher task records its outcome. Every completion, success, failure
//! or panic, lands exactly one outcome in the result store; nothing a
//! processor does can halt the loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use uuid::Uuid;

use crate::engine::job::{Job, JobClass, JobOutcome};
use crate::engine::pool::WorkerPool;
use crate::engine::queue::IntakeQueues;
use crate::engine::store::ResultStore;
use crate::error::ProcessingError;
use crate::processors::{Execution, Processor, ProcessorRegistry};

/// Per-class in-flight counters. Only the PRIORITY marker gates
/// arbitration; NORMAL parallelism is bounded by the worker pool.
pub(crate) struct InFlight {
    counts: [AtomicUsize; JobClass::ORDERED.len()],
}

impl InFlight {
    pub(crate) fn new() -> Self {
        Self {
            counts: [AtomicUsize::new(0), AtomicUsize::new(0)],
        }
    }

    fn slot(&self, class: JobClass) -> &AtomicUsize {
        match class {
            JobClass::Priority => &self.counts[0],
            JobClass::Normal => &self.counts[1],
        }
    }

    fn enter(&self, class: JobClass) {
        self.slot(class).fetch_add(1, Ordering::SeqCst);
    }

    fn exit(&self, class: JobClass) {
        self.slot(class).fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn busy(&self, class: JobClass) -> bool {
        self.count(class) > 0
    }

    pub(crate) fn count(&self, class: JobClass) -> usize {
        self.slot(class).load(Ordering::SeqCst)
    }
}

/// The arbitrating scheduling loop. One instance runs per engine.
pub(crate) struct Scheduler {
    pub(crate) queues: Arc<IntakeQueues>,
    pub(crate) store: Arc<ResultStore>,
    pub(crate) pool: Arc<WorkerPool>,
    pub(crate) processors: Arc<ProcessorRegistry>,
    pub(crate) in_flight: Arc<InFlight>,
    pub(crate) recheck_delay: Duration,
}

impl Scheduler {
    /// Run forever. The loop has no error path: every processing failure
    /// becomes a Failure outcome and the next iteration proceeds.
    pub(crate) async fn run(self) {
        tracing::info!(
            pool_size = self.pool.capacity(),
            "Scheduler started"
        );
        loop {
            match self.next_job().await {
                Some(job) => self.dispatch(job).await,
                None => self.queues.wait_for_change(self.recheck_delay).await,
            }
        }
    }

    /// Apply the arbitration policy and pick the next job, if any.
    async fn next_job(&self) -> Option<Job> {
        // A PRIORITY job in flight blocks both lanes: no second PRIORITY
        // call may be outstanding, and NORMAL must not overtake.
        if self.in_flight.busy(JobClass::Priority) {
            return None;
        }
        if let Some(job) = self.queues.pop(JobClass::Priority).await {
            return Some(job);
        }
        self.queues.pop(JobClass::Normal).await
    }

    /// Dispatch one job. Inline work is awaited here; pooled work is
    /// submitted and watched from a side task.
    async fn dispatch(&self, job: Job) {
        let Some(processor) = self.processors.get(job.kind) else {
            // submit() rejects unregistered kinds; keep dispatch total anyway.
            // The job never entered the in-flight set, so record directly.
            record(
                &self.store,
                job.id,
                job.class,
                JobOutcome::failure(format!("no processor for job kind {}", job.kind)),
            )
            .await;
            return;
        };

        tracing::info!(
            job_id = %job.id,
            class = %job.class,
            kind = %job.kind,
            "Dispatching job"
        );
        self.in_flight.enter(job.class);

        match processor.execution() {
            Execution::Inline => {
                let outcome = run_contained(processor, job.payload.clone()).await;
                self.finish(job.id, job.class, outcome).await;
            }
            Execution::Pooled => {
                let payload = job.payload.clone();
                let rx = self
                    .pool
                    .submit(async move { processor.process(payload).await });

                let store = Arc::clone(&self.store);
                let queues = Arc::clone(&self.queues);
                let in_flight = Arc::clone(&self.in_flight);
                let (id, class) = (job.id, job.class);
                tokio::spawn(async move {
                    let outcome = match rx.await {
                        Ok(Ok(result)) => JobOutcome::Success(result),
                        Ok(Err(e)) => outcome_from_error(&e),
                        // Sender dropped: the pooled task panicked.
                        Err(_) => outcome_from_error(&ProcessingError::WorkerCrashed),
                    };
                    record(&store, id, class, outcome).await;
                    in_flight.exit(class);
                    queues.poke();
                });
            }
        }
    }

    async fn finish(&self, id: Uuid, class: JobClass, outcome: JobOutcome) {
        record(&self.store, id, class, outcome).await;
        self.in_flight.exit(class);
        self.queues.poke();
    }
}

/// Run an inline processor with panic containment: the work is spawned
/// and awaited immediately, so a panicking processor unwinds its own
/// task instead of the scheduler loop.
async fn run_contained(
    processor: Arc<dyn Processor>,
    payload: serde_json::Value,
) -> JobOutcome {
    let handle = tokio::spawn(async move { processor.process(payload).await });
    match handle.await {
        Ok(Ok(result)) => JobOutcome::Success(result),
        Ok(Err(e)) => outcome_from_error(&e),
        Err(join_err) if join_err.is_panic() => {
            outcome_from_error(&ProcessingError::WorkerCrashed)
        }
        Err(join_err) => JobOutcome::failure(format!("processing task failed: {join_err}")),
    }
}

fn outcome_from_error(err: &ProcessingError) -> JobOutcome {
    JobOutcome::Failure {
        message: err.to_string(),
        detail: Some(format!("{err:?}")),
    }
}

async fn record(store: &ResultStore, id: Uuid, class: JobClass, outcome: JobOutcome) {
    match &outcome {
        JobOutcome::Success(_) => {
            tracing::info!(job_id = %id, class = %class, "Job completed");
        }
        JobOutcome::Failure { message, .. } => {
            tracing::warn!(job_id = %id, class = %class, error = %message, "Job failed");
        }
    }
    store.put(id, outcome).await;
}
