//! Job dispatch and priority scheduling engine.
//!
//! Owns the intake queues, the worker pool, and the result store, and
//! runs the single arbitrating scheduler loop over them. All state is
//! constructed once at startup and shared explicitly; nothing here is
//! global.

pub mod job;
pub mod pool;
pub mod queue;
pub mod scheduler;
pub mod store;

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::SubmissionError;
use crate::processors::ProcessorRegistry;

use job::{Job, JobClass, JobKind, JobOutcome};
use pool::WorkerPool;
use queue::IntakeQueues;
use scheduler::{InFlight, Scheduler};
use store::ResultStore;

/// Retrieval view of a job.
#[derive(Debug, Clone)]
pub enum JobStatus {
    /// The id was never issued by this process.
    Unknown,
    /// Submitted, no outcome recorded yet.
    Pending,
    /// Terminal outcome.
    Done(JobOutcome),
}

/// The dispatch engine. Submission enqueues, the scheduler consumes,
/// retrieval reads the result store.
pub struct JobEngine {
    queues: Arc<IntakeQueues>,
    store: Arc<ResultStore>,
    pool: Arc<WorkerPool>,
    processors: Arc<ProcessorRegistry>,
    in_flight: Arc<InFlight>,
    /// Every id this engine has issued, for pending-vs-unknown retrieval.
    known: RwLock<HashSet<Uuid>>,
    config: EngineConfig,
}

impl JobEngine {
    pub fn new(config: EngineConfig, processors: ProcessorRegistry) -> Arc<Self> {
        Arc::new(Self {
            queues: Arc::new(IntakeQueues::new()),
            store: Arc::new(ResultStore::new()),
            pool: Arc::new(WorkerPool::new(config.pool_size)),
            processors: Arc::new(processors),
            in_flight: Arc::new(InFlight::new()),
            known: RwLock::new(HashSet::new()),
            config,
        })
    }

    /// Submit a job. Validation of kind-specific payload fields happens
    /// at the surface before this call; here only the kind registration
    /// is checked. Returns the job id immediately; the work runs later.
    pub async fn submit(
        &self,
        class: JobClass,
        kind: JobKind,
        payload: serde_json::Value,
    ) -> Result<Uuid, SubmissionError> {
        if !self.processors.has(kind) {
            return Err(SubmissionError::UnknownKind {
                kind: kind.to_string(),
            });
        }

        let job = Job::new(class, kind, payload);
        let id = job.id;
        self.known.write().await.insert(id);
        self.queues.enqueue(job).await;
        Ok(id)
    }

    /// Look up a job for retrieval, separating never-submitted ids from
    /// submitted-but-pending ones.
    pub async fn lookup(&self, id: Uuid) -> JobStatus {
        if let Some(outcome) = self.store.get(id).await {
            return JobStatus::Done(outcome);
        }
        if self.known.read().await.contains(&id) {
            JobStatus::Pending
        } else {
            JobStatus::Unknown
        }
    }

    /// Queue depth for a class. Exposed for health reporting and tests.
    pub async fn queue_depth(&self, class: JobClass) -> usize {
        self.queues.len(class).await
    }

    /// Spawn the scheduler loop. Call exactly once per engine.
    pub fn spawn_scheduler(self: &Arc<Self>) -> JoinHandle<()> {
        let scheduler = Scheduler {
            queues: Arc::clone(&self.queues),
            store: Arc::clone(&self.store),
            pool: Arc::clone(&self.pool),
            processors: Arc::clone(&self.processors),
            in_flight: Arc::clone(&self.in_flight),
            recheck_delay: self.config.recheck_delay,
        };
        tokio::spawn(scheduler.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::job::ResultPayload;
    use crate::processors::testing::{
        EchoProcessor, FailingProcessor, GatedProcessor, PanickingProcessor, RecordingProcessor,
    };
    use crate::processors::Execution;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn test_config() -> EngineConfig {
        EngineConfig {
            pool_size: 2,
            recheck_delay: Duration::from_millis(20),
        }
    }

    async fn wait_done(engine: &Arc<JobEngine>, id: Uuid) -> JobOutcome {
        for _ in 0..200 {
            if let JobStatus::Done(outcome) = engine.lookup(id).await {
                return outcome;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {id} did not complete in time");
    }

    #[tokio::test]
    async fn submit_rejects_unregistered_kind() {
        let engine = JobEngine::new(test_config(), ProcessorRegistry::new());
        let err = engine
            .submit(JobClass::Normal, JobKind::RemovePerson, serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::UnknownKind { .. }));
    }

    #[tokio::test]
    async fn unknown_id_is_distinct_from_pending() {
        let mut registry = ProcessorRegistry::new();
        registry.register(Arc::new(EchoProcessor {
            kind: JobKind::GenerateImage,
            execution: Execution::Inline,
        }));
        let engine = JobEngine::new(test_config(), registry);

        // Scheduler not running: a submitted job stays pending.
        let id = engine
            .submit(JobClass::Normal, JobKind::GenerateImage, serde_json::json!({}))
            .await
            .unwrap();
        assert!(matches!(engine.lookup(id).await, JobStatus::Pending));
        assert!(matches!(
            engine.lookup(Uuid::new_v4()).await,
            JobStatus::Unknown
        ));
    }

    #[tokio::test]
    async fn pending_then_deterministic_success() {
        let mut registry = ProcessorRegistry::new();
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        registry.register(Arc::new(GatedProcessor {
            kind: JobKind::GenerateImage,
            execution: Execution::Pooled,
            started: started.clone(),
            release: release.clone(),
        }));
        let engine = JobEngine::new(test_config(), registry);
        engine.spawn_scheduler();

        let id = engine
            .submit(
                JobClass::Normal,
                JobKind::GenerateImage,
                serde_json::json!({ "p": 1 }),
            )
            .await
            .unwrap();

        started.notified().await;
        assert!(matches!(engine.lookup(id).await, JobStatus::Pending));

        release.notify_one();
        match wait_done(&engine, id).await {
            JobOutcome::Success(ResultPayload::Json(value)) => {
                assert_eq!(value, serde_json::json!({ "done": { "p": 1 } }));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn fifo_start_order_within_class() {
        let mut registry = ProcessorRegistry::new();
        registry.register(Arc::new(EchoProcessor {
            kind: JobKind::GenerateImage,
            execution: Execution::Inline,
        }));
        let engine = JobEngine::new(test_config(), registry);

        // Enqueue before starting the scheduler so both are queued.
        let a = engine
            .submit(JobClass::Normal, JobKind::GenerateImage, serde_json::json!("a"))
            .await
            .unwrap();
        let b = engine
            .submit(JobClass::Normal, JobKind::GenerateImage, serde_json::json!("b"))
            .await
            .unwrap();
        engine.spawn_scheduler();

        wait_done(&engine, a).await;
        wait_done(&engine, b).await;
        // Inline execution on a single loop: if B had started first, A
        // would still be queued when B's outcome lands.
        assert_eq!(engine.queue_depth(JobClass::Normal).await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn fifo_start_order_for_pooled_kind() {
        let starts = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let mut registry = ProcessorRegistry::new();
        registry.register(Arc::new(RecordingProcessor {
            kind: JobKind::RemovePerson,
            execution: Execution::Pooled,
            starts: starts.clone(),
        }));
        // One pool worker makes start order fully observable.
        let config = EngineConfig {
            pool_size: 1,
            recheck_delay: Duration::from_millis(20),
        };
        let engine = JobEngine::new(config, registry);

        // Queue a burst before the scheduler runs so the dispatches land
        // back-to-back.
        let mut ids = Vec::new();
        for n in 0..10 {
            ids.push(
                engine
                    .submit(JobClass::Normal, JobKind::RemovePerson, serde_json::json!(n))
                    .await
                    .unwrap(),
            );
        }
        engine.spawn_scheduler();
        for id in ids {
            assert!(wait_done(&engine, id).await.is_success());
        }

        let starts = starts.lock().await;
        let expected: Vec<serde_json::Value> = (0..10).map(|n| serde_json::json!(n)).collect();
        assert_eq!(*starts, expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn priority_blocks_normal_until_complete() {
        let mut registry = ProcessorRegistry::new();
        let prio_started = Arc::new(Notify::new());
        let prio_release = Arc::new(Notify::new());
        let normal_started = Arc::new(Notify::new());
        let normal_release = Arc::new(Notify::new());
        registry.register(Arc::new(GatedProcessor {
            kind: JobKind::RecommendMusic,
            execution: Execution::Pooled,
            started: prio_started.clone(),
            release: prio_release.clone(),
        }));
        registry.register(Arc::new(GatedProcessor {
            kind: JobKind::GenerateImage,
            execution: Execution::Pooled,
            started: normal_started.clone(),
            release: normal_release.clone(),
        }));
        let engine = JobEngine::new(test_config(), registry);
        engine.spawn_scheduler();

        let prio = engine
            .submit(JobClass::Priority, JobKind::RecommendMusic, serde_json::json!({}))
            .await
            .unwrap();
        prio_started.notified().await;

        // With a PRIORITY job in flight the NORMAL queue is not touched.
        let normal = engine
            .submit(JobClass::Normal, JobKind::GenerateImage, serde_json::json!({}))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(engine.queue_depth(JobClass::Normal).await, 1);
        assert!(matches!(engine.lookup(normal).await, JobStatus::Pending));

        // Once the PRIORITY job completes, the NORMAL job starts.
        prio_release.notify_one();
        wait_done(&engine, prio).await;
        normal_started.notified().await;
        normal_release.notify_one();
        wait_done(&engine, normal).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn priority_overtakes_queued_normal_without_preemption() {
        let mut registry = ProcessorRegistry::new();
        let normal_started = Arc::new(Notify::new());
        let normal_release = Arc::new(Notify::new());
        let prio_started = Arc::new(Notify::new());
        let prio_release = Arc::new(Notify::new());
        registry.register(Arc::new(GatedProcessor {
            kind: JobKind::RemovePerson,
            execution: Execution::Pooled,
            started: normal_started.clone(),
            release: normal_release.clone(),
        }));
        registry.register(Arc::new(GatedProcessor {
            kind: JobKind::RecommendMusic,
            execution: Execution::Pooled,
            started: prio_started.clone(),
            release: prio_release.clone(),
        }));
        let engine = JobEngine::new(test_config(), registry);
        engine.spawn_scheduler();

        // A NORMAL job is mid-execution in the pool.
        let first_normal = engine
            .submit(JobClass::Normal, JobKind::RemovePerson, serde_json::json!(1))
            .await
            .unwrap();
        normal_started.notified().await;

        // A PRIORITY job and a later NORMAL job arrive while it runs.
        let prio = engine
            .submit(JobClass::Priority, JobKind::RecommendMusic, serde_json::json!({}))
            .await
            .unwrap();
        let second_normal = engine
            .submit(JobClass::Normal, JobKind::RemovePerson, serde_json::json!(2))
            .await
            .unwrap();

        // The PRIORITY job starts without the running NORMAL being
        // preempted, and before the later NORMAL is serviced.
        prio_started.notified().await;
        assert!(matches!(engine.lookup(first_normal).await, JobStatus::Pending));
        assert_eq!(engine.queue_depth(JobClass::Normal).await, 1);

        prio_release.notify_one();
        wait_done(&engine, prio).await;
        normal_release.notify_one();
        normal_started.notified().await;
        normal_release.notify_one();
        wait_done(&engine, first_normal).await;
        wait_done(&engine, second_normal).await;
    }

    #[tokio::test]
    async fn failure_is_isolated_and_terminal() {
        let mut registry = ProcessorRegistry::new();
        registry.register(Arc::new(FailingProcessor {
            kind: JobKind::SceneBlend,
            execution: Execution::Pooled,
        }));
        registry.register(Arc::new(EchoProcessor {
            kind: JobKind::GenerateImage,
            execution: Execution::Inline,
        }));
        let engine = JobEngine::new(test_config(), registry);
        engine.spawn_scheduler();

        let failing = engine
            .submit(JobClass::Normal, JobKind::SceneBlend, serde_json::json!({}))
            .await
            .unwrap();
        match wait_done(&engine, failing).await {
            JobOutcome::Failure { message, detail } => {
                assert!(message.contains("synthetic failure"));
                assert!(detail.is_some());
            }
            JobOutcome::Success(_) => panic!("expected failure"),
        }

        // A later unrelated job still completes successfully.
        let ok = engine
            .submit(JobClass::Normal, JobKind::GenerateImage, serde_json::json!({}))
            .await
            .unwrap();
        assert!(wait_done(&engine, ok).await.is_success());

        // The failure stays terminal across repeated polls.
        assert!(matches!(
            engine.lookup(failing).await,
            JobStatus::Done(JobOutcome::Failure { .. })
        ));
    }

    #[tokio::test]
    async fn panicking_processor_does_not_halt_scheduling() {
        let mut registry = ProcessorRegistry::new();
        registry.register(Arc::new(PanickingProcessor {
            kind: JobKind::SceneBlend,
            execution: Execution::Inline,
        }));
        registry.register(Arc::new(PanickingProcessor {
            kind: JobKind::RemovePerson,
            execution: Execution::Pooled,
        }));
        registry.register(Arc::new(EchoProcessor {
            kind: JobKind::GenerateImage,
            execution: Execution::Inline,
        }));
        let engine = JobEngine::new(test_config(), registry);
        engine.spawn_scheduler();

        let inline_panic = engine
            .submit(JobClass::Normal, JobKind::SceneBlend, serde_json::json!({}))
            .await
            .unwrap();
        let pooled_panic = engine
            .submit(JobClass::Normal, JobKind::RemovePerson, serde_json::json!({}))
            .await
            .unwrap();
        let ok = engine
            .submit(JobClass::Normal, JobKind::GenerateImage, serde_json::json!({}))
            .await
            .unwrap();

        assert!(!wait_done(&engine, inline_panic).await.is_success());
        assert!(!wait_done(&engine, pooled_panic).await.is_success());
        assert!(wait_done(&engine, ok).await.is_success());
    }
}
