//! Worker pool: bounded execution slots for heavy processing.
//!
//! Submissions land in an internal FIFO channel consumed by N long-lived
//! worker tasks, so admission order is fixed at submit time and overflow
//! queues here, in the channel, not in the intake queues. The pool is
//! created once at startup and lives for the process lifetime.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, mpsc, oneshot};

/// A unit of pooled work with its result channel already bound.
type PoolJob = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Bounded pool of execution slots.
pub struct WorkerPool {
    queue: mpsc::UnboundedSender<PoolJob>,
    running: Arc<AtomicUsize>,
    capacity: usize,
}

impl WorkerPool {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "worker pool capacity must be at least 1");

        let (tx, rx) = mpsc::unbounded_channel::<PoolJob>();
        let rx = Arc::new(Mutex::new(rx));
        let running = Arc::new(AtomicUsize::new(0));

        // N workers share one receiver; each takes the channel head in
        // turn, so jobs start in submission order. The workers exit when
        // the pool (the only sender) is dropped.
        for _ in 0..capacity {
            let rx = Arc::clone(&rx);
            let running = Arc::clone(&running);
            tokio::spawn(async move {
                loop {
                    let job = rx.lock().await.recv().await;
                    let Some(job) = job else { break };
                    running.fetch_add(1, Ordering::SeqCst);
                    // A panicking job unwinds its own task, not the worker.
                    let _ = tokio::spawn(job).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                }
            });
        }

        Self {
            queue: tx,
            running,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of jobs currently executing on the workers.
    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    /// Submit a unit of work. Returns immediately with a receiver for the
    /// result; the work starts once every earlier submission has been
    /// taken up by a worker, so start order follows submission order.
    ///
    /// A failure (or panic) inside the work surfaces only through the
    /// returned receiver: the worker slot is released on the way out and
    /// other submissions are unaffected. A dropped receiver abandons the
    /// result but still runs the work to completion.
    pub fn submit<F, T>(&self, work: F) -> oneshot::Receiver<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: PoolJob = Box::pin(async move {
            let result = work.await;
            let _ = tx.send(result);
        });
        // The channel is unbounded and the workers live as long as the
        // pool, so the send cannot fail while the pool exists.
        let _ = self.queue.send(job);
        rx
    }
}
