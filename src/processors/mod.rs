//! Processing functions for job kinds.
//!
//! Each [`Processor`] handles one [`JobKind`]. The engine treats payloads
//! as opaque; the processor parses its own. Network-bound processors run
//! inline on the scheduler loop, CPU/GPU-bound ones are submitted to the
//! worker pool.

pub mod generate_image;
mod image_edit;
pub mod recommend_music;
pub mod remove_person;
pub mod scene_blend;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::engine::job::{JobKind, ResultPayload};
use crate::error::ProcessingError;

/// Where a processor's work is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// Runs on the scheduler loop, suspending on I/O.
    Inline,
    /// Submitted to the worker pool; must not depend on scheduler-local
    /// state (copy-in payload, copy-out result).
    Pooled,
}

/// A processing function for one job kind.
#[async_trait]
pub trait Processor: Send + Sync {
    /// The job kind this processor handles.
    fn kind(&self) -> JobKind;

    /// Execution placement for this processor's work.
    fn execution(&self) -> Execution;

    /// Run the job. Every network call inside must carry its own bounded
    /// timeout; errors are absorbed into a Failure outcome by the caller.
    async fn process(&self, payload: serde_json::Value) -> Result<ResultPayload, ProcessingError>;
}

/// Registry of processors, keyed by job kind. Built once at startup.
pub struct ProcessorRegistry {
    processors: HashMap<JobKind, Arc<dyn Processor>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self {
            processors: HashMap::new(),
        }
    }

    /// Register a processor. Replaces any previous registration for the
    /// same kind.
    pub fn register(&mut self, processor: Arc<dyn Processor>) {
        let kind = processor.kind();
        if self.processors.insert(kind, processor).is_some() {
            tracing::warn!(kind = %kind, "Replaced existing processor registration");
        } else {
            tracing::debug!(kind = %kind, "Registered processor");
        }
    }

    pub fn get(&self, kind: JobKind) -> Option<Arc<dyn Processor>> {
        self.processors.get(&kind).cloned()
    }

    pub fn has(&self, kind: JobKind) -> bool {
        self.processors.contains_key(&kind)
    }

    pub fn count(&self) -> usize {
        self.processors.len()
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
