//! Result store: job id to terminal outcome.

use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::job::JobOutcome;

/// In-memory outcome map. Entries go from absent to present(terminal);
/// the first write for an id wins and later writes are ignored. Outcomes
/// are retained until process exit.
pub struct ResultStore {
    outcomes: RwLock<HashMap<Uuid, JobOutcome>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self {
            outcomes: RwLock::new(HashMap::new()),
        }
    }

    /// Record the outcome for a job. Write-once: a duplicate write is
    /// dropped with a warning and the recorded outcome is unchanged.
    pub async fn put(&self, id: Uuid, outcome: JobOutcome) {
        let mut outcomes = self.outcomes.write().await;
        match outcomes.entry(id) {
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(outcome);
            }
            std::collections::hash_map::Entry::Occupied(_) => {
                tracing::warn!(job_id = %id, "Ignored duplicate outcome write");
            }
        }
    }

    /// Look up the outcome for a job. Absence means unknown or pending;
    /// the retrieval surface tells those apart.
    pub async fn get(&self, id: Uuid) -> Option<JobOutcome> {
        self.outcomes.read().await.get(&id).cloned()
    }
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new()
    }
}
