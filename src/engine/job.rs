//! Job data model.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scheduling class of a job. Declared in descending precedence order:
/// `Priority` always wins arbitration over `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobClass {
    Priority,
    Normal,
}

impl JobClass {
    /// All classes, highest precedence first. The scheduler services
    /// queues in this order.
    pub const ORDERED: [JobClass; 2] = [JobClass::Priority, JobClass::Normal];
}

impl std::fmt::Display for JobClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Priority => write!(f, "priority"),
            Self::Normal => write!(f, "normal"),
        }
    }
}

/// Operation type of a job. Selects the processing function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    RemovePerson,
    SceneBlend,
    GenerateImage,
    RecommendMusic,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::RemovePerson => "remove_person",
            Self::SceneBlend => "scene_blend",
            Self::GenerateImage => "generate_image",
            Self::RecommendMusic => "recommend_music",
        };
        write!(f, "{s}")
    }
}

/// A unit of submitted work. The payload is opaque to the engine; the
/// processor selected by `kind` interprets it.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub class: JobClass,
    pub kind: JobKind,
    pub payload: serde_json::Value,
    pub submitted_at: DateTime<Utc>,
}

impl Job {
    /// Create a job with a fresh id, stamped now.
    pub fn new(class: JobClass, kind: JobKind, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            class,
            kind,
            payload,
            submitted_at: Utc::now(),
        }
    }
}

/// Successful result data: either a JSON-serializable structure or a
/// binary payload streamed back with its content type.
#[derive(Debug, Clone)]
pub enum ResultPayload {
    Json(serde_json::Value),
    Stream { bytes: Bytes, content_type: String },
}

/// Terminal outcome of a job. Written once per id; immutable thereafter.
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Success(ResultPayload),
    Failure {
        message: String,
        detail: Option<String>,
    },
}

impl JobOutcome {
    /// Shorthand for a failure without detail.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
            detail: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}
