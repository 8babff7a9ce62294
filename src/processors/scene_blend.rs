//! Scene blend processor: re-lights a submitted image for a target time
//! of day.

use async_trait::async_trait;

use crate::engine::job::{JobKind, ResultPayload};
use crate::error::ProcessingError;
use crate::remote::{MediaExchange, ModelGateway};

use super::image_edit::{EditPipeline, EditRequest};
use super::{Execution, Processor};

/// Scene prompt catalog. Unknown scene types fall back to `night`.
fn scene_prompt(scene_type: &str) -> &'static str {
    match scene_type {
        "dawn" => "dawn view, early morning soft light, misty atmosphere, calm and serene",
        "sunset" => "sunset view, warm golden hour, glowing sky, tranquil and peaceful",
        "afternoon" => "afternoon view, bright sky, clear clouds, energetic and lively",
        _ => "night sky, stars, quiet, peaceful and dreamy",
    }
}

/// Replaces the scene lighting of a submitted image and uploads the
/// edited result.
pub struct SceneBlendProcessor {
    pipeline: EditPipeline,
}

impl SceneBlendProcessor {
    pub fn new(media: MediaExchange, gateway: ModelGateway) -> Self {
        Self {
            pipeline: EditPipeline { media, gateway },
        }
    }
}

#[async_trait]
impl Processor for SceneBlendProcessor {
    fn kind(&self) -> JobKind {
        JobKind::SceneBlend
    }

    fn execution(&self) -> Execution {
        Execution::Pooled
    }

    async fn process(&self, payload: serde_json::Value) -> Result<ResultPayload, ProcessingError> {
        let request = EditRequest::from_payload(&payload)?;
        let scene_type = payload
            .get("sceneType")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_lowercase())
            .unwrap_or_else(|| "night".to_string());

        let prompt = scene_prompt(&scene_type);
        tracing::debug!(scene_type = %scene_type, "Scene blend prompt selected");
        self.pipeline.run(&request, prompt).await
    }
}
