//! Person removal processor.

use async_trait::async_trait;

use crate::engine::job::{JobKind, ResultPayload};
use crate::error::ProcessingError;
use crate::remote::{MediaExchange, ModelGateway};

use super::image_edit::{EditPipeline, EditRequest};
use super::{Execution, Processor};

const REMOVE_PERSON_PROMPT: &str =
    "Remove all people from this image and output the edited image as a result.";

/// Removes people from a submitted image and uploads the edited result.
pub struct RemovePersonProcessor {
    pipeline: EditPipeline,
}

impl RemovePersonProcessor {
    pub fn new(media: MediaExchange, gateway: ModelGateway) -> Self {
        Self {
            pipeline: EditPipeline { media, gateway },
        }
    }
}

#[async_trait]
impl Processor for RemovePersonProcessor {
    fn kind(&self) -> JobKind {
        JobKind::RemovePerson
    }

    fn execution(&self) -> Execution {
        Execution::Pooled
    }

    async fn process(&self, payload: serde_json::Value) -> Result<ResultPayload, ProcessingError> {
        let request = EditRequest::from_payload(&payload)?;
        self.pipeline.run(&request, REMOVE_PERSON_PROMPT).await
    }
}
