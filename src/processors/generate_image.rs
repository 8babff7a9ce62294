//! Scenery generation processor: text prompt to a streamed PNG.

use async_trait::async_trait;

use crate::engine::job::{JobKind, ResultPayload};
use crate::error::ProcessingError;
use crate::remote::{MediaExchange, ModelGateway};

use super::image_edit::required_str;
use super::{Execution, Processor};

/// Generates a scenery image from a text prompt. Network-bound end to
/// end, so it runs inline on the scheduler loop.
pub struct GenerateImageProcessor {
    media: MediaExchange,
    gateway: ModelGateway,
}

impl GenerateImageProcessor {
    pub fn new(media: MediaExchange, gateway: ModelGateway) -> Self {
        Self { media, gateway }
    }
}

#[async_trait]
impl Processor for GenerateImageProcessor {
    fn kind(&self) -> JobKind {
        JobKind::GenerateImage
    }

    fn execution(&self) -> Execution {
        Execution::Inline
    }

    async fn process(&self, payload: serde_json::Value) -> Result<ResultPayload, ProcessingError> {
        let prompt = required_str(&payload, "prompt")?;

        let url = self.gateway.generate_image(&prompt).await?;
        let bytes = self.media.fetch_bytes(&url).await?;

        Ok(ResultPayload::Stream {
            bytes,
            content_type: "image/png".to_string(),
        })
    }
}
