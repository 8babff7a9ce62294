//! Music recommendation processor.
//!
//! Captions the mood of a submitted image and searches for a matching
//! piano track. This is the PRIORITY kind: the search collaborator
//! behaves correctly only with a single outstanding call, which the
//! scheduler's at-most-one-priority-in-flight rule guarantees.

use async_trait::async_trait;

use crate::engine::job::{JobKind, ResultPayload};
use crate::error::ProcessingError;
use crate::remote::{MediaExchange, ModelGateway, VideoSearch};

use super::image_edit::required_str;
use super::{Execution, Processor};

/// Appended to the mood caption to bias the search toward usable
/// background music.
const QUERY_SUFFIX: &str = " piano music";

pub struct RecommendMusicProcessor {
    media: MediaExchange,
    gateway: ModelGateway,
    search: VideoSearch,
}

impl RecommendMusicProcessor {
    pub fn new(media: MediaExchange, gateway: ModelGateway, search: VideoSearch) -> Self {
        Self {
            media,
            gateway,
            search,
        }
    }
}

#[async_trait]
impl Processor for RecommendMusicProcessor {
    fn kind(&self) -> JobKind {
        JobKind::RecommendMusic
    }

    fn execution(&self) -> Execution {
        Execution::Inline
    }

    async fn process(&self, payload: serde_json::Value) -> Result<ResultPayload, ProcessingError> {
        let download_url = required_str(&payload, "downloadUrl")?;

        let bytes = self.media.fetch_bytes(&download_url).await?;
        let caption = self.gateway.caption_image(&bytes).await?;
        let query = format!("{caption}{QUERY_SUFFIX}");

        let result = match self.search.find_track(&query).await? {
            Some(track) => serde_json::json!({
                "success": true,
                "message": format!("Found song '{}'", track.title),
                "youtube_url": track.url,
                "mood_caption": caption,
            }),
            // No match is a normal answer, not a failure.
            None => serde_json::json!({
                "success": false,
                "message": "No matching music found.",
                "mood_caption": caption,
            }),
        };

        Ok(ResultPayload::Json(result))
    }
}
