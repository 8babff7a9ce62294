//! Video search client.
//!
//! Thin wrapper over a YouTube-style search API. The upstream service
//! tolerates only one outstanding call at a time, which is why jobs that
//! reach it are scheduled in the PRIORITY class; this client itself
//! performs a single bounded request.

use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::config::RemoteConfig;
use crate::error::RemoteError;

/// A matched music video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: ItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct ItemId {
    #[serde(rename = "videoId")]
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
}

#[derive(Clone)]
pub struct VideoSearch {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl VideoSearch {
    pub fn new(client: reqwest::Client, config: RemoteConfig) -> Self {
        Self { client, config }
    }

    /// Search for the best-matching music video. No match is `None`, not
    /// an error.
    pub async fn find_track(&self, query: &str) -> Result<Option<Track>, RemoteError> {
        let endpoint = &self.config.search_endpoint;
        tracing::debug!(query, "Searching for music video");

        let resp = self
            .client
            .get(endpoint)
            .timeout(self.config.call_timeout)
            .query(&[
                ("part", "snippet"),
                ("q", query),
                ("type", "video"),
                ("videoCategoryId", "10"),
                ("videoDuration", "medium"),
                ("maxResults", "1"),
                ("key", self.config.search_key.expose_secret()),
            ])
            .send()
            .await
            .map_err(|e| RemoteError::from_reqwest(endpoint, e))?;

        if !resp.status().is_success() {
            return Err(RemoteError::UnexpectedStatus {
                endpoint: endpoint.clone(),
                status: resp.status().as_u16(),
            });
        }

        let body: SearchResponse = resp
            .json()
            .await
            .map_err(|e| RemoteError::from_reqwest(endpoint, e))?;

        Ok(body.items.into_iter().next().map(|item| Track {
            url: format!("https://www.youtube.com/watch?v={}", item.id.video_id),
            title: item.snippet.title,
        }))
    }
}
