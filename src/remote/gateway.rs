//! Model gateway client.
//!
//! The vision models sit behind a single HTTP proxy exposing two API
//! shapes: a generative-language `generateContent` endpoint (image edit
//! and captioning, images passed as base64 `inline_data`) and an
//! `images/generations` endpoint (text-to-image, result by URL).

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use secrecy::ExposeSecret;

use crate::config::RemoteConfig;
use crate::error::RemoteError;

/// Prompt used for captioning a scene's mood.
const CAPTION_PROMPT: &str =
    "Describe the mood of this image in one short sentence suitable as a music search query.";

#[derive(Clone)]
pub struct ModelGateway {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl ModelGateway {
    pub fn new(client: reqwest::Client, config: RemoteConfig) -> Self {
        Self { client, config }
    }

    fn generate_content_url(&self) -> String {
        format!(
            "{}/v1beta/models/gemini-2.5-flash:generateContent?key={}",
            self.config.gateway_base.trim_end_matches('/'),
            self.config.gateway_key.expose_secret()
        )
    }

    fn image_generations_url(&self) -> String {
        format!(
            "{}/v1/images/generations",
            self.config.gateway_base.trim_end_matches('/')
        )
    }

    /// Edit an image according to `prompt`, returning the edited image
    /// bytes. A text-only answer from the model is an error: the caller
    /// needs pixels.
    pub async fn edit_image(&self, prompt: &str, jpeg: &[u8]) -> Result<Bytes, RemoteError> {
        let endpoint = "gateway:generateContent";
        let payload = serde_json::json!({
            "contents": [{
                "parts": [
                    { "text": prompt },
                    { "inline_data": { "mime_type": "image/jpeg", "data": BASE64.encode(jpeg) } },
                ],
            }],
        });

        let body = self.post_generate_content(&payload).await?;
        let parts = content_parts(&body, endpoint)?;

        for part in parts {
            if let Some(data) = part
                .pointer("/inline_data/data")
                .or_else(|| part.pointer("/inlineData/data"))
                .and_then(|d| d.as_str())
            {
                let decoded = BASE64.decode(data).map_err(|e| RemoteError::InvalidResponse {
                    endpoint: endpoint.to_string(),
                    reason: format!("undecodable inline image: {e}"),
                })?;
                return Ok(Bytes::from(decoded));
            }
        }

        Err(RemoteError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: "no image part in model response".to_string(),
        })
    }

    /// Generate an image from a text prompt. Returns the URL the result
    /// can be fetched from.
    pub async fn generate_image(&self, prompt: &str) -> Result<String, RemoteError> {
        let endpoint = self.image_generations_url();
        tracing::debug!(prompt, "Requesting image generation");

        let resp = self
            .client
            .post(&endpoint)
            .timeout(self.config.call_timeout)
            .bearer_auth(self.config.gateway_key.expose_secret())
            .json(&serde_json::json!({
                "model": "dall-e-3",
                "prompt": prompt,
                "size": "1024x1024",
            }))
            .send()
            .await
            .map_err(|e| RemoteError::from_reqwest(&endpoint, e))?;

        if !resp.status().is_success() {
            return Err(RemoteError::UnexpectedStatus {
                endpoint,
                status: resp.status().as_u16(),
            });
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| RemoteError::from_reqwest(&endpoint, e))?;

        body.pointer("/data/0/url")
            .and_then(|u| u.as_str())
            .map(str::to_string)
            .ok_or_else(|| RemoteError::InvalidResponse {
                endpoint,
                reason: "missing data[0].url".to_string(),
            })
    }

    /// Caption the mood of an image as a single sentence.
    pub async fn caption_image(&self, jpeg: &[u8]) -> Result<String, RemoteError> {
        let endpoint = "gateway:generateContent";
        let payload = serde_json::json!({
            "contents": [{
                "parts": [
                    { "text": CAPTION_PROMPT },
                    { "inline_data": { "mime_type": "image/jpeg", "data": BASE64.encode(jpeg) } },
                ],
            }],
        });

        let body = self.post_generate_content(&payload).await?;
        let parts = content_parts(&body, endpoint)?;

        parts
            .iter()
            .find_map(|part| part.get("text").and_then(|t| t.as_str()))
            .map(|caption| caption.trim().to_string())
            .filter(|caption| !caption.is_empty())
            .ok_or_else(|| RemoteError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: "no text part in model response".to_string(),
            })
    }

    async fn post_generate_content(
        &self,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, RemoteError> {
        let url = self.generate_content_url();
        let endpoint = "gateway:generateContent";

        let resp = self
            .client
            .post(&url)
            .timeout(self.config.call_timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| RemoteError::from_reqwest(endpoint, e))?;

        if !resp.status().is_success() {
            return Err(RemoteError::UnexpectedStatus {
                endpoint: endpoint.to_string(),
                status: resp.status().as_u16(),
            });
        }

        resp.json()
            .await
            .map_err(|e| RemoteError::from_reqwest(endpoint, e))
    }
}

/// Extract the first candidate's content parts from a generateContent
/// response body.
fn content_parts<'a>(
    body: &'a serde_json::Value,
    endpoint: &str,
) -> Result<&'a Vec<serde_json::Value>, RemoteError> {
    body.pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| RemoteError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: "missing candidates[0].content.parts".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_parts_extracts_first_candidate() {
        let body = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "calm lake at dusk" }] } }],
        });
        let parts = content_parts(&body, "test").unwrap();
        assert_eq!(parts[0]["text"], "calm lake at dusk");
    }

    #[test]
    fn content_parts_rejects_empty_body() {
        let body = serde_json::json!({ "error": "quota" });
        assert!(content_parts(&body, "test").is_err());
    }
}
