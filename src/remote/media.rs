//! Media exchange client: source fetch, presigned upload, callback.
//!
//! Protocol follows the backend's AI integration contract: the service
//! authenticates with an `X-AI-Token` header, asks for a presigned
//! storage URL for a target object key, PUTs the result bytes there, and
//! then notifies the backend that the derived media exists.

use bytes::Bytes;
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::config::RemoteConfig;
use crate::error::RemoteError;

const AI_TOKEN_HEADER: &str = "X-AI-Token";

/// Presigned upload grant returned by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadGrant {
    #[serde(rename = "s3ObjectKey")]
    pub s3_object_key: String,
    #[serde(rename = "fileUrl")]
    pub file_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadUrlResponse {
    status: i64,
    data: Option<UploadGrant>,
}

/// Client for the media exchange collaborators.
#[derive(Clone)]
pub struct MediaExchange {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl MediaExchange {
    pub fn new(client: reqwest::Client, config: RemoteConfig) -> Self {
        Self { client, config }
    }

    /// Download raw bytes from a caller-supplied URL (the source image).
    pub async fn fetch_bytes(&self, url: &str) -> Result<Bytes, RemoteError> {
        tracing::debug!(url, "Fetching source bytes");
        let resp = self
            .client
            .get(url)
            .timeout(self.config.call_timeout)
            .send()
            .await
            .map_err(|e| RemoteError::from_reqwest(url, e))?;

        if !resp.status().is_success() {
            return Err(RemoteError::UnexpectedStatus {
                endpoint: url.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| RemoteError::from_reqwest(url, e))?;
        if bytes.is_empty() {
            return Err(RemoteError::InvalidResponse {
                endpoint: url.to_string(),
                reason: "empty body".to_string(),
            });
        }
        Ok(bytes)
    }

    /// Request a presigned upload URL for the target object key. The
    /// grant must echo the requested key back.
    pub async fn request_upload_url(&self, s3_object_key: &str) -> Result<UploadGrant, RemoteError> {
        let endpoint = &self.config.upload_url_endpoint;
        tracing::debug!(key = s3_object_key, "Requesting presigned upload URL");

        let resp = self
            .client
            .post(endpoint)
            .timeout(self.config.call_timeout)
            .header(AI_TOKEN_HEADER, self.config.ai_token.expose_secret())
            .json(&serde_json::json!({ "s3ObjectKey": s3_object_key }))
            .send()
            .await
            .map_err(|e| RemoteError::from_reqwest(endpoint, e))?;

        if !resp.status().is_success() {
            return Err(RemoteError::UnexpectedStatus {
                endpoint: endpoint.clone(),
                status: resp.status().as_u16(),
            });
        }

        let body: UploadUrlResponse = resp
            .json()
            .await
            .map_err(|e| RemoteError::from_reqwest(endpoint, e))?;

        let grant = match body {
            UploadUrlResponse {
                status: 200,
                data: Some(grant),
            } => grant,
            _ => {
                return Err(RemoteError::InvalidResponse {
                    endpoint: endpoint.clone(),
                    reason: "missing data or non-200 wrapper status".to_string(),
                });
            }
        };

        if grant.s3_object_key != s3_object_key {
            return Err(RemoteError::InvalidResponse {
                endpoint: endpoint.clone(),
                reason: format!(
                    "object key mismatch: requested {s3_object_key}, granted {}",
                    grant.s3_object_key
                ),
            });
        }
        Ok(grant)
    }

    /// PUT result bytes to the presigned URL. 200 and 201 both count as
    /// accepted.
    pub async fn upload_object(
        &self,
        file_url: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), RemoteError> {
        tracing::debug!(url = file_url, size = bytes.len(), "Uploading result object");
        let resp = self
            .client
            .put(file_url)
            .timeout(self.config.upload_timeout)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| RemoteError::from_reqwest(file_url, e))?;

        match resp.status().as_u16() {
            200 | 201 => Ok(()),
            status => Err(RemoteError::UnexpectedStatus {
                endpoint: file_url.to_string(),
                status,
            }),
        }
    }

    /// Notify the backend that the derived media has been uploaded.
    pub async fn notify_callback(
        &self,
        media_id: &str,
        s3_object_key: &str,
    ) -> Result<(), RemoteError> {
        let endpoint = &self.config.callback_endpoint;
        tracing::debug!(media_id, key = s3_object_key, "Sending upload callback");

        let resp = self
            .client
            .post(endpoint)
            .timeout(self.config.call_timeout)
            .header(AI_TOKEN_HEADER, self.config.ai_token.expose_secret())
            .json(&serde_json::json!({
                "parentMediaId": media_id,
                "s3ObjectKey": s3_object_key,
                "fileType": "IMAGE",
            }))
            .send()
            .await
            .map_err(|e| RemoteError::from_reqwest(endpoint, e))?;

        match resp.status().as_u16() {
            200 | 201 => Ok(()),
            status => Err(RemoteError::UnexpectedStatus {
                endpoint: endpoint.clone(),
                status,
            }),
        }
    }
}
