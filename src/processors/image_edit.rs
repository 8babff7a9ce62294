//! Shared pipeline for prompt-driven image edits.
//!
//! Both person removal and scene blending follow the same shape: fetch
//! the source image, downscale and re-encode it locally (the CPU-bound
//! share of the job, kept off the scheduler via the worker pool), send
//! it to the model gateway with an edit prompt, upload the edited image
//! to presigned storage, and notify the backend.

use bytes::Bytes;

use crate::engine::job::ResultPayload;
use crate::error::ProcessingError;
use crate::remote::{MediaExchange, ModelGateway};

/// Longest edge of the image sent to the gateway.
const GATEWAY_IMAGE_EDGE: u32 = 512;
/// JPEG quality for the gateway upload.
const GATEWAY_JPEG_QUALITY: u8 = 70;

/// Payload fields common to the edit kinds.
#[derive(Debug)]
pub(crate) struct EditRequest {
    pub media_id: String,
    pub download_url: String,
    pub target_s3_key: String,
}

impl EditRequest {
    /// Parse the common fields. `mediaId` may arrive as a number or a
    /// string; it is forwarded as a string either way.
    pub(crate) fn from_payload(payload: &serde_json::Value) -> Result<Self, ProcessingError> {
        Ok(Self {
            media_id: media_id_field(payload)?,
            download_url: required_str(payload, "downloadUrl")?,
            target_s3_key: required_str(payload, "targetAIS3Key")?,
        })
    }
}

pub(crate) fn required_str(
    payload: &serde_json::Value,
    field: &'static str,
) -> Result<String, ProcessingError> {
    payload
        .get(field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ProcessingError::InvalidPayload(format!("{field} is required")))
}

fn media_id_field(payload: &serde_json::Value) -> Result<String, ProcessingError> {
    match payload.get("mediaId") {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
        _ => Err(ProcessingError::InvalidPayload(
            "mediaId is required".to_string(),
        )),
    }
}

/// Prompt-driven edit pipeline shared by the pooled image kinds.
#[derive(Clone)]
pub(crate) struct EditPipeline {
    pub media: MediaExchange,
    pub gateway: ModelGateway,
}

impl EditPipeline {
    /// Run the full edit for one job and return its JSON result.
    pub(crate) async fn run(
        &self,
        request: &EditRequest,
        prompt: &str,
    ) -> Result<ResultPayload, ProcessingError> {
        let source = self.media.fetch_bytes(&request.download_url).await?;

        // Downscale and re-encode before shipping pixels to the gateway.
        // This is the tight CPU loop of the job; keep it off the async
        // workers.
        let jpeg = tokio::task::spawn_blocking(move || compress_jpeg(&source))
            .await
            .map_err(|e| ProcessingError::ImageEncode(format!("encode task failed: {e}")))??;

        let edited = self.gateway.edit_image(prompt, &jpeg).await?;

        let grant = self.media.request_upload_url(&request.target_s3_key).await?;
        self.media
            .upload_object(&grant.file_url, edited, "image/png")
            .await?;
        self.media
            .notify_callback(&request.media_id, &request.target_s3_key)
            .await?;

        Ok(ResultPayload::Json(serde_json::json!({
            "success": true,
            "result_s3_key": request.target_s3_key,
            "result_s3_url": grant.file_url,
        })))
    }
}

/// Decode, downscale to the gateway edge, and re-encode as JPEG.
fn compress_jpeg(bytes: &Bytes) -> Result<Vec<u8>, ProcessingError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| ProcessingError::ImageDecode(e.to_string()))?;
    let rgb = img
        .thumbnail(GATEWAY_IMAGE_EDGE, GATEWAY_IMAGE_EDGE)
        .to_rgb8();

    let mut out = Vec::new();
    let mut encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, GATEWAY_JPEG_QUALITY);
    encoder
        .encode(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| ProcessingError::ImageEncode(e.to_string()))?;
    Ok(out)
}
