//! HTTP upload client for submitting job payloads.
//!
//! Wraps the weaving service's multipart upload endpoint using
//! [`reqwest`]. A successful upload yields the [`JobHandle`] required to
//! open the progress channel.

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use weft_core::bundle::{AssetBundle, MediaBlob};
use weft_core::error::ValidationError;
use weft_core::job::JobHandle;

use crate::endpoints::ServiceEndpoints;

/// Multipart field holding the primary media.
const FIELD_PRIMARY: &str = "midi";
/// Repeated multipart field holding the palette entries, in palette order.
const FIELD_SOUNDS: &str = "sounds";

/// HTTP client for one weaving service.
pub struct UploadApi {
    client: reqwest::Client,
    endpoints: ServiceEndpoints,
}

/// Response returned by the upload endpoint after storing the payloads.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    job_id: String,
    remote_filename: String,
}

/// Error body the service attaches to a rejection, when it does.
#[derive(Debug, Deserialize)]
struct RejectionBody {
    detail: String,
}

/// Errors from the upload layer.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The bundle failed its submission preconditions; nothing was sent.
    #[error(transparent)]
    InvalidBundle(#[from] ValidationError),

    /// The HTTP request itself failed (network, DNS, TLS, ...).
    #[error("Upload request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service refused the submission, or answered with a body that
    /// is not the expected record.
    #[error("Upload rejected ({status}): {detail}")]
    Rejected { status: u16, detail: String },
}

impl UploadApi {
    /// Create an upload client for a weaving service.
    pub fn new(endpoints: ServiceEndpoints) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoints,
        }
    }

    /// Create an upload client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling with other callers).
    pub fn with_client(client: reqwest::Client, endpoints: ServiceEndpoints) -> Self {
        Self { client, endpoints }
    }

    /// Submit a bundle's binary payloads.
    ///
    /// The body carries one `midi` field for the primary media and one
    /// repeated `sounds` field per palette entry, in palette order. The
    /// server's `detail` is surfaced verbatim on rejection; a success
    /// status with an unreadable body is a rejection with a generic
    /// "malformed response" cause.
    pub async fn upload(&self, bundle: &AssetBundle) -> Result<JobHandle, UploadError> {
        let primary_entry = bundle.validate_for_submission()?;
        // validate_for_submission guarantees the primary media is present.
        let Some(primary_media) = bundle.primary_media.as_ref() else {
            return Err(UploadError::InvalidBundle(
                ValidationError::MissingPrimaryMedia,
            ));
        };

        let mut form = Form::new().part(FIELD_PRIMARY, blob_part(primary_media)?);
        for entry in &bundle.palette {
            form = form.part(FIELD_SOUNDS, blob_part(&entry.blob)?);
        }

        tracing::debug!(
            filename = %primary_media.filename,
            palette_len = bundle.palette.len(),
            primary_sound = %primary_entry.blob.filename,
            "Uploading job payloads",
        );

        let response = self
            .client
            .post(self.endpoints.upload_url())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<RejectionBody>()
                .await
                .map(|body| body.detail)
                .unwrap_or_else(|_| "upload rejected without detail".to_string());
            tracing::warn!(status = status.as_u16(), detail = %detail, "Upload rejected");
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        let body: UploadResponse =
            response.json().await.map_err(|_| UploadError::Rejected {
                status: status.as_u16(),
                detail: "malformed response".to_string(),
            })?;

        tracing::info!(
            job_id = %body.job_id,
            remote_filename = %body.remote_filename,
            "Upload accepted",
        );

        Ok(JobHandle {
            job_id: body.job_id,
            remote_filename: body.remote_filename,
        })
    }
}

/// Build a multipart part from a blob, carrying its filename and MIME type.
fn blob_part(blob: &MediaBlob) -> Result<Part, UploadError> {
    let part = Part::bytes(blob.bytes.clone())
        .file_name(blob.filename.clone())
        .mime_str(&blob.content_type)?;
    Ok(part)
}
