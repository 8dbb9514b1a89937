//! Streams a `multipart/form-data` post upload into the staging directory.

use crate::ingest::staging::{StagedUploads, UploadStore};
use crate::ingest::{IngestError, UploadField};
use axum::extract::Multipart;
use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;
use tracing::warn;

const TITLE_FIELD: &str = "title";
const OWNER_FIELD: &str = "ownerId";

pub struct UploadForm {
    pub uploads: StagedUploads,
    pub title: Option<String>,
    pub owner_id: Option<i64>,
}

/// Reads every field of the form. On failure the files staged so far are
/// deleted before the error is returned.
pub async fn read_upload_form(
    store: &UploadStore,
    multipart: &mut Multipart,
) -> Result<UploadForm, IngestError> {
    let mut uploads = store.begin();
    let mut title = None;
    let mut owner_id = None;

    let result = read_fields(store, multipart, &mut uploads, &mut title, &mut owner_id).await;
    match result {
        Ok(()) => Ok(UploadForm {
            uploads,
            title,
            owner_id,
        }),
        Err(error) => {
            for (path, failure) in uploads.discard_all().await {
                warn!(path = %path.display(), error = %failure, "Failed to remove staged upload");
            }
            Err(error)
        }
    }
}

async fn read_fields(
    store: &UploadStore,
    multipart: &mut Multipart,
    uploads: &mut StagedUploads,
    title: &mut Option<String>,
    owner_id: &mut Option<i64>,
) -> Result<(), IngestError> {
    let limit = store.limits().max_file_bytes;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|error| form_error("form", limit, error))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            TITLE_FIELD => {
                let value = field
                    .text()
                    .await
                    .map_err(|error| form_error(TITLE_FIELD, limit, error))?;
                *title = Some(value);
            }
            OWNER_FIELD => {
                let value = field
                    .text()
                    .await
                    .map_err(|error| form_error(OWNER_FIELD, limit, error))?;
                let parsed = value.trim().parse::<i64>().map_err(|_| {
                    IngestError::validation(OWNER_FIELD, "must be an integer")
                })?;
                *owner_id = Some(parsed);
            }
            other => {
                let upload = UploadField::from_name(other).ok_or_else(|| {
                    IngestError::validation(
                        if other.is_empty() { "form" } else { other },
                        "unexpected multipart field",
                    )
                })?;
                stage_field(store, uploads, upload, &mut field, limit).await?;
            }
        }
    }

    Ok(())
}

async fn stage_field(
    store: &UploadStore,
    uploads: &mut StagedUploads,
    upload: UploadField,
    field: &mut Field<'_>,
    limit: u64,
) -> Result<(), IngestError> {
    let original_name = field.file_name().unwrap_or_default().to_string();
    let mime_type = field.content_type().map(str::to_string);

    let mut writer = store
        .open(uploads, upload, &original_name, mime_type.as_deref())
        .await?;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|error| form_error(upload.name(), limit, error))?
    {
        writer.write_chunk(&chunk).await?;
    }
    writer.finish(uploads).await?;

    Ok(())
}

fn form_error(field: &str, limit: u64, error: MultipartError) -> IngestError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        IngestError::TooLarge {
            field: field.to_string(),
            limit,
        }
    } else {
        IngestError::validation(field, error.body_text())
    }
}
