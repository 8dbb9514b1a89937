pub mod markdown;
pub mod staging;

use crate::db::{NewPost, Post, Repository, RepositoryError, blank_to_none};
use anyhow::anyhow;
use chrono::Utc;
use staging::{StagedUploads, UploadStore};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Multipart field an uploaded file arrived under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadField {
    Markdown,
    Image,
}

impl UploadField {
    pub fn name(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Image => "image",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "md" => Some(Self::Markdown),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },
    #[error("{field} exceeds the {limit} byte upload limit")]
    TooLarge { field: String, limit: u64 },
    #[error(transparent)]
    Storage(#[from] RepositoryError),
    #[error("upload I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// True when resubmitting different input could succeed.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::TooLarge { .. }
                | Self::Storage(RepositoryError::Constraint { .. })
        )
    }
}

pub struct IngestRequest {
    pub uploads: StagedUploads,
    /// Explicit title; wins over the heading and the filename.
    pub title: Option<String>,
    pub owner_id: i64,
}

/// Turns staged uploads into a persisted post. Whatever the outcome, no
/// staged file survives the call, and a promoted image is removed again
/// when the post could not be created.
#[derive(Clone)]
pub struct IngestPipeline {
    repository: Arc<dyn Repository>,
    store: Arc<UploadStore>,
}

impl IngestPipeline {
    pub fn new(repository: Arc<dyn Repository>, store: Arc<UploadStore>) -> Self {
        Self { repository, store }
    }

    pub fn store(&self) -> &UploadStore {
        &self.store
    }

    /// Runs on its own task so a dropped caller cannot interrupt cleanup.
    pub async fn ingest(&self, request: IngestRequest) -> Result<Post, IngestError> {
        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.process(request).await })
            .await
            .map_err(|error| IngestError::Storage(RepositoryError::Backend(anyhow!(error))))?
    }

    async fn process(&self, request: IngestRequest) -> Result<Post, IngestError> {
        let IngestRequest {
            mut uploads,
            title,
            owner_id,
        } = request;
        let mut persisted: Option<PathBuf> = None;

        let result = self
            .create(&mut uploads, title, owner_id, &mut persisted)
            .await;

        for (path, error) in uploads.discard_all().await {
            warn!(path = %path.display(), error = %error, "Failed to remove staged upload");
        }

        if result.is_err() {
            if let Some(path) = persisted {
                if let Err(error) = self.store.remove_persisted(&path).await {
                    warn!(path = %path.display(), error = %error, "Failed to remove persisted image");
                }
            }
        }

        match &result {
            Ok(post) => info!(post_id = post.id, title = %post.title, "Post created from upload"),
            Err(error) if error.is_client_error() => info!(error = %error, "Upload rejected"),
            Err(error) => warn!(error = %error, "Upload failed"),
        }

        result
    }

    async fn create(
        &self,
        uploads: &mut StagedUploads,
        title: Option<String>,
        owner_id: i64,
        persisted: &mut Option<PathBuf>,
    ) -> Result<Post, IngestError> {
        let document = match uploads.count(UploadField::Markdown) {
            0 => None,
            1 => uploads.get(UploadField::Markdown).cloned(),
            _ => {
                return Err(IngestError::validation(
                    UploadField::Markdown.name(),
                    "expected exactly one markdown file",
                ));
            }
        }
        .ok_or_else(|| IngestError::validation(UploadField::Markdown.name(), "missing markdown file"))?;

        if uploads.count(UploadField::Image) > 1 {
            return Err(IngestError::validation(
                UploadField::Image.name(),
                "expected at most one image",
            ));
        }
        markdown::validate_markdown(&document.original_name, document.mime_type.as_deref())?;
        let image = match uploads.get(UploadField::Image).cloned() {
            Some(image) => {
                let extension =
                    markdown::validate_image(&image.original_name, image.mime_type.as_deref())?;
                Some((image, extension))
            }
            None => None,
        };

        let limit = self.store.limits().max_file_bytes;
        let bytes = tokio::fs::read(&document.stored_path).await?;
        if bytes.len() as u64 > limit {
            return Err(IngestError::TooLarge {
                field: UploadField::Markdown.name().to_string(),
                limit,
            });
        }
        let content = String::from_utf8(bytes).map_err(|_| {
            IngestError::validation(UploadField::Markdown.name(), "markdown file must be UTF-8 text")
        })?;

        let title = title
            .and_then(blank_to_none)
            .unwrap_or_else(|| markdown::resolve_title(&content, &document.original_name));

        let image_url = match image {
            Some((image, extension)) => {
                let file_name = markdown::generated_file_name(
                    &image.original_name,
                    extension,
                    Utc::now().timestamp_millis(),
                    random_suffix(),
                );
                let destination = self.store.persisted_path(&file_name);
                uploads.promote(UploadField::Image, &destination).await?;
                *persisted = Some(destination);
                Some(self.store.public_url(&file_name))
            }
            None => None,
        };

        let repository = Arc::clone(&self.repository);
        let post = NewPost {
            title,
            content,
            image_url,
            owner_id,
        };

        tokio::task::spawn_blocking(move || repository.create_post(post))
            .await
            .map_err(|error| RepositoryError::Backend(anyhow!(error)))?
            .map_err(IngestError::from)
    }
}

fn random_suffix() -> u32 {
    (Uuid::new_v4().as_u128() % 1_000_000_000) as u32
}
