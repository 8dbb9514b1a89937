//! Temporary upload files and their promotion into the public upload directory.
//!
//! Files land in a staging directory that is never served. A [`StagedUploads`]
//! guard owns every staged path for one request and deletes each of them
//! exactly once, either explicitly through [`StagedUploads::discard_all`] or
//! from `Drop` when the request future is abandoned.

use super::{IngestError, UploadField};
use crate::config::Config;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

pub const PUBLIC_PREFIX: &str = "/uploads";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_file_bytes: u64,
    pub max_files: usize,
}

impl UploadLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_file_bytes: config.max_upload_bytes,
            max_files: config.max_upload_files,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub field: UploadField,
    pub stored_path: PathBuf,
    pub original_name: String,
    pub mime_type: Option<String>,
    pub size: u64,
}

#[derive(Debug)]
pub struct StagedUploads {
    files: Vec<UploadedFile>,
    max_files: usize,
}

impl StagedUploads {
    pub fn new(limits: UploadLimits) -> Self {
        Self {
            files: Vec::new(),
            max_files: limits.max_files,
        }
    }

    #[cfg(test)]
    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn count(&self, field: UploadField) -> usize {
        self.files.iter().filter(|file| file.field == field).count()
    }

    pub fn get(&self, field: UploadField) -> Option<&UploadedFile> {
        self.files.iter().find(|file| file.field == field)
    }

    fn track(&mut self, file: UploadedFile) -> Result<(), IngestError> {
        if self.files.len() >= self.max_files {
            return Err(IngestError::validation(
                file.field.name(),
                format!("at most {} files per request", self.max_files),
            ));
        }
        self.files.push(file);
        Ok(())
    }

    fn record_size(&mut self, path: &Path, size: u64) {
        if let Some(file) = self.files.iter_mut().find(|file| file.stored_path == path) {
            file.size = size;
        }
    }

    /// Moves the staged file for `field` to `destination`. The guard stops
    /// tracking it, so later cleanup never touches the promoted copy.
    pub async fn promote(
        &mut self,
        field: UploadField,
        destination: &Path,
    ) -> io::Result<Option<UploadedFile>> {
        let Some(index) = self.files.iter().position(|file| file.field == field) else {
            return Ok(None);
        };

        move_file(&self.files[index].stored_path, destination).await?;
        let mut file = self.files.remove(index);
        file.stored_path = destination.to_path_buf();
        Ok(Some(file))
    }

    /// Deletes every staged file still tracked and returns the failures.
    pub async fn discard_all(&mut self) -> Vec<(PathBuf, io::Error)> {
        let mut failures = Vec::new();

        while let Some(file) = self.files.pop() {
            match fs::remove_file(&file.stored_path).await {
                Ok(()) => debug!(path = %file.stored_path.display(), "staged upload removed"),
                Err(error) if error.kind() == io::ErrorKind::NotFound => {}
                Err(error) => failures.push((file.stored_path, error)),
            }
        }

        failures
    }
}

impl Drop for StagedUploads {
    fn drop(&mut self) {
        for file in self.files.drain(..) {
            let _ = std::fs::remove_file(&file.stored_path);
        }
    }
}

/// Writes one staged file chunk by chunk, enforcing the per-file limit.
pub struct StagedWriter {
    file: fs::File,
    path: PathBuf,
    field: UploadField,
    written: u64,
    limit: u64,
}

impl StagedWriter {
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), IngestError> {
        self.written = self.written.saturating_add(chunk.len() as u64);
        if self.written > self.limit {
            return Err(IngestError::TooLarge {
                field: self.field.name().to_string(),
                limit: self.limit,
            });
        }
        self.file.write_all(chunk).await?;
        Ok(())
    }

    pub async fn finish(mut self, uploads: &mut StagedUploads) -> Result<u64, IngestError> {
        self.file.flush().await?;
        uploads.record_size(&self.path, self.written);
        Ok(self.written)
    }
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    public_dir: PathBuf,
    staging_dir: PathBuf,
    limits: UploadLimits,
}

impl UploadStore {
    pub fn new(public_dir: PathBuf, staging_dir: PathBuf, limits: UploadLimits) -> Self {
        Self {
            public_dir,
            staging_dir,
            limits,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.upload_dir.clone(),
            config.staging_dir.clone(),
            UploadLimits::from_config(config),
        )
    }

    pub fn limits(&self) -> UploadLimits {
        self.limits
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    #[cfg(test)]
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub fn begin(&self) -> StagedUploads {
        StagedUploads::new(self.limits)
    }

    pub async fn prepare(&self) -> io::Result<()> {
        fs::create_dir_all(&self.public_dir).await?;
        fs::create_dir_all(&self.staging_dir).await
    }

    fn staging_path(&self) -> PathBuf {
        self.staging_dir.join(format!("{}.part", Uuid::new_v4().simple()))
    }

    /// Opens a new staged file. It is tracked before the first byte is
    /// written so a failed write still gets cleaned up.
    pub async fn open(
        &self,
        uploads: &mut StagedUploads,
        field: UploadField,
        original_name: &str,
        mime_type: Option<&str>,
    ) -> Result<StagedWriter, IngestError> {
        let path = self.staging_path();
        uploads.track(UploadedFile {
            field,
            stored_path: path.clone(),
            original_name: original_name.to_string(),
            mime_type: mime_type.map(str::to_string),
            size: 0,
        })?;

        fs::create_dir_all(&self.staging_dir).await?;
        let file = fs::File::create(&path).await?;

        Ok(StagedWriter {
            file,
            path,
            field,
            written: 0,
            limit: self.limits.max_file_bytes,
        })
    }

    pub async fn stage_bytes(
        &self,
        uploads: &mut StagedUploads,
        field: UploadField,
        original_name: &str,
        mime_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<u64, IngestError> {
        let mut writer = self.open(uploads, field, original_name, mime_type).await?;
        writer.write_chunk(bytes).await?;
        writer.finish(uploads).await
    }

    /// Stages a copy of a local file, guessing its MIME type from the name.
    pub async fn stage_file(
        &self,
        uploads: &mut StagedUploads,
        field: UploadField,
        source: &Path,
    ) -> Result<u64, IngestError> {
        let original_name = source
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let mime_type = mime_guess::from_path(source).first_raw();

        let size = fs::metadata(source).await?.len();
        if size > self.limits.max_file_bytes {
            return Err(IngestError::TooLarge {
                field: field.name().to_string(),
                limit: self.limits.max_file_bytes,
            });
        }

        let bytes = fs::read(source).await?;
        self.stage_bytes(uploads, field, &original_name, mime_type, &bytes)
            .await
    }

    pub fn persisted_path(&self, file_name: &str) -> PathBuf {
        self.public_dir.join(file_name)
    }

    pub fn public_url(&self, file_name: &str) -> String {
        format!("{PUBLIC_PREFIX}/{file_name}")
    }

    pub async fn remove_persisted(&self, path: &Path) -> io::Result<()> {
        match fs::remove_file(path).await {
            Err(error) if error.kind() != io::ErrorKind::NotFound => Err(error),
            _ => Ok(()),
        }
    }
}

async fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).await?;
    }

    if fs::rename(source, destination).await.is_ok() {
        return Ok(());
    }

    // Staging and public dirs may sit on different filesystems.
    fs::copy(source, destination).await?;
    fs::remove_file(source).await
}

#[cfg(test)]
mod tests {
    use super::{UploadLimits, UploadStore};
    use crate::ingest::{IngestError, UploadField};
    use tempfile::TempDir;

    fn store(dir: &TempDir, max_file_bytes: u64) -> UploadStore {
        UploadStore::new(
            dir.path().join("uploads"),
            dir.path().join("staging"),
            UploadLimits {
                max_file_bytes,
                max_files: 2,
            },
        )
    }

    fn entries(path: &std::path::Path) -> usize {
        std::fs::read_dir(path).map(|dir| dir.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn discard_removes_each_file_once() {
        let dir = TempDir::new().expect("tempdir");
        let store = store(&dir, 1024);
        let mut uploads = store.begin();

        store
            .stage_bytes(&mut uploads, UploadField::Markdown, "a.md", None, b"# A")
            .await
            .expect("stage md");
        assert_eq!(entries(store.staging_dir()), 1);

        assert!(uploads.discard_all().await.is_empty());
        assert!(uploads.discard_all().await.is_empty());
        assert!(uploads.is_empty());
        assert_eq!(entries(store.staging_dir()), 0);
    }

    #[tokio::test]
    async fn dropping_the_guard_cleans_up() {
        let dir = TempDir::new().expect("tempdir");
        let store = store(&dir, 1024);

        {
            let mut uploads = store.begin();
            store
                .stage_bytes(&mut uploads, UploadField::Image, "c.png", None, b"png")
                .await
                .expect("stage image");
        }

        assert_eq!(entries(store.staging_dir()), 0);
    }

    #[tokio::test]
    async fn oversized_chunk_is_rejected_and_still_tracked() {
        let dir = TempDir::new().expect("tempdir");
        let store = store(&dir, 4);
        let mut uploads = store.begin();

        let result = store
            .stage_bytes(&mut uploads, UploadField::Markdown, "a.md", None, b"too long")
            .await;

        assert!(matches!(result, Err(IngestError::TooLarge { limit: 4, .. })));
        assert_eq!(uploads.files().len(), 1);
        uploads.discard_all().await;
        assert_eq!(entries(store.staging_dir()), 0);
    }

    #[tokio::test]
    async fn file_count_is_capped() {
        let dir = TempDir::new().expect("tempdir");
        let store = store(&dir, 1024);
        let mut uploads = store.begin();

        for name in ["a.md", "b.png"] {
            store
                .stage_bytes(&mut uploads, UploadField::Markdown, name, None, b"x")
                .await
                .expect("stage");
        }
        let third = store
            .stage_bytes(&mut uploads, UploadField::Image, "c.png", None, b"x")
            .await;

        assert!(matches!(third, Err(IngestError::Validation { .. })));
        assert_eq!(entries(store.staging_dir()), 2);
    }

    #[tokio::test]
    async fn promoted_file_leaves_the_guard() {
        let dir = TempDir::new().expect("tempdir");
        let store = store(&dir, 1024);
        let mut uploads = store.begin();
        store
            .stage_bytes(&mut uploads, UploadField::Image, "c.png", None, b"png")
            .await
            .expect("stage image");

        let destination = store.persisted_path("c-1-1.png");
        let promoted = uploads
            .promote(UploadField::Image, &destination)
            .await
            .expect("promote")
            .expect("image staged");
        drop(uploads);

        assert_eq!(promoted.stored_path, destination);
        assert_eq!(promoted.size, 3);
        assert!(destination.exists());
        assert_eq!(store.public_url("c-1-1.png"), "/uploads/c-1-1.png");
    }
}
