// ABOUTME: Media storage abstraction with a local-filesystem implementation
// ABOUTME: Uploads are content-type checked and stored under random names
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Media storage
//!
//! Post attachments and avatars go through [`MediaStore`]. The default
//! implementation writes to a local directory and hands back URLs under
//! `/media/`; swapping in an object-store backend only needs a new trait impl.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// Content types accepted for upload
const ALLOWED_CONTENT_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("image/svg+xml", "svg"),
    ("application/pdf", "pdf"),
];

/// Largest accepted upload, in bytes
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Storage backend for uploaded media
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store a blob and return its public URL
    async fn put(&self, data: Bytes, content_type: &str) -> AppResult<String>;

    /// Delete a previously stored blob by its public URL
    async fn delete(&self, url: &str) -> AppResult<()>;
}

/// Filesystem-backed media store
pub struct LocalMediaStore {
    root: PathBuf,
}

impl LocalMediaStore {
    /// Create a store rooted at the given directory
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn extension_for(content_type: &str) -> AppResult<&'static str> {
        ALLOWED_CONTENT_TYPES
            .iter()
            .find(|(ct, _)| *ct == content_type)
            .map(|(_, ext)| *ext)
            .ok_or_else(|| {
                AppError::new(
                    crate::errors::ErrorCode::UnsupportedMediaType,
                    format!("unsupported content type: {content_type}"),
                )
            })
    }

    fn path_for_url(&self, url: &str) -> AppResult<PathBuf> {
        let name = url
            .strip_prefix("/media/")
            .ok_or_else(|| AppError::invalid_input(format!("not a media URL: {url}")))?;
        // Stored names are uuid.ext, so anything with a path separator is bogus
        if name.contains('/') || name.contains("..") {
            return Err(AppError::invalid_input(format!("not a media URL: {url}")));
        }
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn put(&self, data: Bytes, content_type: &str) -> AppResult<String> {
        if data.is_empty() {
            return Err(AppError::invalid_input("upload body is empty"));
        }
        if data.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::invalid_input(format!(
                "upload exceeds {MAX_UPLOAD_BYTES} bytes"
            )));
        }
        let ext = Self::extension_for(content_type)?;
        let name = format!("{}.{ext}", Uuid::new_v4());

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::internal(format!("failed to create media root: {e}")))?;
        tokio::fs::write(self.root.join(&name), &data)
            .await
            .map_err(|e| AppError::internal(format!("failed to write media file: {e}")))?;

        Ok(format!("/media/{name}"))
    }

    async fn delete(&self, url: &str) -> AppResult<()> {
        let path = self.path_for_url(url)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::not_found(format!("media file {url}")))
            }
            Err(e) => Err(AppError::internal(format!(
                "failed to delete media file: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::new(dir.path().to_path_buf());

        let url = store
            .put(Bytes::from_static(b"\x89PNG fake"), "image/png")
            .await
            .unwrap();
        assert!(url.starts_with("/media/"));
        assert!(url.ends_with(".png"));

        store.delete(&url).await.unwrap();
        let err = store.delete(&url).await.unwrap_err();
        assert_eq!(err.http_status(), 404);
    }

    #[tokio::test]
    async fn unsupported_content_type_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::new(dir.path().to_path_buf());

        let err = store
            .put(Bytes::from_static(b"MZ"), "application/x-msdownload")
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 415);
    }

    #[tokio::test]
    async fn traversal_urls_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::new(dir.path().to_path_buf());

        assert!(store.delete("/media/../etc/passwd").await.is_err());
        assert!(store.delete("/elsewhere/file.png").await.is_err());
    }
}
