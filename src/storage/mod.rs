// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Blob storage for question pack images.

pub mod gcs;
pub mod memory;

pub use gcs::CloudStorage;
pub use memory::MemoryBlobStore;

use async_trait::async_trait;
use std::path::Path;

/// Host serving public objects.
pub const PUBLIC_HOST: &str = "https://storage.googleapis.com";

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Errors from blob storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to read {path}: {reason}")]
    LocalRead { path: String, reason: String },

    #[error("Storage request failed for {path}: {reason}")]
    Request { path: String, reason: String },
}

/// An uploaded object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobHandle {
    pub bucket: String,
    pub path: String,
    pub size: u64,
}

/// Public URL of an object, derived from bucket and path alone.
pub fn public_url(bucket: &str, path: &str) -> String {
    format!("{}/{}/{}", PUBLIC_HOST, bucket, path)
}

/// Object path for a public URL in `bucket`, if the URL points there.
pub fn path_from_public_url<'a>(bucket: &str, url: &'a str) -> Option<&'a str> {
    url.strip_prefix(PUBLIC_HOST)?
        .strip_prefix('/')?
        .strip_prefix(bucket)?
        .strip_prefix('/')
}

/// Content type for an image path, by extension.
pub fn content_type_for(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Path-keyed object storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    fn bucket(&self) -> &str;

    async fn exists(&self, path: &str) -> StorageResult<bool>;

    /// Upload a local file to `dest_path`, replacing any existing object.
    async fn upload(&self, local_path: &Path, dest_path: &str) -> StorageResult<BlobHandle>;

    /// Grant public read access to an uploaded object.
    async fn make_public(&self, handle: &BlobHandle) -> StorageResult<()>;

    fn public_url(&self, handle: &BlobHandle) -> String {
        public_url(&handle.bucket, &handle.path)
    }
}
