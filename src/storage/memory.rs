// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory blob store for tests and offline mode.

use crate::storage::{BlobHandle, BlobStore, StorageError, StorageResult};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Blob store keeping objects in memory.
pub struct MemoryBlobStore {
    bucket: String,
    objects: DashMap<String, Vec<u8>>,
    public: DashSet<String>,
    failing_paths: DashSet<String>,
    uploads: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            objects: DashMap::new(),
            public: DashSet::new(),
            failing_paths: DashSet::new(),
            uploads: AtomicUsize::new(0),
        }
    }

    /// Store an object directly, as if uploaded by an earlier run.
    pub fn insert(&self, path: &str, data: Vec<u8>) {
        self.objects.insert(path.to_string(), data);
        self.public.insert(path.to_string());
    }

    /// Make uploads to `path` fail.
    pub fn fail_uploads_to(&self, path: &str) {
        self.failing_paths.insert(path.to_string());
    }

    /// Number of uploads performed.
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn object(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.get(path).map(|data| data.clone())
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public.contains(path)
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        Ok(self.objects.contains_key(path))
    }

    async fn upload(&self, local_path: &Path, dest_path: &str) -> StorageResult<BlobHandle> {
        if self.failing_paths.contains(dest_path) {
            return Err(StorageError::Request {
                path: dest_path.to_string(),
                reason: "injected upload failure".to_string(),
            });
        }

        let data = tokio::fs::read(local_path)
            .await
            .map_err(|e| StorageError::LocalRead {
                path: local_path.display().to_string(),
                reason: e.to_string(),
            })?;
        let size = data.len() as u64;

        self.objects.insert(dest_path.to_string(), data);
        self.uploads.fetch_add(1, Ordering::SeqCst);

        Ok(BlobHandle {
            bucket: self.bucket.clone(),
            path: dest_path.to_string(),
            size,
        })
    }

    async fn make_public(&self, handle: &BlobHandle) -> StorageResult<()> {
        self.public.insert(handle.path.clone());
        Ok(())
    }
}
