// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cloud Storage implementation of the blob store.

use crate::error::AppError;
use crate::storage::{content_type_for, BlobHandle, BlobStore, StorageError, StorageResult};
use async_trait::async_trait;
use google_cloud_storage::client::{Client, ClientConfig};
use google_cloud_storage::http::object_access_controls::insert::{
    InsertObjectAccessControlRequest, ObjectAccessControlCreationConfig,
};
use google_cloud_storage::http::object_access_controls::ObjectACLRole;
use google_cloud_storage::http::objects::get::GetObjectRequest;
use google_cloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};
use std::path::Path;

/// Cloud Storage bucket client.
#[derive(Clone)]
pub struct CloudStorage {
    bucket: String,
    client: Client,
}

impl CloudStorage {
    /// Connect to Cloud Storage using application default credentials.
    pub async fn new(bucket: &str) -> Result<Self, AppError> {
        let config = ClientConfig::default().with_auth().await.map_err(|e| {
            AppError::Internal(anyhow::anyhow!(
                "Failed to create Cloud Storage auth config: {}",
                e
            ))
        })?;

        tracing::info!(bucket, "Cloud Storage client initialized");

        Ok(Self {
            bucket: bucket.to_string(),
            client: Client::new(config),
        })
    }

    fn request_error(path: &str, err: impl std::fmt::Display) -> StorageError {
        StorageError::Request {
            path: path.to_string(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for CloudStorage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let request = GetObjectRequest {
            bucket: self.bucket.clone(),
            object: path.to_string(),
            ..Default::default()
        };

        match self.client.get_object(&request).await {
            Ok(_) => Ok(true),
            Err(google_cloud_storage::http::Error::Response(e)) if e.code == 404 => Ok(false),
            Err(e) => Err(Self::request_error(path, e)),
        }
    }

    async fn upload(&self, local_path: &Path, dest_path: &str) -> StorageResult<BlobHandle> {
        let data = tokio::fs::read(local_path)
            .await
            .map_err(|e| StorageError::LocalRead {
                path: local_path.display().to_string(),
                reason: e.to_string(),
            })?;
        let size = data.len() as u64;

        let mut media = Media::new(dest_path.to_string());
        media.content_type = content_type_for(dest_path).into();
        media.content_length = Some(size);

        let request = UploadObjectRequest {
            bucket: self.bucket.clone(),
            ..Default::default()
        };

        self.client
            .upload_object(&request, data, &UploadType::Simple(media))
            .await
            .map_err(|e| Self::request_error(dest_path, e))?;

        tracing::debug!(path = dest_path, size, "Uploaded object");

        Ok(BlobHandle {
            bucket: self.bucket.clone(),
            path: dest_path.to_string(),
            size,
        })
    }

    async fn make_public(&self, handle: &BlobHandle) -> StorageResult<()> {
        let request = InsertObjectAccessControlRequest {
            bucket: handle.bucket.clone(),
            object: handle.path.clone(),
            acl: ObjectAccessControlCreationConfig {
                entity: "allUsers".to_string(),
                role: ObjectACLRole::READER,
            },
            ..Default::default()
        };

        self.client
            .insert_object_access_control(&request)
            .await
            .map_err(|e| Self::request_error(&handle.path, e))?;
        Ok(())
    }
}
