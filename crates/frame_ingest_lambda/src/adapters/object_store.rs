use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use tracing::{debug, info};

use crate::config::StoreSettings;
use crate::runtime::contract::PRESIGNED_URL_TTL_SECS;
use crate::runtime::naming::frames_prefix;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("failed to list s3://{bucket}/{prefix}: {message}")]
    List {
        bucket: String,
        prefix: String,
        message: String,
    },
    #[error("failed to presign s3://{bucket}/{key}: {message}")]
    Sign {
        bucket: String,
        key: String,
        message: String,
    },
}

/// Listing and URL signing for the frame images under one base prefix.
#[async_trait]
pub trait FrameStore: Send + Sync {
    /// Every key under `{prefix}/{frame folder}`, in store order, across all
    /// pages. An empty listing is not an error.
    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Presigned GET URL for `key`, valid for `PRESIGNED_URL_TTL_SECS`.
    async fn sign_url(&self, key: &str) -> Result<String, StoreError>;
}

#[derive(Debug, Clone)]
pub struct S3FrameStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    frame_folder: String,
}

impl S3FrameStore {
    pub fn new(
        client: aws_sdk_s3::Client,
        bucket: impl Into<String>,
        frame_folder: impl Into<String>,
    ) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            frame_folder: frame_folder.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl FrameStore for S3FrameStore {
    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let prefix = frames_prefix(prefix, &self.frame_folder);
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&prefix);
            if let Some(token) = &continuation_token {
                request = request.continuation_token(token);
            }

            let output = request.send().await.map_err(|error| StoreError::List {
                bucket: self.bucket.clone(),
                prefix: prefix.clone(),
                message: DisplayErrorContext(&error).to_string(),
            })?;
            pages += 1;

            keys.extend(
                output
                    .contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );

            continuation_token = match output.next_continuation_token() {
                Some(token) if output.is_truncated() == Some(true) => Some(token.to_string()),
                _ => break,
            };
            debug!(
                component = "object_store",
                event = "list_page_truncated",
                prefix = %prefix,
                keys_so_far = keys.len(),
            );
        }

        info!(
            component = "object_store",
            event = "list_completed",
            bucket = %self.bucket,
            prefix = %prefix,
            pages,
            objects = keys.len(),
        );
        Ok(keys)
    }

    async fn sign_url(&self, key: &str) -> Result<String, StoreError> {
        let sign_error = |message: String| StoreError::Sign {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            message,
        };

        let presigning = PresigningConfig::expires_in(Duration::from_secs(PRESIGNED_URL_TTL_SECS))
            .map_err(|error| sign_error(error.to_string()))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|error| sign_error(DisplayErrorContext(&error).to_string()))?;

        Ok(request.uri().to_string())
    }
}

/// Builds the S3 client once per process from the ambient AWS chain, with the
/// configured region and static credentials layered on top when present.
pub async fn build_s3_client(settings: &StoreSettings) -> aws_sdk_s3::Client {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(region) = &settings.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let (Some(access_key_id), Some(secret_access_key)) =
        (&settings.access_key_id, &settings.secret_access_key)
    {
        loader = loader.credentials_provider(Credentials::new(
            access_key_id.clone(),
            secret_access_key.clone(),
            None,
            None,
            "frame-ingest-static",
        ));
    }

    let sdk_config = loader.load().await;
    aws_sdk_s3::Client::new(&sdk_config)
}
