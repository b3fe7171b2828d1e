//! S3-backed object store for source snapshots.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use tracing::{debug, info};

use crate::error::GatewayError;
use crate::traits::ObjectStore;
use crate::Result;

/// Default bucket holding worker assets.
pub const DEFAULT_SNAPSHOT_BUCKET: &str = "spacecat-dev-mystique-assets";

/// [`ObjectStore`] over a single S3 bucket.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(sdk_config: &SdkConfig, bucket: &str) -> Self {
        S3ObjectStore {
            client: aws_sdk_s3::Client::new(sdk_config),
            bucket: bucket.to_string(),
        }
    }
}

fn sdk_error<E>(err: E) -> GatewayError
where
    E: std::error::Error,
{
    GatewayError::ObjectStore(DisplayErrorContext(err).to_string())
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn size_of(&self, key: &str) -> Result<Option<u64>> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(head) => Ok(Some(head.content_length().unwrap_or(0).max(0) as u64)),
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|service| service.is_not_found())
                    .unwrap_or(false)
                {
                    debug!(key = %key, "object not found");
                    Ok(None)
                } else {
                    Err(sdk_error(err))
                }
            }
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        info!(bucket = %self.bucket, key = %key, size = bytes.len(), "uploading object");
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .send()
            .await
            .map_err(sdk_error)?;

        let mut objects: Vec<(i64, String)> = output
            .contents()
            .iter()
            .filter_map(|object| {
                let key = object.key()?.to_string();
                let modified = object.last_modified().map(|t| t.secs()).unwrap_or(0);
                Some((modified, key))
            })
            .collect();
        objects.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        Ok(objects.into_iter().map(|(_, key)| key).collect())
    }
}
