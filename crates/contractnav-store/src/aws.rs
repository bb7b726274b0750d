//! AWS S3 client for the object-store backend
//!
//! Credentials come from the SDK's default provider chain (environment,
//! profile, instance metadata). They never reach the rest of the crate.

use crate::s3::{ObjectPage, ObjectStoreClient};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::Client;
use contractnav_core::StoreError;

/// [`ObjectStoreClient`] backed by the AWS SDK
#[derive(Debug, Clone)]
pub struct AwsObjectStore {
    client: Client,
}

impl AwsObjectStore {
    /// Build a client for `region` using the default credential chain
    pub async fn from_region(region: &str) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        Self {
            client: Client::new(&sdk_config),
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ObjectStoreClient for AwsObjectStore {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage, StoreError> {
        let resp = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(|e| StoreError::ObjectStore(format!(
                "ListObjectsV2 s3://{}/{} failed: {}",
                bucket,
                prefix,
                aws_sdk_s3::error::DisplayErrorContext(&e)
            )))?;

        let keys = resp
            .contents()
            .iter()
            .filter_map(|obj| obj.key().map(str::to_string))
            .collect();

        let next_continuation_token = if resp.is_truncated().unwrap_or(false) {
            resp.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ObjectPage {
            keys,
            next_continuation_token,
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let resp = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(resp) => resp,
            Err(e) => {
                let location = format!("s3://{}/{}", bucket, key);
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    return Err(StoreError::NotFound(location));
                }
                return Err(StoreError::ObjectStore(format!(
                    "GetObject {} failed: {}",
                    location,
                    aws_sdk_s3::error::DisplayErrorContext(&service_error)
                )));
            }
        };

        let body = resp
            .body
            .collect()
            .await
            .map_err(|e| StoreError::ObjectStore(format!(
                "Failed to read body of s3://{}/{}: {}",
                bucket, key, e
            )))?;

        Ok(body.into_bytes().to_vec())
    }
}
