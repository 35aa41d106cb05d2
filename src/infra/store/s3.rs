use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreError;
use crate::services::file_store::FileStore;

/// Objects in one S3 bucket. Store paths are object keys; a leading `/` is
/// ignored.
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Store {
    pub fn new(client: aws_sdk_s3::Client, bucket: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
        }
    }

    /// Uses the ambient AWS configuration (env vars, profile, instance role).
    pub async fn from_env(bucket: &str) -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(aws_sdk_s3::Client::new(&config), bucket)
    }
}

fn key_of(path: &str) -> &str {
    path.trim_start_matches('/')
}

fn dir_prefix(dir: &str) -> String {
    let dir = key_of(dir).trim_end_matches('/');
    if dir.is_empty() {
        String::new()
    } else {
        format!("{dir}/")
    }
}

#[async_trait]
impl FileStore for S3Store {
    async fn list(&self, dir: &str) -> Result<Vec<String>, StoreError> {
        let prefix = dir_prefix(dir);
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&prefix)
                .delimiter("/")
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| StoreError::Unreachable(format!("s3://{}/{prefix}: {e}", self.bucket)))?;

            keys.extend(
                resp.contents()
                    .iter()
                    .filter_map(|obj| obj.key())
                    .filter(|key| !key.ends_with('/'))
                    .map(str::to_string),
            );

            match resp.next_continuation_token() {
                Some(token) if resp.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(keys)
    }

    async fn open_read(&self, path: &str) -> Result<Bytes, StoreError> {
        let key = key_of(path);
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    StoreError::NotFound(path.to_string())
                } else {
                    StoreError::Unreachable(format!("s3://{}/{key}: {e}", self.bucket))
                }
            })?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Unreachable(format!("s3://{}/{key}: {e}", self.bucket)))?;
        Ok(body.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_prefix() {
        assert_eq!(dir_prefix("/trips/2023/"), "trips/2023/");
        assert_eq!(dir_prefix("trips"), "trips/");
        assert_eq!(dir_prefix("/"), "");
    }

    #[test]
    fn test_key_of() {
        assert_eq!(key_of("/trips/a.csv"), "trips/a.csv");
    }
}
