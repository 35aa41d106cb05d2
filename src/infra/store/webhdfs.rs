use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::error::StoreError;
use crate::fetch::auth::UrlParam;
use crate::fetch::{self, BasicClient, HttpClient};
use crate::services::file_store::{FileStore, join_path};

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListStatusResponse {
    file_statuses: FileStatuses,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FileStatuses {
    file_status: Vec<FileStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileStatus {
    path_suffix: String,
    #[serde(rename = "type")]
    kind: String,
}

/// HDFS accessed through the WebHDFS REST API on the namenode, e.g.
/// `http://namenode:9870`.
pub struct WebHdfsStore {
    base_url: String,
    client: Box<dyn HttpClient>,
}

impl WebHdfsStore {
    pub fn new(base_url: &str, client: Box<dyn HttpClient>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Builds a store with an unauthenticated client, sending `user.name`
    /// when `user` is set (HDFS simple auth).
    pub fn connect(base_url: &str, user: Option<String>) -> Self {
        let client: Box<dyn HttpClient> = match user {
            Some(user) => Box::new(UrlParam {
                inner: BasicClient::new(),
                param_name: "user.name".to_string(),
                value: user,
            }),
            None => Box::new(BasicClient::new()),
        };
        Self::new(base_url, client)
    }

    fn op_url(&self, path: &str, op: &str) -> String {
        format!(
            "{}/webhdfs/v1/{}?op={}",
            self.base_url,
            path.trim_start_matches('/'),
            op
        )
    }

    async fn request(&self, path: &str, op: &str) -> Result<Response, StoreError> {
        let url = self.op_url(path, op);
        debug!(%url, "WebHDFS request");

        let resp = fetch::get(self.client.as_ref(), &url)
            .await
            .map_err(|e| StoreError::Unreachable(format!("{path}: {e:#}")))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(path.to_string())),
            status if !status.is_success() => {
                let body = resp.text().await.unwrap_or_default();
                Err(StoreError::Unreachable(format!(
                    "{path}: namenode returned {status}: {body}"
                )))
            }
            _ => Ok(resp),
        }
    }
}

/// Extracts the regular files from a `LISTSTATUS` payload.
fn parse_listing(dir: &str, body: &[u8]) -> Result<Vec<String>, StoreError> {
    let listing: ListStatusResponse = serde_json::from_slice(body)
        .map_err(|e| StoreError::Unreachable(format!("{dir}: bad LISTSTATUS payload: {e}")))?;

    Ok(listing
        .file_statuses
        .file_status
        .into_iter()
        .filter(|s| s.kind == "FILE")
        .map(|s| join_path(dir, &s.path_suffix))
        .collect())
}

#[async_trait]
impl FileStore for WebHdfsStore {
    async fn list(&self, dir: &str) -> Result<Vec<String>, StoreError> {
        let body = self
            .request(dir, "LISTSTATUS")
            .await?
            .bytes()
            .await
            .map_err(|e| StoreError::Unreachable(format!("{dir}: {e}")))?;
        parse_listing(dir, &body)
    }

    async fn open_read(&self, path: &str) -> Result<Bytes, StoreError> {
        // The namenode redirects OPEN to a datanode; reqwest follows it.
        self.request(path, "OPEN")
            .await?
            .bytes()
            .await
            .map_err(|e| StoreError::Unreachable(format!("{path}: {e}")))
    }
}
