use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes prepared requests. Wrappers in [`auth`](super::auth) decorate an
/// inner client to attach credentials.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
