use crate::fetch::client::HttpClient;
use async_trait::async_trait;

/// An [`HttpClient`] wrapper that appends a fixed query parameter to every
/// request, e.g. WebHDFS's `user.name` for simple authentication.
pub struct UrlParam<C> {
    pub inner: C,
    pub param_name: String,
    pub value: String,
}

#[async_trait]
impl<C: HttpClient> HttpClient for UrlParam<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.url_mut()
            .query_pairs_mut()
            .append_pair(&self.param_name, &self.value);
        self.inner.execute(req).await
    }
}
