//! HTTP plumbing shared by the WebHDFS store and the chat client.

mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::Result;
use reqwest::{Method, Request, Response};

/// Issues a `GET` for `url` through `client` and returns the raw response,
/// whatever its status.
pub async fn get<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Response> {
    let req = Request::new(Method::GET, url.parse()?);
    Ok(client.execute(req).await?)
}

/// Issues a JSON `POST` for `url` through `client`.
pub async fn post_json<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    body: &impl serde::Serialize,
) -> Result<Response> {
    let mut req = Request::new(Method::POST, url.parse()?);
    req.headers_mut().insert(
        reqwest::header::CONTENT_TYPE,
        reqwest::header::HeaderValue::from_static("application/json"),
    );
    *req.body_mut() = Some(serde_json::to_vec(body)?.into());
    Ok(client.execute(req).await?)
}
