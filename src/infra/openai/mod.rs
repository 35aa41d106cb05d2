//! Chat client for OpenAI-compatible completion APIs.

mod client;

pub use client::{DEFAULT_BASE_URL, DEFAULT_MODEL, OpenAiChat};
