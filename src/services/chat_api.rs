//! Trait and message types for an external chat-completion service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One conversation turn, in the shape chat APIs expect on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Abstraction over a chat-completion provider.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Sends the ordered conversation and returns the assistant's reply.
    ///
    /// Transport failures, non-success statuses and unexpected payloads are
    /// all reported as [`QueryError::UpstreamApi`].
    async fn complete(&self, messages: &[Message]) -> Result<String, QueryError>;
}
