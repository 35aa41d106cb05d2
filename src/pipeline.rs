//! One query-handling cycle: question in, session and response out.
//!
//! Queries are handled strictly one at a time. The session is passed in by
//! value and handed back with the exchange recorded, so the caller decides
//! when to persist it.

use serde::Serialize;
use tracing::{info, warn};

use crate::analyzers::{self, AggregationResult};
use crate::error::QueryError;
use crate::loader::{self, LoaderConfig};
use crate::router::{self, Intent};
use crate::services::chat_api::{ChatApi, Message};
use crate::services::file_store::FileStore;
use crate::session::Session;
use crate::source::SourceFile;

/// Shown when free-form chat is requested without an API credential.
pub const NO_CREDENTIAL_REPLY: &str =
    "The chat assistant is not configured. Set OPENAI_API_KEY to enable free-form questions.";

/// Shown when the chat API fails or answers with something unreadable.
pub const UPSTREAM_FAILURE_REPLY: &str =
    "Sorry, the chat assistant is unavailable right now. Please try again later.";

/// Shown for questions no keyword rule matches.
pub const UNRECOGNIZED_REPLY: &str = "Sorry, I can answer questions about total rides, \
     busiest pickup locations, average fare, peak hours, or green/yellow/fhv/fhvhv trip counts.";

/// Shown when no source could be loaded.
pub const NO_DATA_REPLY: &str = "No trip data is available right now.";

/// Everything a query needs besides the question itself.
pub struct QueryContext<'a> {
    pub store: &'a dyn FileStore,
    pub sources: &'a [SourceFile],
    pub loader: &'a LoaderConfig,
}

/// Payload handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reply {
    Answer {
        intent: Intent,
        result: AggregationResult,
    },
    /// Nothing could be loaded; distinct from an answer over zero rows.
    NoData,
    /// Blank input, rejected before routing.
    EmptyQuery,
    Unrecognized,
    Chat {
        content: String,
    },
    /// The chat path could not produce an answer; `content` is the fallback.
    ChatUnavailable {
        content: String,
    },
}

impl Reply {
    /// Text recorded as the assistant's turn in the conversation.
    pub fn transcript(&self) -> String {
        match self {
            Reply::Answer { result, .. } => result.to_string(),
            Reply::NoData => NO_DATA_REPLY.to_string(),
            Reply::EmptyQuery => QueryError::EmptyQuery.to_string(),
            Reply::Unrecognized => UNRECOGNIZED_REPLY.to_string(),
            Reply::Chat { content } | Reply::ChatUnavailable { content } => content.clone(),
        }
    }

    /// Short machine-readable status, used in the query log.
    pub fn status(&self) -> &'static str {
        match self {
            Reply::Answer { result, .. } if result.is_error() => "missing_column",
            Reply::Answer { .. } => "ok",
            Reply::NoData => "no_data",
            Reply::EmptyQuery => "empty_query",
            Reply::Unrecognized => "unrecognized",
            Reply::Chat { .. } => "chat",
            Reply::ChatUnavailable { .. } => "chat_unavailable",
        }
    }
}

/// A reply plus any non-fatal problems met while producing it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub reply: Reply,
    pub warnings: Vec<String>,
}

impl Response {
    fn new(reply: Reply) -> Self {
        Self {
            reply,
            warnings: Vec::new(),
        }
    }
}

/// Answers `text` with the keyword router and the aggregation engine.
///
/// Blank input is rejected without touching the store. Questions no rule
/// matches are answered without loading data either.
#[tracing::instrument(skip(session, ctx), fields(sources = ctx.sources.len()))]
pub async fn handle_query(
    mut session: Session,
    ctx: &QueryContext<'_>,
    text: &str,
) -> (Session, Response) {
    let intent = match router::classify(text) {
        Ok(intent) => intent,
        Err(e) => {
            warn!(error = %e, "Rejected query");
            return (session, Response::new(Reply::EmptyQuery));
        }
    };

    let response = if intent == Intent::Unrecognized {
        info!("No rule matched");
        Response::new(Reply::Unrecognized)
    } else {
        let report = loader::load(ctx.store, ctx.sources, ctx.loader).await;
        let warnings = report.failures.iter().map(ToString::to_string).collect();

        let reply = if report.is_empty_dataset() {
            warn!("No source loaded");
            Reply::NoData
        } else {
            match analyzers::execute(intent, &report.table) {
                Some(result) => {
                    info!(%intent, rows = report.table.len(), %result, "Query answered");
                    Reply::Answer { intent, result }
                }
                None => Reply::Unrecognized,
            }
        };
        Response { reply, warnings }
    };

    session.record(text, &response.reply.transcript());
    (session, response)
}

/// Forwards `text`, with the whole active conversation as context, to a
/// chat-completion API. Without an API the fixed fallback is returned.
#[tracing::instrument(skip(session, api))]
pub async fn handle_chat(
    mut session: Session,
    api: Option<&dyn ChatApi>,
    text: &str,
) -> (Session, Response) {
    if let Err(e) = router::classify(text) {
        warn!(error = %e, "Rejected chat message");
        return (session, Response::new(Reply::EmptyQuery));
    }

    let response = match api {
        None => Response::new(Reply::ChatUnavailable {
            content: NO_CREDENTIAL_REPLY.to_string(),
        }),
        Some(api) => {
            let mut messages = session.active.clone();
            messages.push(Message::user(text));

            match api.complete(&messages).await {
                Ok(content) => Response::new(Reply::Chat { content }),
                Err(e) => {
                    warn!(error = %e, "Chat API call failed");
                    Response {
                        reply: Reply::ChatUnavailable {
                            content: UPSTREAM_FAILURE_REPLY.to_string(),
                        },
                        warnings: vec![e.to_string()],
                    }
                }
            }
        }
    };

    session.record(text, &response.reply.transcript());
    (session, response)
}
