//! Conversation state owned by the caller and persisted as one JSON file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::services::chat_api::{Message, Role};

/// Characters of the opening question kept in a conversation title.
pub const TITLE_CHARS: usize = 30;

/// An archived conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub title: String,
    pub messages: Vec<Message>,
}

/// Chat history plus the conversation in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub history: Vec<Conversation>,
    #[serde(default)]
    pub active: Vec<Message>,
}

/// First [`TITLE_CHARS`] characters of `query`, followed by `...`.
pub fn title_for(query: &str) -> String {
    let head: String = query.chars().take(TITLE_CHARS).collect();
    format!("{head}...")
}

impl Session {
    /// Reads a session file. A missing file is an empty session.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No session file, starting fresh");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read session file {}", path.display()))?;
        let session = serde_json::from_str(&content)
            .with_context(|| format!("malformed session file {}", path.display()))?;
        Ok(session)
    }

    /// Rewrites the whole session file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("failed to write session file {}", path.display()))?;
        debug!(path = %path.display(), conversations = self.history.len(), "Session saved");
        Ok(())
    }

    /// Appends one question/answer exchange to the active conversation.
    pub fn record(&mut self, question: &str, answer: &str) {
        self.active.push(Message::user(question));
        self.active.push(Message::assistant(answer));
    }

    /// Archives the active conversation, titled after its first question,
    /// and starts an empty one. Does nothing when nothing was asked yet.
    pub fn new_chat(&mut self) {
        let Some(first) = self.active.iter().find(|m| m.role == Role::User) else {
            self.active.clear();
            return;
        };
        let conversation = Conversation {
            title: title_for(&first.content),
            messages: std::mem::take(&mut self.active),
        };
        self.history.push(conversation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn temp_path(name: &str) -> std::path::PathBuf {
        env::temp_dir().join(name)
    }

    #[test]
    fn test_title_truncates_to_thirty_chars() {
        assert_eq!(
            title_for("What is the average fare for yellow taxis in January?"),
            "What is the average fare for y..."
        );
        assert_eq!(title_for("peak hours"), "peak hours...");
    }

    #[test]
    fn test_title_keeps_leading_whitespace() {
        assert_eq!(title_for("  peak hours"), "  peak hours...");
    }

    #[test]
    fn test_title_counts_characters_not_bytes() {
        let title = title_for(&"é".repeat(40));
        assert_eq!(title.chars().count(), TITLE_CHARS + 3);
    }

    #[test]
    fn test_new_chat_archives_active() {
        let mut session = Session::default();
        session.record("how many taxi rides", "6 rides");
        session.record("average fare", "$12.50");
        session.new_chat();

        assert!(session.active.is_empty());
        assert_eq!(session.history.len(), 1);
        assert_eq!(session.history[0].title, "how many taxi rides...");
        assert_eq!(session.history[0].messages.len(), 4);
    }

    #[test]
    fn test_new_chat_on_empty_session_is_noop() {
        let mut session = Session::default();
        session.new_chat();
        assert!(session.history.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("taxi_query_test_session.json");
        let _ = fs::remove_file(&path);

        let mut session = Session::default();
        session.record("peak hours", "17:00: 3");
        session.new_chat();
        session.record("fhv trip count", "2 rides");
        session.save(&path).unwrap();

        let loaded = Session::load(&path).unwrap();
        assert_eq!(loaded, session);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let path = temp_path("taxi_query_test_session_missing.json");
        let _ = fs::remove_file(&path);
        assert_eq!(Session::load(&path).unwrap(), Session::default());
    }

    #[test]
    fn test_load_malformed_file_errors() {
        let path = temp_path("taxi_query_test_session_bad.json");
        fs::write(&path, "{not json").unwrap();
        assert!(Session::load(&path).is_err());
        fs::remove_file(&path).unwrap();
    }
}
