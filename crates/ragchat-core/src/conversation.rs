//! Conversation state and the query lifecycle around it.
//!
//! A query round is begin -> request -> complete. Event-driven callers (the
//! TUI) drive the pair themselves around a spawned request task; linear
//! callers use [`ChatSession::send_query`], which composes the whole round.

use anyhow::Result;
use tracing::warn;

use crate::ai::RagClient;
use crate::state::{ChatMessage, ChatRole};

/// Shown when the service responded without an `answer` field.
pub const NO_ANSWER_FALLBACK: &str = "No answer received.";

/// Shown when the exchange failed outright.
pub const ERROR_FALLBACK: &str = "⚠️ Error talking to AI.";

/// Append-only chat transcript plus the in-flight request flag.
///
/// Messages are never reordered or removed. At most one query is
/// outstanding at a time; [`Conversation::begin_query`] rejects overlap.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    awaiting_reply: bool,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// True between `begin_query` and the matching `complete`.
    pub fn awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    /// Record the user's side of an exchange and mark a reply as pending.
    ///
    /// Returns the trimmed query for the caller to send. Blank input and
    /// input arriving while a reply is still pending return `None` and
    /// leave the transcript untouched.
    pub fn begin_query(&mut self, input: &str) -> Option<String> {
        if self.awaiting_reply {
            return None;
        }

        let query = input.trim();
        if query.is_empty() {
            return None;
        }

        let query = query.to_string();
        self.messages.push(ChatMessage {
            role: ChatRole::User,
            text: query.clone(),
        });
        self.awaiting_reply = true;

        Some(query)
    }

    /// Record the outcome of the exchange started by `begin_query`.
    ///
    /// Failures become a synthetic assistant message rather than
    /// propagating; the pending flag is cleared on every path.
    pub fn complete(&mut self, outcome: Result<Option<String>>) {
        let text = match outcome {
            Ok(Some(answer)) => answer,
            Ok(None) => NO_ANSWER_FALLBACK.to_string(),
            Err(err) => {
                warn!("query failed: {err:#}");
                ERROR_FALLBACK.to_string()
            }
        };

        self.messages.push(ChatMessage {
            role: ChatRole::Assistant,
            text,
        });
        self.awaiting_reply = false;
    }
}

/// A [`Conversation`] paired with the client used to extend it.
pub struct ChatSession {
    conversation: Conversation,
    client: RagClient,
}

impl ChatSession {
    pub fn new(client: RagClient) -> Self {
        Self {
            conversation: Conversation::new(),
            client,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Run one full query round: append the user message, call the answer
    /// service, append its reply or a fallback.
    ///
    /// Returns whether a request was issued; blank input and an
    /// already-pending query both return false with no state change.
    pub async fn send_query(&mut self, input: &str) -> bool {
        let Some(query) = self.conversation.begin_query(input) else {
            return false;
        };

        let outcome = self.client.ask(&query).await;
        self.conversation.complete(outcome);

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_begin_query_appends_user_message() {
        let mut conv = Conversation::new();

        let query = conv.begin_query("hi");

        assert_eq!(query.as_deref(), Some("hi"));
        assert_eq!(conv.messages().len(), 1);
        assert_eq!(conv.messages()[0].role, ChatRole::User);
        assert_eq!(conv.messages()[0].text, "hi");
        assert!(conv.awaiting_reply());
    }

    #[test]
    fn test_begin_query_trims_input() {
        let mut conv = Conversation::new();

        let query = conv.begin_query("  hi there \n");

        assert_eq!(query.as_deref(), Some("hi there"));
        assert_eq!(conv.messages()[0].text, "hi there");
    }

    #[test]
    fn test_blank_input_is_a_no_op() {
        let mut conv = Conversation::new();

        assert!(conv.begin_query("").is_none());
        assert!(conv.begin_query("   \t\n").is_none());
        assert!(conv.messages().is_empty());
        assert!(!conv.awaiting_reply());
    }

    #[test]
    fn test_overlapping_query_is_rejected() {
        let mut conv = Conversation::new();

        conv.begin_query("first").unwrap();
        assert!(conv.begin_query("second").is_none());

        // Only the first user message made it in.
        assert_eq!(conv.messages().len(), 1);
        assert_eq!(conv.messages()[0].text, "first");

        // A completed round re-opens the conversation.
        conv.complete(Ok(Some("reply".to_string())));
        assert!(conv.begin_query("second").is_some());
    }

    #[test]
    fn test_complete_appends_answer_and_clears_flag() {
        let mut conv = Conversation::new();
        conv.begin_query("hi").unwrap();

        conv.complete(Ok(Some("hello".to_string())));

        assert!(!conv.awaiting_reply());
        assert_eq!(conv.messages().len(), 2);
        assert_eq!(conv.messages()[0].role, ChatRole::User);
        assert_eq!(conv.messages()[0].text, "hi");
        assert_eq!(conv.messages()[1].role, ChatRole::Assistant);
        assert_eq!(conv.messages()[1].text, "hello");
    }

    #[test]
    fn test_complete_without_answer_uses_fallback() {
        let mut conv = Conversation::new();
        conv.begin_query("hi").unwrap();

        conv.complete(Ok(None));

        assert!(!conv.awaiting_reply());
        assert_eq!(conv.messages()[1].text, NO_ANSWER_FALLBACK);
    }

    #[test]
    fn test_complete_on_failure_uses_error_fallback() {
        let mut conv = Conversation::new();
        conv.begin_query("hi").unwrap();

        conv.complete(Err(anyhow!("connection refused")));

        assert!(!conv.awaiting_reply());
        assert_eq!(conv.messages()[1].role, ChatRole::Assistant);
        assert_eq!(conv.messages()[1].text, ERROR_FALLBACK);
    }

    #[tokio::test]
    async fn test_send_query_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/rag/query")
            .match_header("authorization", "Bearer jwt")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"answer":"hello"}"#)
            .create_async()
            .await;

        let client = RagClient::new(&server.url(), "jwt").unwrap();
        let mut session = ChatSession::new(client);

        assert!(session.send_query("hi").await);

        let messages = session.conversation().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[0].text, "hi");
        assert_eq!(messages[1].role, ChatRole::Assistant);
        assert_eq!(messages[1].text, "hello");
        assert!(!session.conversation().awaiting_reply());
    }

    #[tokio::test]
    async fn test_send_query_blank_input_sends_nothing() {
        // Unroutable on purpose; a request would fail loudly.
        let client = RagClient::new("http://127.0.0.1:1", "jwt").unwrap();
        let mut session = ChatSession::new(client);

        assert!(!session.send_query("   ").await);
        assert!(session.conversation().messages().is_empty());
        assert!(!session.conversation().awaiting_reply());
    }

    #[tokio::test]
    async fn test_send_query_transport_failure_degrades_to_message() {
        let client = RagClient::new("http://127.0.0.1:1", "jwt").unwrap();
        let mut session = ChatSession::new(client);

        assert!(session.send_query("hi").await);

        let messages = session.conversation().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].text, ERROR_FALLBACK);
        assert!(!session.conversation().awaiting_reply());
    }
}
