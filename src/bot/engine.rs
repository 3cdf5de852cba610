//! Conversation engine: per-user dialogue sessions and backend submission.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::bot::backend::{BackendClient, BackendError};
use crate::bot::dialogue::{self, DialogueState, Step};

pub const UNREACHABLE_REPLY: &str =
    "Failed to create repository: could not reach the server.";

/// Drives the repository-creation dialogue for every user.
///
/// The session map is the only shared mutable state. It is locked for map
/// access only, never across a backend call, and each user's entry is only
/// touched by the task handling that user's current message.
pub struct ConversationEngine {
    backend: Arc<BackendClient>,
    sessions: Mutex<HashMap<i64, DialogueState>>,
}

impl ConversationEngine {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        Self {
            backend,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Handle a plain text message from a user and return the reply to send.
    pub async fn handle_text(&self, user_id: i64, text: &str) -> String {
        let current = self.sessions.lock().await.remove(&user_id);

        match dialogue::advance(current, text) {
            Step::Prompt { reply, next } => {
                self.sessions.lock().await.insert(user_id, next);
                reply
            }
            Step::Reject { reply } => reply,
            Step::Submit { name, description } => {
                info!("Submitting repo creation for user {user_id}: '{name}'");
                let result = self.backend.create_repo(&name, &description, false).await;
                if let Err(ref e) = result {
                    warn!("Repo creation failed for user {user_id}: {e}");
                }
                creation_reply(&name, result)
            }
        }
    }

    /// Handle a cancel command. Always replies, whether or not a dialogue
    /// was in progress; collected fields are discarded.
    pub async fn handle_cancel(&self, user_id: i64) -> String {
        if self.sessions.lock().await.remove(&user_id).is_some() {
            info!("Dialogue cancelled for user {user_id}");
        }
        dialogue::CANCELLED.to_string()
    }
}

/// Render the outcome of a creation request into the user's reply.
fn creation_reply(name: &str, result: Result<(), BackendError>) -> String {
    match result {
        Ok(()) => format!("Repository '{name}' created successfully!"),
        Err(BackendError::Rejected { message, .. }) => {
            format!("Failed to create repository: {message}")
        }
        Err(BackendError::Unreachable(_) | BackendError::BadResponse(_)) => {
            UNREACHABLE_REPLY.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::bot::backend::UNKNOWN_ERROR;
    use crate::bot::dialogue::{CANCELLED, CLARIFICATION, DESCRIPTION_PROMPT, NAME_PROMPT};

    fn engine(server: &MockServer) -> ConversationEngine {
        let backend = BackendClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        ConversationEngine::new(Arc::new(backend))
    }

    fn unreachable_engine() -> ConversationEngine {
        let backend =
            BackendClient::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        ConversationEngine::new(Arc::new(backend))
    }

    #[test]
    fn test_creation_reply_wording() {
        assert_eq!(
            creation_reply("Foo", Ok(())),
            "Repository 'Foo' created successfully!"
        );
        assert_eq!(
            creation_reply(
                "Foo",
                Err(BackendError::Rejected {
                    status: 400,
                    message: UNKNOWN_ERROR.to_string(),
                })
            ),
            "Failed to create repository: Unknown error"
        );
        assert_eq!(
            creation_reply("Foo", Err(BackendError::Unreachable("refused".to_string()))),
            UNREACHABLE_REPLY
        );
    }

    #[tokio::test]
    async fn test_non_trigger_is_clarified_and_leaves_no_session() {
        let server = MockServer::start().await;
        let engine = engine(&server);

        let reply = engine.handle_text(1, "hello").await;
        assert_eq!(reply, CLARIFICATION);
        assert!(engine.sessions.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_trigger_starts_dialogue() {
        let server = MockServer::start().await;
        let engine = engine(&server);

        let reply = engine.handle_text(1, "I want a new repo").await;
        assert_eq!(reply, NAME_PROMPT);
        assert_eq!(
            engine.sessions.lock().await.get(&1),
            Some(&DialogueState::AwaitingName)
        );
    }

    #[tokio::test]
    async fn test_full_dialogue_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/create-repo"))
            .and(body_json(serde_json::json!({
                "name": "Foo",
                "description": "Bar",
                "private": false,
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let engine = engine(&server);
        assert_eq!(engine.handle_text(1, "new repo please").await, NAME_PROMPT);
        assert_eq!(engine.handle_text(1, "Foo").await, DESCRIPTION_PROMPT);

        let reply = engine.handle_text(1, "Bar").await;
        assert!(reply.contains("Foo"), "got: {reply}");
        assert!(reply.contains("created successfully"), "got: {reply}");

        // Session is gone: the next message is treated as a fresh idle input.
        assert_eq!(engine.handle_text(1, "thanks").await, CLARIFICATION);
    }

    #[tokio::test]
    async fn test_server_rejection_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/create-repo"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"error": "name taken"})),
            )
            .mount(&server)
            .await;

        let engine = engine(&server);
        engine.handle_text(1, "new repo").await;
        engine.handle_text(1, "Foo").await;

        let reply = engine.handle_text(1, "Bar").await;
        assert!(reply.contains("name taken"), "got: {reply}");
        assert!(engine.sessions.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_backend_clears_session() {
        let engine = unreachable_engine();
        engine.handle_text(1, "new repo").await;
        engine.handle_text(1, "Foo").await;

        let reply = engine.handle_text(1, "Bar").await;
        assert_eq!(reply, UNREACHABLE_REPLY);
        assert!(engine.sessions.lock().await.is_empty());

        // A fresh trigger starts over from the initial state.
        assert_eq!(engine.handle_text(1, "new repo").await, NAME_PROMPT);
    }

    #[tokio::test]
    async fn test_cancel_discards_collected_fields() {
        let server = MockServer::start().await;
        // The backend must never be called after a cancel.
        Mock::given(method("POST"))
            .and(path("/create-repo"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let engine = engine(&server);
        engine.handle_text(1, "new repo").await;
        engine.handle_text(1, "Foo").await;

        assert_eq!(engine.handle_cancel(1).await, CANCELLED);
        assert!(engine.sessions.lock().await.is_empty());

        // Next text is an idle input, not a description.
        assert_eq!(engine.handle_text(1, "Bar").await, CLARIFICATION);
    }

    #[tokio::test]
    async fn test_cancel_without_session_still_replies() {
        let server = MockServer::start().await;
        let engine = engine(&server);
        assert_eq!(engine.handle_cancel(42).await, CANCELLED);
    }

    #[tokio::test]
    async fn test_users_do_not_interfere() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/create-repo"))
            .and(body_json(serde_json::json!({
                "name": "alice-repo",
                "description": "for alice",
                "private": false,
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let engine = engine(&server);

        // Interleave two users in different states.
        engine.handle_text(1, "new repo").await;
        engine.handle_text(2, "create a new project").await;
        engine.handle_text(1, "alice-repo").await;

        // User 2 cancelling does not touch user 1's fields.
        engine.handle_cancel(2).await;

        let reply = engine.handle_text(1, "for alice").await;
        assert!(reply.contains("alice-repo"), "got: {reply}");
    }
}
