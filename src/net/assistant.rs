//! Conversational assistant backed by the server's LLM integration.
//!
//! DESIGN
//! ======
//! The backend is stateless: every question carries the prior turns as
//! `history`. [`Conversation`] keeps those turns client-side and only records
//! a question once the backend has answered it, so a failed call can be
//! retried without duplicating the user turn.

#[cfg(test)]
#[path = "assistant_test.rs"]
mod assistant_test;

use serde::Serialize;

use super::client::ApiClient;
use super::error::ApiError;
use super::types::{AssistantStatus, ChatMessage, ChatReply, ChatRole, ChatWelcome};

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    history: &'a [ChatMessage],
}

/// `GET /chat/welcome`.
///
/// # Errors
///
/// Any [`ApiError`]; an assistant without provider credentials is a 503.
pub async fn welcome(client: &ApiClient) -> Result<ChatWelcome, ApiError> {
    client.get_json("/chat/welcome").await
}

/// `POST /chat/message` with an explicit history.
///
/// # Errors
///
/// Any [`ApiError`]; an empty message is a 400, a provider failure a 500.
pub async fn send(client: &ApiClient, message: &str, history: &[ChatMessage]) -> Result<ChatReply, ApiError> {
    let reply: ChatReply = client.post_json("/chat/message", &ChatRequest { message, history }).await?;
    tracing::debug!(turns = history.len(), tokens = ?reply.tokens_used, "assistant replied");
    Ok(reply)
}

/// `GET /chat/stats`.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn status(client: &ApiClient) -> Result<AssistantStatus, ApiError> {
    client.get_json("/chat/stats").await
}

/// Running conversation with the assistant.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Conversation {
    history: Vec<ChatMessage>,
    tokens_used: u64,
    cost: f64,
}

impl Conversation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the welcome message and open the conversation with it.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] from [`welcome`].
    pub async fn start(client: &ApiClient) -> Result<(Self, ChatWelcome), ApiError> {
        let greeting = welcome(client).await?;
        let mut conversation = Self::new();
        conversation.push(ChatRole::Assistant, greeting.message.clone());
        Ok((conversation, greeting))
    }

    /// Ask `question`; both turns are recorded only on success.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] from [`send`]. The history is unchanged on error.
    pub async fn ask(&mut self, client: &ApiClient, question: &str) -> Result<ChatReply, ApiError> {
        let reply = send(client, question, &self.history).await?;
        self.push(ChatRole::User, question.to_owned());
        self.push(ChatRole::Assistant, reply.text.clone());
        self.tokens_used += reply.tokens_used.unwrap_or(0);
        self.cost += reply.cost.unwrap_or(0.0);
        Ok(reply)
    }

    #[must_use]
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Tokens billed across every answered question.
    #[must_use]
    pub fn tokens_used(&self) -> u64 {
        self.tokens_used
    }

    #[must_use]
    pub fn cost(&self) -> f64 {
        self.cost
    }

    fn push(&mut self, role: ChatRole, content: String) {
        self.history.push(ChatMessage { role, content });
    }
}
