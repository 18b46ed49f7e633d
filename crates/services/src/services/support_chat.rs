//! Per-user support threads answered by the assistant until an admin takes over.

use db::models::chat_session::{ChatMessage, ChatSession, MessageSender, SupportMode};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use super::{ai_assistant::AiAssistant, canned_responses};

pub const MAX_MESSAGE_LENGTH: usize = 2000;

#[derive(Debug, Error)]
pub enum SupportChatError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("message must be at most {max} characters", max = MAX_MESSAGE_LENGTH)]
    MessageTooLong,
    #[error("support session not found")]
    SessionNotFound,
}

fn clean_message(text: &str) -> Result<&str, SupportChatError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(SupportChatError::EmptyMessage);
    }
    if text.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(SupportChatError::MessageTooLong);
    }
    Ok(text)
}

#[derive(Clone)]
pub struct SupportChat {
    pool: SqlitePool,
    assistant: AiAssistant,
}

impl SupportChat {
    pub fn new(pool: SqlitePool, assistant: AiAssistant) -> Self {
        Self { pool, assistant }
    }

    pub async fn session_for(&self, user_id: Uuid) -> Result<ChatSession, SupportChatError> {
        Ok(ChatSession::find_or_create_for_user(&self.pool, user_id).await?)
    }

    /// Append a customer message. The assistant answers only while the
    /// session is in AI mode; in human mode the session waits for an admin.
    /// A reply that finishes after an admin took over is discarded.
    pub async fn send_user_message(
        &self,
        user_id: Uuid,
        text: &str,
    ) -> Result<ChatSession, SupportChatError> {
        let text = clean_message(text)?;
        let session = self.session_for(user_id).await?;
        let was_flagged = session.needs_attention;

        let session = ChatSession::append_customer_message(
            &self.pool,
            session.id,
            &ChatMessage::new(MessageSender::User, text),
            canned_responses::asks_for_human(text),
        )
        .await?
        .ok_or(SupportChatError::SessionNotFound)?;

        if session.needs_attention && !was_flagged {
            info!(session_id = %session.id, user_id = %user_id, "Support session needs attention");
        }
        if session.mode == SupportMode::Human {
            return Ok(session);
        }

        let reply = self.assistant.support_reply(&session.messages).await;
        let reply = ChatMessage::new(MessageSender::Ai, reply);
        match ChatSession::append_ai_reply(&self.pool, session.id, &reply).await? {
            Some(session) => Ok(session),
            None => {
                debug!(session_id = %session.id, "Admin took over, dropping assistant reply");
                ChatSession::find_by_id(&self.pool, session.id)
                    .await?
                    .ok_or(SupportChatError::SessionNotFound)
            }
        }
    }

    pub async fn list_sessions(
        &self,
        only_needing_attention: bool,
    ) -> Result<Vec<ChatSession>, SupportChatError> {
        Ok(ChatSession::find_all(&self.pool, only_needing_attention).await?)
    }

    /// An admin answers in person; the assistant stays quiet from now on.
    pub async fn admin_reply(
        &self,
        session_id: Uuid,
        text: &str,
    ) -> Result<ChatSession, SupportChatError> {
        let text = clean_message(text)?;
        let session = ChatSession::append_admin_reply(
            &self.pool,
            session_id,
            &ChatMessage::new(MessageSender::Admin, text),
        )
        .await?
        .ok_or(SupportChatError::SessionNotFound)?;

        info!(session_id = %session_id, "Admin replied to support session");
        Ok(session)
    }

    /// Hand the session back to the assistant.
    pub async fn release(&self, session_id: Uuid) -> Result<ChatSession, SupportChatError> {
        ChatSession::release_to_ai(&self.pool, session_id)
            .await?
            .ok_or(SupportChatError::SessionNotFound)
    }
}
