use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::{decode_json, encode_json};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageSender {
    User,
    Ai,
    Admin,
}

/// Who answers the customer: the assistant, or a human admin who took over.
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display,
    Default,
)]
#[sqlx(type_name = "support_mode", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SupportMode {
    #[default]
    Ai,
    Human,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender: MessageSender,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(sender: MessageSender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            text: text.into(),
            sent_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub messages: Vec<ChatMessage>,
    pub mode: SupportMode,
    pub needs_attention: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ChatSessionRow {
    id: Uuid,
    user_id: Uuid,
    messages: String, // JSON array of ChatMessage
    mode: SupportMode,
    needs_attention: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ChatSessionRow> for ChatSession {
    type Error = sqlx::Error;

    fn try_from(row: ChatSessionRow) -> Result<Self, Self::Error> {
        Ok(ChatSession {
            messages: decode_json("messages", &row.messages)?,
            id: row.id,
            user_id: row.user_id,
            mode: row.mode,
            needs_attention: row.needs_attention,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SESSION_COLUMNS: &str =
    "id, user_id, messages, mode, needs_attention, created_at, updated_at";

impl ChatSession {
    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Fetch the user's session, creating an empty one on first use.
    pub async fn find_or_create_for_user(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query(
            "INSERT INTO chat_sessions (id, user_id) VALUES ($1, $2)
             ON CONFLICT(user_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .execute(pool)
        .await?;

        let row = sqlx::query_as::<_, ChatSessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        row.try_into()
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ChatSessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(ChatSession::try_from)
        .transpose()
    }

    pub async fn find_all(
        pool: &SqlitePool,
        only_needing_attention: bool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, ChatSessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions
             WHERE ($1 = 0 OR needs_attention = 1)
             ORDER BY needs_attention DESC, updated_at DESC"
        ))
        .bind(only_needing_attention)
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(ChatSession::try_from).collect()
    }

    /// Append a customer message. In human mode, or when the customer asks
    /// for a person, the session is flagged for an admin.
    pub async fn append_customer_message(
        pool: &SqlitePool,
        id: Uuid,
        message: &ChatMessage,
        wants_human: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let message = encode_json(message)?;
        sqlx::query_as::<_, ChatSessionRow>(&format!(
            "UPDATE chat_sessions
             SET messages = json_insert(messages, '$[#]', json($2)),
                 needs_attention = CASE WHEN mode = 'human' THEN 1
                                        ELSE (needs_attention OR $3) END,
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(id)
        .bind(message)
        .bind(wants_human)
        .fetch_optional(pool)
        .await?
        .map(ChatSession::try_from)
        .transpose()
    }

    /// Append an assistant reply only while the session is still in AI mode.
    /// Returns `None` when an admin took over in the meantime.
    pub async fn append_ai_reply(
        pool: &SqlitePool,
        id: Uuid,
        message: &ChatMessage,
    ) -> Result<Option<Self>, sqlx::Error> {
        let message = encode_json(message)?;
        sqlx::query_as::<_, ChatSessionRow>(&format!(
            "UPDATE chat_sessions
             SET messages = json_insert(messages, '$[#]', json($2)),
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1 AND mode = 'ai'
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(id)
        .bind(message)
        .fetch_optional(pool)
        .await?
        .map(ChatSession::try_from)
        .transpose()
    }

    /// Append an admin message, switch to human mode and clear the flag.
    pub async fn append_admin_reply(
        pool: &SqlitePool,
        id: Uuid,
        message: &ChatMessage,
    ) -> Result<Option<Self>, sqlx::Error> {
        let message = encode_json(message)?;
        sqlx::query_as::<_, ChatSessionRow>(&format!(
            "UPDATE chat_sessions
             SET messages = json_insert(messages, '$[#]', json($2)),
                 mode = 'human', needs_attention = 0,
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(id)
        .bind(message)
        .fetch_optional(pool)
        .await?
        .map(ChatSession::try_from)
        .transpose()
    }

    pub async fn release_to_ai(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ChatSessionRow>(&format!(
            "UPDATE chat_sessions
             SET mode = 'ai', needs_attention = 0, updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(ChatSession::try_from)
        .transpose()
    }

    pub async fn count_needing_attention(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM chat_sessions WHERE needs_attention = 1")
            .fetch_one(pool)
            .await
    }
}
