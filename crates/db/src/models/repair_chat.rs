use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::user::Role;

/// A message in the thread attached to a repair job.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RepairChatMessage {
    pub id: Uuid,
    pub repair_id: Uuid,
    pub sender_id: Uuid,
    pub sender_role: Role,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateRepairChatMessage {
    pub message: String,
}

impl RepairChatMessage {
    pub async fn create(
        pool: &SqlitePool,
        repair_id: Uuid,
        sender_id: Uuid,
        sender_role: Role,
        message: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, RepairChatMessage>(
            "INSERT INTO repair_chats (id, repair_id, sender_id, sender_role, message)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, repair_id, sender_id, sender_role, message, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(repair_id)
        .bind(sender_id)
        .bind(sender_role)
        .bind(message)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_repair_id(
        pool: &SqlitePool,
        repair_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, RepairChatMessage>(
            "SELECT id, repair_id, sender_id, sender_role, message, created_at
             FROM repair_chats
             WHERE repair_id = $1
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(repair_id)
        .fetch_all(pool)
        .await
    }
}
