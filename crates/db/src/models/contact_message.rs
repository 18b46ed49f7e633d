use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactMessage {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
}

const CONTACT_COLUMNS: &str = "id, name, email, subject, message, is_read, created_at";

impl ContactMessage {
    pub async fn create(
        pool: &SqlitePool,
        data: &CreateContactMessage,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ContactMessage>(&format!(
            "INSERT INTO contact_messages (id, name, email, subject, message)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {CONTACT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(data.name.trim())
        .bind(data.email.trim())
        .bind(&data.subject)
        .bind(data.message.trim())
        .fetch_one(pool)
        .await
    }

    pub async fn find_all(pool: &SqlitePool, only_unread: bool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ContactMessage>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contact_messages
             WHERE ($1 = 0 OR is_read = 0)
             ORDER BY created_at DESC"
        ))
        .bind(only_unread)
        .fetch_all(pool)
        .await
    }

    pub async fn mark_read(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ContactMessage>(&format!(
            "UPDATE contact_messages SET is_read = 1 WHERE id = $1 RETURNING {CONTACT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM contact_messages WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_unread(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM contact_messages WHERE is_read = 0")
            .fetch_one(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DBService;

    #[tokio::test]
    async fn unread_filter_and_mark_read() {
        let db = DBService::new_in_memory().await.unwrap();
        let msg = ContactMessage::create(
            &db.pool,
            &CreateContactMessage {
                name: " Linus ".to_string(),
                email: "linus@example.com".to_string(),
                subject: Some("Bulk order".to_string()),
                message: "Do you sell refurbished laptops?".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(msg.name, "Linus");
        assert_eq!(ContactMessage::count_unread(&db.pool).await.unwrap(), 1);

        let read = ContactMessage::mark_read(&db.pool, msg.id).await.unwrap().unwrap();
        assert!(read.is_read);
        assert!(ContactMessage::find_all(&db.pool, true).await.unwrap().is_empty());
        assert_eq!(ContactMessage::find_all(&db.pool, false).await.unwrap().len(), 1);

        assert_eq!(ContactMessage::delete(&db.pool, msg.id).await.unwrap(), 1);
        assert!(ContactMessage::mark_read(&db.pool, msg.id).await.unwrap().is_none());
    }
}
