use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, Hash, TS, EnumString, Display,
    Default,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Fixer,
    Admin,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile data carried by a verified identity token.
#[derive(Debug, Clone)]
pub struct IdentityProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfile {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
}

const USER_COLUMNS: &str =
    "id, email, full_name, phone, avatar_url, role, created_at, updated_at";

impl User {
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.email)
    }

    /// Whether a stored profile already reflects the identity token, so
    /// nothing needs writing.
    pub fn matches_identity(&self, identity: &IdentityProfile) -> bool {
        self.email == identity.email
            && (self.full_name.is_some() || identity.full_name.is_none())
            && (self.avatar_url.is_some() || identity.avatar_url.is_none())
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_all(pool: &SqlitePool, role: Option<Role>) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE ($1 IS NULL OR role = $1)
             ORDER BY created_at DESC"
        ))
        .bind(role)
        .fetch_all(pool)
        .await
    }

    /// Insert a profile for a first-time identity, or refresh the email of an
    /// existing one. The role of an existing profile is never changed here.
    pub async fn upsert_from_identity(
        pool: &SqlitePool,
        identity: &IdentityProfile,
        role_if_new: Role,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, full_name, avatar_url, role)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT(id) DO UPDATE SET
                 email = excluded.email,
                 full_name = COALESCE(users.full_name, excluded.full_name),
                 avatar_url = COALESCE(users.avatar_url, excluded.avatar_url),
                 updated_at = datetime('now', 'subsec')
             RETURNING {USER_COLUMNS}"
        ))
        .bind(identity.id)
        .bind(&identity.email)
        .bind(&identity.full_name)
        .bind(&identity.avatar_url)
        .bind(role_if_new)
        .fetch_one(pool)
        .await
    }

    pub async fn update_profile(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateProfile,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET full_name = COALESCE($2, full_name),
                 phone = COALESCE($3, phone),
                 avatar_url = COALESCE($4, avatar_url),
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(&data.full_name)
        .bind(&data.phone)
        .bind(&data.avatar_url)
        .fetch_one(pool)
        .await
    }

    pub async fn update_role(pool: &SqlitePool, id: Uuid, role: Role) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $2, updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(pool)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DBService;

    fn identity(email: &str) -> IdentityProfile {
        IdentityProfile {
            id: Uuid::new_v4(),
            email: email.to_string(),
            full_name: Some("Grace Hopper".to_string()),
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn upsert_keeps_existing_role() {
        let db = DBService::new_in_memory().await.unwrap();
        let ident = identity("grace@example.com");

        let created = User::upsert_from_identity(&db.pool, &ident, Role::Customer)
            .await
            .unwrap();
        assert_eq!(created.role, Role::Customer);

        User::update_role(&db.pool, created.id, Role::Fixer).await.unwrap();

        let again = User::upsert_from_identity(&db.pool, &ident, Role::Admin)
            .await
            .unwrap();
        assert_eq!(again.role, Role::Fixer);
        assert_eq!(again.id, created.id);
    }

    #[tokio::test]
    async fn matches_identity_until_profile_data_changes() {
        let db = DBService::new_in_memory().await.unwrap();
        let mut ident = identity("grace@example.com");
        let user = User::upsert_from_identity(&db.pool, &ident, Role::Customer)
            .await
            .unwrap();
        assert!(user.matches_identity(&ident));

        ident.full_name = None;
        assert!(user.matches_identity(&ident));

        ident.avatar_url = Some("https://cdn.example.com/grace.png".to_string());
        assert!(!user.matches_identity(&ident));

        ident.avatar_url = None;
        ident.email = "grace@navy.example.com".to_string();
        assert!(!user.matches_identity(&ident));
    }

    #[tokio::test]
    async fn find_all_filters_by_role() {
        let db = DBService::new_in_memory().await.unwrap();
        let a = User::upsert_from_identity(&db.pool, &identity("a@example.com"), Role::Customer)
            .await
            .unwrap();
        User::upsert_from_identity(&db.pool, &identity("b@example.com"), Role::Fixer)
            .await
            .unwrap();

        let fixers = User::find_all(&db.pool, Some(Role::Fixer)).await.unwrap();
        assert_eq!(fixers.len(), 1);
        assert_eq!(fixers[0].email, "b@example.com");
        assert_eq!(User::find_all(&db.pool, None).await.unwrap().len(), 2);

        let updated = User::update_profile(
            &db.pool,
            a.id,
            &UpdateProfile {
                phone: Some("+1 555 0100".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.phone.as_deref(), Some("+1 555 0100"));
        assert_eq!(updated.full_name.as_deref(), Some("Grace Hopper"));
    }

    #[tokio::test]
    async fn update_role_of_missing_user_is_row_not_found() {
        let db = DBService::new_in_memory().await.unwrap();
        let err = User::update_role(&db.pool, Uuid::new_v4(), Role::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, sqlx::Error::RowNotFound));
    }
}
