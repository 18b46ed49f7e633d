use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::{decode_json, encode_json};

/// Lifecycle of a repair job. Jobs move strictly forward, one step at a time.
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display,
    Default,
)]
#[sqlx(type_name = "repair_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RepairStatus {
    #[default]
    Pending,
    Diagnosing,
    InProgress,
    Completed,
    Delivered,
}

impl RepairStatus {
    pub const SEQUENCE: [RepairStatus; 5] = [
        RepairStatus::Pending,
        RepairStatus::Diagnosing,
        RepairStatus::InProgress,
        RepairStatus::Completed,
        RepairStatus::Delivered,
    ];

    pub fn next(self) -> Option<Self> {
        let idx = Self::SEQUENCE.iter().position(|s| *s == self)?;
        Self::SEQUENCE.get(idx + 1).copied()
    }

    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }

    /// Still on the bench: not yet completed or handed back.
    pub fn is_active(self) -> bool {
        !matches!(self, RepairStatus::Completed | RepairStatus::Delivered)
    }
}

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, Display, Default)]
#[sqlx(type_name = "diagnosis_source", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DiagnosisSource {
    Ai,
    #[default]
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: RepairStatus,
    pub changed_at: DateTime<Utc>,
    pub changed_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RepairJob {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub fixer_id: Option<Uuid>,
    pub device_type: String,
    pub brand: String,
    pub model: String,
    pub issue_description: String,
    pub ai_diagnosis: Option<String>,
    pub diagnosis_source: DiagnosisSource,
    pub status: RepairStatus,
    pub estimated_cost_cents: Option<i64>,
    pub fixer_notes: Option<String>,
    pub status_history: Vec<StatusChange>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct RepairRow {
    id: Uuid,
    customer_id: Uuid,
    fixer_id: Option<Uuid>,
    device_type: String,
    brand: String,
    model: String,
    issue_description: String,
    ai_diagnosis: Option<String>,
    diagnosis_source: DiagnosisSource,
    status: RepairStatus,
    estimated_cost_cents: Option<i64>,
    fixer_notes: Option<String>,
    status_history: String, // JSON array of StatusChange
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RepairRow> for RepairJob {
    type Error = sqlx::Error;

    fn try_from(row: RepairRow) -> Result<Self, Self::Error> {
        Ok(RepairJob {
            status_history: decode_json("status_history", &row.status_history)?,
            id: row.id,
            customer_id: row.customer_id,
            fixer_id: row.fixer_id,
            device_type: row.device_type,
            brand: row.brand,
            model: row.model,
            issue_description: row.issue_description,
            ai_diagnosis: row.ai_diagnosis,
            diagnosis_source: row.diagnosis_source,
            status: row.status,
            estimated_cost_cents: row.estimated_cost_cents,
            fixer_notes: row.fixer_notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// What a customer fills in on the intake form.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RepairIntake {
    pub device_type: String,
    pub brand: String,
    pub model: String,
    pub issue_description: String,
}

#[derive(Debug, Clone)]
pub struct CreateRepair {
    pub customer_id: Uuid,
    pub intake: RepairIntake,
    pub ai_diagnosis: Option<String>,
    pub diagnosis_source: DiagnosisSource,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRepairDetails {
    pub estimated_cost_cents: Option<i64>,
    pub fixer_notes: Option<String>,
}

/// Which repairs a caller is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairScope {
    All,
    Customer(Uuid),
    Fixer(Uuid),
}

const REPAIR_COLUMNS: &str = "id, customer_id, fixer_id, device_type, brand, model, \
    issue_description, ai_diagnosis, diagnosis_source, status, estimated_cost_cents, \
    fixer_notes, status_history, created_at, updated_at";

impl RepairJob {
    pub fn device_label(&self) -> String {
        format!("{} {} ({})", self.brand, self.model, self.device_type)
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateRepair,
        repair_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let history = encode_json(&vec![StatusChange {
            status: RepairStatus::Pending,
            changed_at: Utc::now(),
            changed_by: Some(data.customer_id),
        }])?;
        let row = sqlx::query_as::<_, RepairRow>(&format!(
            "INSERT INTO repairs (id, customer_id, device_type, brand, model, issue_description,
                 ai_diagnosis, diagnosis_source, status, status_history)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {REPAIR_COLUMNS}"
        ))
        .bind(repair_id)
        .bind(data.customer_id)
        .bind(&data.intake.device_type)
        .bind(&data.intake.brand)
        .bind(&data.intake.model)
        .bind(&data.intake.issue_description)
        .bind(&data.ai_diagnosis)
        .bind(data.diagnosis_source)
        .bind(RepairStatus::Pending)
        .bind(history)
        .fetch_one(pool)
        .await?;
        row.try_into()
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, RepairRow>(&format!(
            "SELECT {REPAIR_COLUMNS} FROM repairs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(RepairJob::try_from)
        .transpose()
    }

    pub async fn find_in_scope(
        pool: &SqlitePool,
        scope: RepairScope,
        status: Option<RepairStatus>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let (customer_id, fixer_id) = match scope {
            RepairScope::All => (None, None),
            RepairScope::Customer(id) => (Some(id), None),
            RepairScope::Fixer(id) => (None, Some(id)),
        };
        let rows = sqlx::query_as::<_, RepairRow>(&format!(
            "SELECT {REPAIR_COLUMNS} FROM repairs
             WHERE ($1 IS NULL OR customer_id = $1)
               AND ($2 IS NULL OR fixer_id = $2)
               AND ($3 IS NULL OR status = $3)
             ORDER BY created_at DESC"
        ))
        .bind(customer_id)
        .bind(fixer_id)
        .bind(status)
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(RepairJob::try_from).collect()
    }

    pub async fn assign_fixer(
        pool: &SqlitePool,
        id: Uuid,
        fixer_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, RepairRow>(&format!(
            "UPDATE repairs SET fixer_id = $2, updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {REPAIR_COLUMNS}"
        ))
        .bind(id)
        .bind(fixer_id)
        .fetch_optional(pool)
        .await?
        .map(RepairJob::try_from)
        .transpose()
    }

    /// Compare-and-set the status. Returns `None` when the job is no longer in
    /// `expected`, so concurrent updates cannot skip a step.
    pub async fn transition_status(
        pool: &SqlitePool,
        id: Uuid,
        expected: RepairStatus,
        target: RepairStatus,
        history: &[StatusChange],
    ) -> Result<Option<Self>, sqlx::Error> {
        let history = encode_json(&history)?;
        sqlx::query_as::<_, RepairRow>(&format!(
            "UPDATE repairs
             SET status = $3, status_history = $4, updated_at = datetime('now', 'subsec')
             WHERE id = $1 AND status = $2
             RETURNING {REPAIR_COLUMNS}"
        ))
        .bind(id)
        .bind(expected)
        .bind(target)
        .bind(history)
        .fetch_optional(pool)
        .await?
        .map(RepairJob::try_from)
        .transpose()
    }

    pub async fn update_details(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateRepairDetails,
    ) -> Result<Self, sqlx::Error> {
        let row = sqlx::query_as::<_, RepairRow>(&format!(
            "UPDATE repairs
             SET estimated_cost_cents = COALESCE($2, estimated_cost_cents),
                 fixer_notes = COALESCE($3, fixer_notes),
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {REPAIR_COLUMNS}"
        ))
        .bind(id)
        .bind(data.estimated_cost_cents)
        .bind(&data.fixer_notes)
        .fetch_one(pool)
        .await?;
        row.try_into()
    }

    /// Number of repairs in `scope` that are still active.
    pub async fn count_active(pool: &SqlitePool, scope: RepairScope) -> Result<i64, sqlx::Error> {
        Self::count_where(pool, scope, "status NOT IN ('COMPLETED', 'DELIVERED')").await
    }

    pub async fn count_finished(pool: &SqlitePool, scope: RepairScope) -> Result<i64, sqlx::Error> {
        Self::count_where(pool, scope, "status IN ('COMPLETED', 'DELIVERED')").await
    }

    pub async fn count_with_status(
        pool: &SqlitePool,
        status: RepairStatus,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM repairs WHERE status = $1")
            .bind(status)
            .fetch_one(pool)
            .await
    }

    async fn count_where(
        pool: &SqlitePool,
        scope: RepairScope,
        condition: &str,
    ) -> Result<i64, sqlx::Error> {
        let (customer_id, fixer_id) = match scope {
            RepairScope::All => (None, None),
            RepairScope::Customer(id) => (Some(id), None),
            RepairScope::Fixer(id) => (None, Some(id)),
        };
        sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM repairs
             WHERE ($1 IS NULL OR customer_id = $1)
               AND ($2 IS NULL OR fixer_id = $2)
               AND {condition}"
        ))
        .bind(customer_id)
        .bind(fixer_id)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        DBService,
        models::user::{IdentityProfile, Role, User},
    };

    pub(crate) async fn user(db: &DBService, email: &str, role: Role) -> User {
        User::upsert_from_identity(
            &db.pool,
            &IdentityProfile {
                id: Uuid::new_v4(),
                email: email.to_string(),
                full_name: None,
                avatar_url: None,
            },
            role,
        )
        .await
        .unwrap()
    }

    pub(crate) fn intake() -> RepairIntake {
        RepairIntake {
            device_type: "phone".to_string(),
            brand: "Apple".to_string(),
            model: "iPhone 13".to_string(),
            issue_description: "Cracked screen after a drop".to_string(),
        }
    }

    #[test]
    fn status_sequence_only_moves_forward_one_step() {
        assert_eq!(RepairStatus::Pending.next(), Some(RepairStatus::Diagnosing));
        assert_eq!(RepairStatus::Delivered.next(), None);
        assert!(RepairStatus::InProgress.can_transition_to(RepairStatus::Completed));
        assert!(!RepairStatus::Pending.can_transition_to(RepairStatus::InProgress));
        assert!(!RepairStatus::Completed.can_transition_to(RepairStatus::Pending));
        assert_eq!(RepairStatus::InProgress.to_string(), "IN_PROGRESS");
        assert_eq!(
            serde_json::to_string(&RepairStatus::InProgress).unwrap(),
            "\"IN_PROGRESS\""
        );
    }

    #[tokio::test]
    async fn create_and_scope_queries() {
        let db = DBService::new_in_memory().await.unwrap();
        let customer = user(&db, "c@example.com", Role::Customer).await;
        let other = user(&db, "o@example.com", Role::Customer).await;
        let fixer = user(&db, "f@example.com", Role::Fixer).await;

        let job = RepairJob::create(
            &db.pool,
            &CreateRepair {
                customer_id: customer.id,
                intake: intake(),
                ai_diagnosis: Some("Replace the display assembly.".to_string()),
                diagnosis_source: DiagnosisSource::Fallback,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        assert_eq!(job.status, RepairStatus::Pending);
        assert_eq!(job.status_history.len(), 1);

        RepairJob::create(
            &db.pool,
            &CreateRepair {
                customer_id: other.id,
                intake: intake(),
                ai_diagnosis: None,
                diagnosis_source: DiagnosisSource::Fallback,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let mine = RepairJob::find_in_scope(&db.pool, RepairScope::Customer(customer.id), None)
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);

        RepairJob::assign_fixer(&db.pool, job.id, fixer.id).await.unwrap();
        let assigned = RepairJob::find_in_scope(&db.pool, RepairScope::Fixer(fixer.id), None)
            .await
            .unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(
            RepairJob::count_active(&db.pool, RepairScope::All).await.unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn transition_is_compare_and_set() {
        let db = DBService::new_in_memory().await.unwrap();
        let customer = user(&db, "c@example.com", Role::Customer).await;
        let job = RepairJob::create(
            &db.pool,
            &CreateRepair {
                customer_id: customer.id,
                intake: intake(),
                ai_diagnosis: None,
                diagnosis_source: DiagnosisSource::Fallback,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let mut history = job.status_history.clone();
        history.push(StatusChange {
            status: RepairStatus::Diagnosing,
            changed_at: Utc::now(),
            changed_by: None,
        });
        let moved = RepairJob::transition_status(
            &db.pool,
            job.id,
            RepairStatus::Pending,
            RepairStatus::Diagnosing,
            &history,
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(moved.status, RepairStatus::Diagnosing);
        assert_eq!(moved.status_history.len(), 2);

        let stale = RepairJob::transition_status(
            &db.pool,
            job.id,
            RepairStatus::Pending,
            RepairStatus::Diagnosing,
            &history,
        )
        .await
        .unwrap();
        assert!(stale.is_none());
    }
}
