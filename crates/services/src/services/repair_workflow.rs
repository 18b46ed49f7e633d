//! Repair intake, fixer assignment and the fixed status sequence.

use chrono::Utc;
use db::models::{
    repair::{
        CreateRepair, RepairIntake, RepairJob, RepairScope, RepairStatus, StatusChange,
        UpdateRepairDetails,
    },
    repair_chat::RepairChatMessage,
    user::{Role, User},
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::{
    access::{self, AccessDenied},
    ai_assistant::{AiAssistant, Diagnosis},
};

const MAX_ISSUE_LENGTH: usize = 2000;
const MAX_CHAT_MESSAGE_LENGTH: usize = 2000;

#[derive(Debug, Error)]
pub enum RepairWorkflowError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),
    #[error("repair not found")]
    NotFound,
    #[error("{0}")]
    InvalidInput(String),
    #[error("user {0} is not a fixer")]
    NotAFixer(Uuid),
    #[error("cannot move repair from {from} to {to}")]
    InvalidTransition {
        from: RepairStatus,
        to: RepairStatus,
    },
}

fn require_text(field: &str, value: &str, max_len: usize) -> Result<(), RepairWorkflowError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(RepairWorkflowError::InvalidInput(format!("{field} is required")));
    }
    if value.chars().count() > max_len {
        return Err(RepairWorkflowError::InvalidInput(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(())
}

pub fn validate_intake(intake: &RepairIntake) -> Result<(), RepairWorkflowError> {
    require_text("deviceType", &intake.device_type, 100)?;
    require_text("brand", &intake.brand, 100)?;
    require_text("model", &intake.model, 100)?;
    require_text("issueDescription", &intake.issue_description, MAX_ISSUE_LENGTH)
}

#[derive(Clone)]
pub struct RepairWorkflow {
    pool: SqlitePool,
    assistant: AiAssistant,
}

impl RepairWorkflow {
    pub fn new(pool: SqlitePool, assistant: AiAssistant) -> Self {
        Self { pool, assistant }
    }

    /// Diagnosis for an intake that is not stored yet.
    pub async fn preview_diagnosis(
        &self,
        intake: &RepairIntake,
    ) -> Result<Diagnosis, RepairWorkflowError> {
        validate_intake(intake)?;
        Ok(self.assistant.diagnose(intake).await)
    }

    pub async fn submit(
        &self,
        customer: &User,
        intake: RepairIntake,
    ) -> Result<RepairJob, RepairWorkflowError> {
        validate_intake(&intake)?;
        let diagnosis = self.assistant.diagnose(&intake).await;

        let repair = RepairJob::create(
            &self.pool,
            &CreateRepair {
                customer_id: customer.id,
                intake,
                ai_diagnosis: Some(diagnosis.text),
                diagnosis_source: diagnosis.source,
            },
            Uuid::new_v4(),
        )
        .await?;

        info!(
            repair_id = %repair.id,
            customer_id = %customer.id,
            diagnosis_source = %repair.diagnosis_source,
            "Repair submitted"
        );
        Ok(repair)
    }

    pub async fn list(
        &self,
        user: &User,
        status: Option<RepairStatus>,
    ) -> Result<Vec<RepairJob>, RepairWorkflowError> {
        let scope = match user.role {
            Role::Admin => RepairScope::All,
            Role::Fixer => RepairScope::Fixer(user.id),
            Role::Customer => RepairScope::Customer(user.id),
        };
        Ok(RepairJob::find_in_scope(&self.pool, scope, status).await?)
    }

    pub async fn get(&self, user: &User, id: Uuid) -> Result<RepairJob, RepairWorkflowError> {
        let repair = RepairJob::find_by_id(&self.pool, id)
            .await?
            .ok_or(RepairWorkflowError::NotFound)?;
        if !access::can_view_repair(user, &repair) {
            return Err(AccessDenied::new(user.role, "view this repair").into());
        }
        Ok(repair)
    }

    /// Like [`get`](Self::get) but only for the assigned fixer or an admin.
    async fn get_for_work(&self, user: &User, id: Uuid) -> Result<RepairJob, RepairWorkflowError> {
        let repair = self.get(user, id).await?;
        if !access::can_work_on_repair(user, &repair) {
            return Err(AccessDenied::new(user.role, "work on this repair").into());
        }
        Ok(repair)
    }

    pub async fn assign(
        &self,
        admin: &User,
        id: Uuid,
        fixer_id: Uuid,
    ) -> Result<RepairJob, RepairWorkflowError> {
        access::require_admin(admin, "assign repairs")?;

        let fixer = User::find_by_id(&self.pool, fixer_id).await?;
        if fixer.map(|f| f.role) != Some(Role::Fixer) {
            return Err(RepairWorkflowError::NotAFixer(fixer_id));
        }

        let repair = RepairJob::assign_fixer(&self.pool, id, fixer_id)
            .await?
            .ok_or(RepairWorkflowError::NotFound)?;
        info!(repair_id = %id, fixer_id = %fixer_id, "Repair assigned");
        Ok(repair)
    }

    /// Move the job one step along the sequence and record who did it.
    pub async fn advance_status(
        &self,
        user: &User,
        id: Uuid,
        target: RepairStatus,
    ) -> Result<RepairJob, RepairWorkflowError> {
        let repair = self.get_for_work(user, id).await?;
        let invalid = RepairWorkflowError::InvalidTransition {
            from: repair.status,
            to: target,
        };
        if !repair.status.can_transition_to(target) {
            return Err(invalid);
        }

        let mut history = repair.status_history.clone();
        history.push(StatusChange {
            status: target,
            changed_at: Utc::now(),
            changed_by: Some(user.id),
        });

        let updated =
            RepairJob::transition_status(&self.pool, id, repair.status, target, &history)
                .await?
                .ok_or(invalid)?;
        info!(repair_id = %id, from = %repair.status, to = %target, user_id = %user.id, "Repair status changed");
        Ok(updated)
    }

    pub async fn update_details(
        &self,
        user: &User,
        id: Uuid,
        details: &UpdateRepairDetails,
    ) -> Result<RepairJob, RepairWorkflowError> {
        self.get_for_work(user, id).await?;
        if details.estimated_cost_cents.is_some_and(|cents| cents < 0) {
            return Err(RepairWorkflowError::InvalidInput(
                "estimatedCostCents must not be negative".to_string(),
            ));
        }
        Ok(RepairJob::update_details(&self.pool, id, details).await?)
    }

    pub async fn messages(
        &self,
        user: &User,
        id: Uuid,
    ) -> Result<Vec<RepairChatMessage>, RepairWorkflowError> {
        self.get(user, id).await?;
        Ok(RepairChatMessage::find_by_repair_id(&self.pool, id).await?)
    }

    pub async fn post_message(
        &self,
        user: &User,
        id: Uuid,
        message: &str,
    ) -> Result<RepairChatMessage, RepairWorkflowError> {
        self.get(user, id).await?;
        require_text("message", message, MAX_CHAT_MESSAGE_LENGTH)?;
        Ok(RepairChatMessage::create(&self.pool, id, user.id, user.role, message.trim()).await?)
    }
}

#[cfg(test)]
mod tests {
    use db::{DBService, models::{repair::DiagnosisSource, user::IdentityProfile}};

    use super::*;
    use crate::services::ai_assistant::tests::StubGenerator;

    async fn user(db: &DBService, name: &str, role: Role) -> User {
        User::upsert_from_identity(
            &db.pool,
            &IdentityProfile {
                id: Uuid::new_v4(),
                email: format!("{name}@example.com"),
                full_name: Some(name.to_string()),
                avatar_url: None,
            },
            role,
        )
        .await
        .unwrap()
    }

    fn intake(issue: &str) -> RepairIntake {
        RepairIntake {
            device_type: "phone".to_string(),
            brand: "Acme".to_string(),
            model: "X1".to_string(),
            issue_description: issue.to_string(),
        }
    }

    #[tokio::test]
    async fn submit_uses_fallback_when_offline() {
        let db = DBService::new_in_memory().await.unwrap();
        let workflow = RepairWorkflow::new(db.pool.clone(), AiAssistant::offline());
        let customer = user(&db, "cus", Role::Customer).await;

        let repair = workflow
            .submit(&customer, intake("The screen is cracked"))
            .await
            .unwrap();

        assert_eq!(repair.status, RepairStatus::Pending);
        assert_eq!(repair.diagnosis_source, DiagnosisSource::Fallback);
        assert!(repair.ai_diagnosis.is_some());
        assert_eq!(repair.status_history.len(), 1);
    }

    #[tokio::test]
    async fn submit_stores_generated_diagnosis() {
        let db = DBService::new_in_memory().await.unwrap();
        let assistant = AiAssistant::new(Some(StubGenerator::replying("Replace the battery.")));
        let workflow = RepairWorkflow::new(db.pool.clone(), assistant);
        let customer = user(&db, "cus", Role::Customer).await;

        let repair = workflow
            .submit(&customer, intake("Drains fast"))
            .await
            .unwrap();

        assert_eq!(repair.diagnosis_source, DiagnosisSource::Ai);
        assert_eq!(repair.ai_diagnosis.as_deref(), Some("Replace the battery."));
    }

    #[tokio::test]
    async fn rejects_blank_intake() {
        let db = DBService::new_in_memory().await.unwrap();
        let workflow = RepairWorkflow::new(db.pool.clone(), AiAssistant::offline());
        let customer = user(&db, "cus", Role::Customer).await;

        let err = workflow.submit(&customer, intake("   ")).await.unwrap_err();
        assert!(matches!(err, RepairWorkflowError::InvalidInput(_)));
        assert!(workflow.list(&customer, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_fixers_can_be_assigned() {
        let db = DBService::new_in_memory().await.unwrap();
        let workflow = RepairWorkflow::new(db.pool.clone(), AiAssistant::offline());
        let admin = user(&db, "admin", Role::Admin).await;
        let customer = user(&db, "cus", Role::Customer).await;
        let fixer = user(&db, "fix", Role::Fixer).await;
        let repair = workflow.submit(&customer, intake("No sound")).await.unwrap();

        let err = workflow.assign(&admin, repair.id, customer.id).await.unwrap_err();
        assert!(matches!(err, RepairWorkflowError::NotAFixer(_)));

        let err = workflow.assign(&fixer, repair.id, fixer.id).await.unwrap_err();
        assert!(matches!(err, RepairWorkflowError::AccessDenied(_)));

        let assigned = workflow.assign(&admin, repair.id, fixer.id).await.unwrap();
        assert_eq!(assigned.fixer_id, Some(fixer.id));
        assert_eq!(workflow.list(&fixer, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn status_moves_one_step_at_a_time() {
        let db = DBService::new_in_memory().await.unwrap();
        let workflow = RepairWorkflow::new(db.pool.clone(), AiAssistant::offline());
        let admin = user(&db, "admin", Role::Admin).await;
        let customer = user(&db, "cus", Role::Customer).await;
        let fixer = user(&db, "fix", Role::Fixer).await;
        let other_fixer = user(&db, "other", Role::Fixer).await;
        let repair = workflow.submit(&customer, intake("Won't boot")).await.unwrap();
        workflow.assign(&admin, repair.id, fixer.id).await.unwrap();

        let err = workflow
            .advance_status(&fixer, repair.id, RepairStatus::InProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, RepairWorkflowError::InvalidTransition { .. }));

        let err = workflow
            .advance_status(&customer, repair.id, RepairStatus::Diagnosing)
            .await
            .unwrap_err();
        assert!(matches!(err, RepairWorkflowError::AccessDenied(_)));

        let err = workflow
            .advance_status(&other_fixer, repair.id, RepairStatus::Diagnosing)
            .await
            .unwrap_err();
        assert!(matches!(err, RepairWorkflowError::AccessDenied(_)));

        let mut current = repair;
        for status in [
            RepairStatus::Diagnosing,
            RepairStatus::InProgress,
            RepairStatus::Completed,
            RepairStatus::Delivered,
        ] {
            current = workflow.advance_status(&fixer, current.id, status).await.unwrap();
        }
        assert_eq!(current.status, RepairStatus::Delivered);
        assert_eq!(current.status_history.len(), 5);
        assert_eq!(current.status_history[4].changed_by, Some(fixer.id));

        let err = workflow
            .advance_status(&admin, current.id, RepairStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, RepairWorkflowError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn chat_is_limited_to_participants() {
        let db = DBService::new_in_memory().await.unwrap();
        let workflow = RepairWorkflow::new(db.pool.clone(), AiAssistant::offline());
        let customer = user(&db, "cus", Role::Customer).await;
        let stranger = user(&db, "stranger", Role::Customer).await;
        let repair = workflow.submit(&customer, intake("Camera blurry")).await.unwrap();

        workflow
            .post_message(&customer, repair.id, " Any update? ")
            .await
            .unwrap();
        let err = workflow
            .post_message(&stranger, repair.id, "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, RepairWorkflowError::AccessDenied(_)));

        let messages = workflow.messages(&customer, repair.id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message, "Any update?");
        assert_eq!(messages[0].sender_role, Role::Customer);
    }

    #[tokio::test]
    async fn details_reject_negative_cost() {
        let db = DBService::new_in_memory().await.unwrap();
        let workflow = RepairWorkflow::new(db.pool.clone(), AiAssistant::offline());
        let admin = user(&db, "admin", Role::Admin).await;
        let customer = user(&db, "cus", Role::Customer).await;
        let repair = workflow.submit(&customer, intake("Battery swollen")).await.unwrap();

        let negative = UpdateRepairDetails {
            estimated_cost_cents: Some(-1),
            fixer_notes: None,
        };
        assert!(workflow.update_details(&admin, repair.id, &negative).await.is_err());

        let details = UpdateRepairDetails {
            estimated_cost_cents: Some(8_900),
            fixer_notes: Some("Needs a new cell".to_string()),
        };
        let updated = workflow.update_details(&admin, repair.id, &details).await.unwrap();
        assert_eq!(updated.estimated_cost_cents, Some(8_900));
        assert_eq!(updated.fixer_notes.as_deref(), Some("Needs a new cell"));
    }
}
