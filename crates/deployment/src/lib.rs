use async_trait::async_trait;
use db::{
    DBService,
    models::user::{IdentityProfile, Role, User},
};
use services::services::{
    ai_assistant::AiAssistant,
    claude_api::ClaudeApiError,
    config::{Config, ConfigError},
    database_validator::DatabaseValidationError,
    repair_workflow::RepairWorkflow,
    support_chat::SupportChat,
};
use thiserror::Error;
use tracing::info;
use utils::identity::{IdentityClaims, IdentityError};

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    DatabaseValidation(#[from] DatabaseValidationError),
    #[error(transparent)]
    ClaudeApi(#[from] ClaudeApiError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("email {0} already belongs to another account")]
    EmailInUse(String),
}

#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    async fn new() -> Result<Self, DeploymentError>;

    fn config(&self) -> &Config;

    fn db(&self) -> &DBService;

    fn assistant(&self) -> &AiAssistant;

    fn repairs(&self) -> RepairWorkflow {
        RepairWorkflow::new(self.db().pool.clone(), self.assistant().clone())
    }

    fn support_chat(&self) -> SupportChat {
        SupportChat::new(self.db().pool.clone(), self.assistant().clone())
    }

    /// Load or provision the profile behind a verified identity token.
    /// First-time users listed in `ADMIN_EMAILS` become admins.
    async fn ensure_user(&self, claims: &IdentityClaims) -> Result<User, DeploymentError> {
        let email = claims
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| IdentityError::Invalid("token carries no email".to_string()))?;

        let role_if_new = if self.config().is_admin_email(email) {
            Role::Admin
        } else {
            Role::Customer
        };
        let profile = IdentityProfile {
            id: claims.sub,
            email: email.to_string(),
            full_name: claims.user_metadata.full_name.clone(),
            avatar_url: claims.user_metadata.avatar_url.clone(),
        };

        let pool = &self.db().pool;
        let existing = User::find_by_id(pool, profile.id).await?;
        if let Some(user) = existing.as_ref().filter(|u| u.matches_identity(&profile)) {
            return Ok(user.clone());
        }

        let user = User::upsert_from_identity(pool, &profile, role_if_new)
            .await
            .map_err(|err| match err {
                sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                    DeploymentError::EmailInUse(profile.email.clone())
                }
                other => DeploymentError::Sqlx(other),
            })?;
        if existing.is_none() {
            info!(user_id = %user.id, role = %user.role, "Provisioned user profile");
        }
        Ok(user)
    }
}
