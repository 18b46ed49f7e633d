use std::sync::Arc;

use async_trait::async_trait;
use db::DBService;
use deployment::{Deployment, DeploymentError};
use services::services::{
    ai_assistant::{AiAssistant, TextGenerator},
    claude_api::ClaudeApiClient,
    config::Config,
    database_validator::DatabaseValidator,
};
use tracing::info;

/// Single-process deployment backed by a SQLite file.
#[derive(Clone)]
pub struct LocalDeployment {
    config: Arc<Config>,
    db: DBService,
    assistant: AiAssistant,
}

impl LocalDeployment {
    /// Open the database, check the schema and set up the assistant.
    pub async fn with_config(config: Config) -> Result<Self, DeploymentError> {
        let db = DBService::new(&config.database_url).await?;
        DatabaseValidator::new(db.pool.clone()).ensure_ready().await?;

        let generator: Option<Arc<dyn TextGenerator>> = match &config.anthropic_api_key {
            Some(key) => {
                let client = ClaudeApiClient::new(key.clone(), config.anthropic_model.clone())?;
                info!(model = client.model(), "AI assistant enabled");
                Some(Arc::new(client))
            }
            None => None,
        };

        Ok(Self::with_parts(config, db, AiAssistant::new(generator)))
    }

    pub fn with_parts(config: Config, db: DBService, assistant: AiAssistant) -> Self {
        Self {
            config: Arc::new(config),
            db,
            assistant,
        }
    }
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new() -> Result<Self, DeploymentError> {
        let config = Config::from_env()?;
        Self::with_config(config).await
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn db(&self) -> &DBService {
        &self.db
    }

    fn assistant(&self) -> &AiAssistant {
        &self.assistant
    }
}
