use chrono::Utc;
use db::{
    DBService,
    models::user::{IdentityProfile, Role, User},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;
use services::services::{ai_assistant::AiAssistant, config::Config};
use uuid::Uuid;

use crate::DeploymentImpl;

pub(crate) const TEST_SECRET: &[u8] = b"test-secret";

pub(crate) async fn deployment() -> DeploymentImpl {
    let config = Config::from_lookup(|key| match key {
        "AUTH_JWT_SECRET" => Some("test-secret".to_string()),
        "ADMIN_EMAILS" => Some("admin@blucell.test".to_string()),
        _ => None,
    })
    .unwrap();
    let db = DBService::new_in_memory().await.unwrap();
    DeploymentImpl::with_parts(config, db, AiAssistant::offline())
}

/// Insert a profile with the given role straight into the database.
pub(crate) async fn user(deployment: &DeploymentImpl, name: &str, role: Role) -> User {
    use deployment::Deployment;

    User::upsert_from_identity(
        &deployment.db().pool,
        &IdentityProfile {
            id: Uuid::new_v4(),
            email: format!("{name}@blucell.test"),
            full_name: Some(name.to_string()),
            avatar_url: None,
        },
        role,
    )
    .await
    .unwrap()
}

/// HS256 token shaped like the identity provider's, valid for `ttl_secs`.
pub(crate) fn token_for(email: &str, secret: &[u8], ttl_secs: i64) -> String {
    let claims = json!({
        "sub": Uuid::new_v4(),
        "email": email,
        "aud": "authenticated",
        "exp": Utc::now().timestamp() + ttl_secs,
        "user_metadata": {}
    });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret)).unwrap()
}
