//! Editable landing-page content, stored as a single JSON document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::{decode_json, encode_json};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
pub struct HeroSection {
    pub title: String,
    pub subtitle: String,
    pub image_url: Option<String>,
    pub cta_label: String,
}

impl Default for HeroSection {
    fn default() -> Self {
        Self {
            title: "Your devices, fixed and upgraded".to_string(),
            subtitle: "Shop certified phones, laptops and accessories, or book a repair with \
                       an instant AI diagnosis."
                .to_string(),
            image_url: None,
            cta_label: "Book a repair".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureCard {
    pub title: String,
    pub description: String,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
pub struct PromoBanner {
    pub text: String,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactDetails {
    pub phone: String,
    pub email: String,
    pub address: String,
}

impl Default for ContactDetails {
    fn default() -> Self {
        Self {
            phone: "+1 (555) 010-2030".to_string(),
            email: "support@blucell.example".to_string(),
            address: "12 Circuit Lane, Suite 4".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
pub struct CmsContent {
    pub hero: HeroSection,
    pub features: Vec<FeatureCard>,
    pub promo_banner: Option<PromoBanner>,
    pub about: String,
    pub contact: ContactDetails,
}

impl Default for CmsContent {
    fn default() -> Self {
        Self {
            hero: HeroSection::default(),
            features: vec![
                FeatureCard {
                    title: "Certified technicians".to_string(),
                    description: "Every repair is handled by a vetted fixer.".to_string(),
                    icon: Some("wrench".to_string()),
                },
                FeatureCard {
                    title: "90-day warranty".to_string(),
                    description: "Parts and labour are covered after every repair.".to_string(),
                    icon: Some("shield".to_string()),
                },
                FeatureCard {
                    title: "Fast delivery".to_string(),
                    description: "Orders ship within one business day.".to_string(),
                    icon: Some("truck".to_string()),
                },
            ],
            promo_banner: None,
            about: "BLUCELL sells and repairs phones, tablets and laptops.".to_string(),
            contact: ContactDetails::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CmsDocument {
    pub content: CmsContent,
    pub updated_by: Option<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct CmsRow {
    content: String,
    updated_by: Option<Uuid>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CmsRow> for CmsDocument {
    type Error = sqlx::Error;

    fn try_from(row: CmsRow) -> Result<Self, Self::Error> {
        Ok(CmsDocument {
            content: decode_json("content", &row.content)?,
            updated_by: row.updated_by,
            updated_at: Some(row.updated_at),
        })
    }
}

impl CmsDocument {
    /// The stored document, or the built-in defaults when nothing was saved yet.
    pub async fn load(pool: &SqlitePool) -> Result<Self, sqlx::Error> {
        let row = sqlx::query_as::<_, CmsRow>(
            "SELECT content, updated_by, updated_at FROM cms_config WHERE id = 1",
        )
        .fetch_optional(pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => Ok(CmsDocument {
                content: CmsContent::default(),
                updated_by: None,
                updated_at: None,
            }),
        }
    }

    pub async fn save(
        pool: &SqlitePool,
        content: &CmsContent,
        updated_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let json = encode_json(content)?;
        let row = sqlx::query_as::<_, CmsRow>(
            "INSERT INTO cms_config (id, content, updated_by) VALUES (1, $1, $2)
             ON CONFLICT(id) DO UPDATE SET
                 content = excluded.content,
                 updated_by = excluded.updated_by,
                 updated_at = datetime('now', 'subsec')
             RETURNING content, updated_by, updated_at",
        )
        .bind(json)
        .bind(updated_by)
        .fetch_one(pool)
        .await?;
        row.try_into()
    }
}
