use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::{decode_json, encode_json};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub brand: Option<String>,
    pub price_cents: i64,
    pub original_price_cents: Option<i64>,
    pub stock: i64,
    pub image_url: Option<String>,
    pub specs: BTreeMap<String, String>,
    pub rating: f64,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: String,
    category: String,
    brand: Option<String>,
    price_cents: i64,
    original_price_cents: Option<i64>,
    stock: i64,
    image_url: Option<String>,
    specs: String, // JSON object of spec name -> value
    rating: f64,
    is_featured: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = sqlx::Error;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            specs: decode_json("specs", &row.specs)?,
            id: row.id,
            name: row.name,
            description: row.description,
            category: row.category,
            brand: row.brand,
            price_cents: row.price_cents,
            original_price_cents: row.original_price_cents,
            stock: row.stock,
            image_url: row.image_url,
            rating: row.rating,
            is_featured: row.is_featured,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub brand: Option<String>,
    pub price_cents: i64,
    pub original_price_cents: Option<i64>,
    #[serde(default)]
    pub stock: i64,
    pub image_url: Option<String>,
    #[serde(default)]
    pub specs: BTreeMap<String, String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub is_featured: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    /// `null` clears the brand.
    #[serde(default, deserialize_with = "super::nullable")]
    #[ts(optional)]
    pub brand: Option<Option<String>>,
    pub price_cents: Option<i64>,
    #[serde(default, deserialize_with = "super::nullable")]
    #[ts(optional)]
    pub original_price_cents: Option<Option<i64>>,
    pub stock: Option<i64>,
    #[serde(default, deserialize_with = "super::nullable")]
    #[ts(optional)]
    pub image_url: Option<Option<String>>,
    pub specs: Option<BTreeMap<String, String>>,
    pub rating: Option<f64>,
    pub is_featured: Option<bool>,
}

impl UpdateProduct {
    /// Overlay the provided fields on top of an existing product.
    pub fn apply_to(self, existing: Product) -> CreateProduct {
        CreateProduct {
            name: self.name.unwrap_or(existing.name),
            description: self.description.unwrap_or(existing.description),
            category: self.category.unwrap_or(existing.category),
            brand: self.brand.unwrap_or(existing.brand),
            price_cents: self.price_cents.unwrap_or(existing.price_cents),
            original_price_cents: self
                .original_price_cents
                .unwrap_or(existing.original_price_cents),
            stock: self.stock.unwrap_or(existing.stock),
            image_url: self.image_url.unwrap_or(existing.image_url),
            specs: self.specs.unwrap_or(existing.specs),
            rating: self.rating.unwrap_or(existing.rating),
            is_featured: self.is_featured.unwrap_or(existing.is_featured),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub featured: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

const PRODUCT_COLUMNS: &str = "id, name, description, category, brand, price_cents, \
    original_price_cents, stock, image_url, specs, rating, is_featured, created_at, updated_at";

const DEFAULT_PAGE_SIZE: i64 = 50;

/// Make `%` and `_` in user input match literally under `ESCAPE '\'`.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
const MAX_PAGE_SIZE: i64 = 200;

impl Product {
    pub fn is_in_stock(&self) -> bool {
        self.stock > 0
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?
        .map(Product::try_from)
        .transpose()
    }

    pub async fn search(pool: &SqlitePool, query: &ProductQuery) -> Result<Vec<Self>, sqlx::Error> {
        let pattern = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(&s.to_lowercase())));
        let limit = query
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = query.offset.unwrap_or(0).max(0);

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE ($1 IS NULL OR category = $1)
               AND ($2 IS NULL
                    OR lower(name) LIKE $2 ESCAPE '\\'
                    OR lower(COALESCE(brand, '')) LIKE $2 ESCAPE '\\'
                    OR lower(description) LIKE $2 ESCAPE '\\')
               AND ($3 IS NULL OR is_featured = $3)
             ORDER BY is_featured DESC, created_at DESC
             LIMIT $4 OFFSET $5"
        ))
        .bind(&query.category)
        .bind(pattern)
        .bind(query.featured)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    pub async fn categories(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT DISTINCT category FROM products ORDER BY category")
            .fetch_all(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateProduct,
        product_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let specs = encode_json(&data.specs)?;
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO products (id, name, description, category, brand, price_cents,
                 original_price_cents, stock, image_url, specs, rating, is_featured)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(product_id)
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.category)
        .bind(&data.brand)
        .bind(data.price_cents)
        .bind(data.original_price_cents)
        .bind(data.stock)
        .bind(&data.image_url)
        .bind(specs)
        .bind(data.rating)
        .bind(data.is_featured)
        .fetch_one(pool)
        .await?;
        row.try_into()
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &CreateProduct,
    ) -> Result<Self, sqlx::Error> {
        let specs = encode_json(&data.specs)?;
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products
             SET name = $2, description = $3, category = $4, brand = $5, price_cents = $6,
                 original_price_cents = $7, stock = $8, image_url = $9, specs = $10,
                 rating = $11, is_featured = $12, updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.category)
        .bind(&data.brand)
        .bind(data.price_cents)
        .bind(data.original_price_cents)
        .bind(data.stock)
        .bind(&data.image_url)
        .bind(specs)
        .bind(data.rating)
        .bind(data.is_featured)
        .fetch_one(pool)
        .await?;
        row.try_into()
    }

    /// Atomically take `quantity` units out of stock. Returns false when the
    /// product does not have enough units left.
    pub async fn reserve_stock<'e, E>(
        executor: E,
        id: Uuid,
        quantity: i64,
    ) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE products SET stock = stock - $2, updated_at = datetime('now', 'subsec')
             WHERE id = $1 AND stock >= $2",
        )
        .bind(id)
        .bind(quantity)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn restore_stock<'e, E>(
        executor: E,
        id: Uuid,
        quantity: i64,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "UPDATE products SET stock = stock + $2, updated_at = datetime('now', 'subsec')
             WHERE id = $1",
        )
        .bind(id)
        .bind(quantity)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(pool)
            .await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::DBService;

    pub(crate) fn sample(name: &str, category: &str, price_cents: i64, stock: i64) -> CreateProduct {
        CreateProduct {
            name: name.to_string(),
            description: format!("{name} in great condition"),
            category: category.to_string(),
            brand: Some("Acme".to_string()),
            price_cents,
            original_price_cents: None,
            stock,
            image_url: None,
            specs: BTreeMap::from([("storage".to_string(), "128GB".to_string())]),
            rating: 4.5,
            is_featured: false,
        }
    }

    #[tokio::test]
    async fn create_round_trips_specs() {
        let db = DBService::new_in_memory().await.unwrap();
        let created = Product::create(&db.pool, &sample("Pixel 8", "phones", 49_900, 3), Uuid::new_v4())
            .await
            .unwrap();
        let found = Product::find_by_id(&db.pool, created.id).await.unwrap().unwrap();
        assert_eq!(found.specs.get("storage").map(String::as_str), Some("128GB"));
        assert!(found.is_in_stock());
    }

    #[tokio::test]
    async fn search_matches_name_brand_and_category() {
        let db = DBService::new_in_memory().await.unwrap();
        Product::create(&db.pool, &sample("Pixel 8", "phones", 49_900, 3), Uuid::new_v4())
            .await
            .unwrap();
        Product::create(&db.pool, &sample("USB-C Charger", "accessories", 1_999, 10), Uuid::new_v4())
            .await
            .unwrap();

        let by_name = Product::search(
            &db.pool,
            &ProductQuery {
                search: Some("pixel".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(by_name.len(), 1);

        let by_category = Product::search(
            &db.pool,
            &ProductQuery {
                category: Some("accessories".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(by_category[0].name, "USB-C Charger");

        let by_brand = Product::search(
            &db.pool,
            &ProductQuery {
                search: Some("ACME".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(by_brand.len(), 2);

        assert_eq!(
            Product::categories(&db.pool).await.unwrap(),
            vec!["accessories".to_string(), "phones".to_string()]
        );
    }

    #[tokio::test]
    async fn search_treats_wildcards_literally() {
        let db = DBService::new_in_memory().await.unwrap();
        Product::create(&db.pool, &sample("50% off bundle", "bundles", 2_999, 1), Uuid::new_v4())
            .await
            .unwrap();
        Product::create(&db.pool, &sample("Pixel 8", "phones", 49_900, 3), Uuid::new_v4())
            .await
            .unwrap();

        let search = |term: &str| ProductQuery {
            search: Some(term.to_string()),
            ..Default::default()
        };
        let percent = Product::search(&db.pool, &search("%")).await.unwrap();
        assert_eq!(percent.len(), 1);
        assert_eq!(percent[0].name, "50% off bundle");
        assert!(Product::search(&db.pool, &search("_")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reserve_stock_refuses_oversell() {
        let db = DBService::new_in_memory().await.unwrap();
        let p = Product::create(&db.pool, &sample("Case", "accessories", 999, 2), Uuid::new_v4())
            .await
            .unwrap();

        assert!(Product::reserve_stock(&db.pool, p.id, 2).await.unwrap());
        assert!(!Product::reserve_stock(&db.pool, p.id, 1).await.unwrap());

        Product::restore_stock(&db.pool, p.id, 1).await.unwrap();
        let p = Product::find_by_id(&db.pool, p.id).await.unwrap().unwrap();
        assert_eq!(p.stock, 1);
    }

    #[tokio::test]
    async fn update_applies_partial_changes() {
        let db = DBService::new_in_memory().await.unwrap();
        let p = Product::create(&db.pool, &sample("Case", "accessories", 999, 2), Uuid::new_v4())
            .await
            .unwrap();
        let merged = UpdateProduct {
            price_cents: Some(799),
            ..Default::default()
        }
        .apply_to(p.clone());
        let updated = Product::update(&db.pool, p.id, &merged).await.unwrap();
        assert_eq!(updated.price_cents, 799);
        assert_eq!(updated.name, "Case");
    }

    #[test]
    fn null_clears_optional_fields_and_absent_keeps_them() {
        let existing = Product {
            id: Uuid::new_v4(),
            name: "Case".to_string(),
            description: String::new(),
            category: "accessories".to_string(),
            brand: Some("Acme".to_string()),
            price_cents: 999,
            original_price_cents: Some(1_299),
            stock: 2,
            image_url: Some("https://cdn.example.com/case.png".to_string()),
            specs: BTreeMap::new(),
            rating: 4.0,
            is_featured: false,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        let update: UpdateProduct =
            serde_json::from_str(r#"{"brand": null, "imageUrl": null}"#).unwrap();
        let merged = update.apply_to(existing.clone());
        assert_eq!(merged.brand, None);
        assert_eq!(merged.image_url, None);
        assert_eq!(merged.original_price_cents, Some(1_299));

        let update: UpdateProduct = serde_json::from_str(r#"{"brand": "Zagg"}"#).unwrap();
        let merged = update.apply_to(existing);
        assert_eq!(merged.brand.as_deref(), Some("Zagg"));
        assert_eq!(merged.image_url.as_deref(), Some("https://cdn.example.com/case.png"));
    }
}
