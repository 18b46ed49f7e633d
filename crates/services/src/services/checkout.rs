//! Turning a cart into an order and moving orders through their lifecycle.

use db::models::{
    order::{NewOrder, Order, OrderItem, OrderStatus, PaymentMethod, ShippingAddress},
    product::Product,
    user::{Role, User},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

const MAX_LINE_QUANTITY: i64 = 99;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("cart is empty")]
    EmptyCart,
    #[error("quantity for product {0} must be between 1 and {max}", max = MAX_LINE_QUANTITY)]
    InvalidQuantity(Uuid),
    #[error("shipping address is incomplete: {0} is required")]
    IncompleteAddress(&'static str),
    #[error("product {0} not found")]
    ProductNotFound(Uuid),
    #[error("not enough stock for {name}: {available} left")]
    InsufficientStock { name: String, available: i64 },
    #[error("order not found")]
    OrderNotFound,
    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("order can no longer be cancelled")]
    NotCancellable,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    pub items: Vec<CartLine>,
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

/// Merge duplicate product lines, keeping the first-seen order.
fn merge_lines(lines: &[CartLine]) -> Result<Vec<CartLine>, CheckoutError> {
    let mut merged: Vec<CartLine> = Vec::with_capacity(lines.len());
    for line in lines {
        let invalid = CheckoutError::InvalidQuantity(line.product_id);
        if !(1..=MAX_LINE_QUANTITY).contains(&line.quantity) {
            return Err(invalid);
        }
        match merged.iter_mut().find(|l| l.product_id == line.product_id) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(line.quantity)
                    .filter(|total| *total <= MAX_LINE_QUANTITY)
                    .ok_or(invalid)?;
            }
            None => merged.push(line.clone()),
        }
    }
    Ok(merged)
}

fn validate_address(address: &ShippingAddress) -> Result<(), CheckoutError> {
    let required = [
        ("fullName", &address.full_name),
        ("line1", &address.line1),
        ("city", &address.city),
        ("country", &address.country),
    ];
    match required.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((field, _)) => Err(CheckoutError::IncompleteAddress(*field)),
        None => Ok(()),
    }
}

pub struct CheckoutService;

impl CheckoutService {
    /// Price the cart from the catalog, reserve stock and store the order,
    /// all inside one transaction.
    pub async fn place_order(
        pool: &SqlitePool,
        customer_id: Uuid,
        request: &PlaceOrder,
    ) -> Result<Order, CheckoutError> {
        if request.items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let lines = merge_lines(&request.items)?;
        validate_address(&request.shipping_address)?;

        let mut tx = pool.begin().await?;
        let mut items = Vec::with_capacity(lines.len());

        for line in &lines {
            let product = Product::find_by_id(&mut *tx, line.product_id)
                .await?
                .ok_or(CheckoutError::ProductNotFound(line.product_id))?;

            if !Product::reserve_stock(&mut *tx, product.id, line.quantity).await? {
                return Err(CheckoutError::InsufficientStock {
                    name: product.name,
                    available: product.stock,
                });
            }

            items.push(OrderItem {
                product_id: product.id,
                name: product.name,
                unit_price_cents: product.price_cents,
                quantity: line.quantity,
            });
        }

        let new_order = NewOrder {
            customer_id,
            items,
            shipping_address: request.shipping_address.clone(),
            payment_method: request.payment_method,
        };
        let order = Order::create(&mut *tx, &new_order, Uuid::new_v4()).await?;
        tx.commit().await?;

        info!(
            order_id = %order.id,
            customer_id = %customer_id,
            total_cents = order.total_cents,
            "Order placed"
        );
        Ok(order)
    }

    /// Move an order to `target`. Cancelling puts the reserved units back in stock.
    pub async fn update_status(
        pool: &SqlitePool,
        order_id: Uuid,
        target: OrderStatus,
    ) -> Result<Order, CheckoutError> {
        let mut tx = pool.begin().await?;
        let order = Order::find_by_id(&mut *tx, order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound)?;

        if !order.status.can_transition_to(target) {
            return Err(CheckoutError::InvalidTransition {
                from: order.status,
                to: target,
            });
        }

        if target == OrderStatus::Cancelled {
            for item in &order.items {
                Product::restore_stock(&mut *tx, item.product_id, item.quantity).await?;
            }
        }

        let updated = Order::transition_status(&mut *tx, order_id, order.status, target)
            .await?
            .ok_or(CheckoutError::InvalidTransition {
                from: order.status,
                to: target,
            })?;
        tx.commit().await?;

        info!(order_id = %order_id, from = %order.status, to = %target, "Order status changed");
        Ok(updated)
    }

    /// Customers may cancel their own pending orders; admins may cancel any
    /// order that has not shipped yet.
    pub async fn cancel(
        pool: &SqlitePool,
        actor: &User,
        order: &Order,
    ) -> Result<Order, CheckoutError> {
        let allowed = match actor.role {
            Role::Admin => order.status.can_transition_to(OrderStatus::Cancelled),
            _ => order.customer_id == actor.id && order.status == OrderStatus::Pending,
        };
        if !allowed {
            return Err(CheckoutError::NotCancellable);
        }
        Self::update_status(pool, order.id, OrderStatus::Cancelled).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use db::{
        DBService,
        models::{
            product::CreateProduct,
            user::IdentityProfile,
        },
    };

    use super::*;

    async fn customer(db: &DBService, role: Role) -> User {
        User::upsert_from_identity(
            &db.pool,
            &IdentityProfile {
                id: Uuid::new_v4(),
                email: format!("{}@example.com", Uuid::new_v4()),
                full_name: Some("Buyer".to_string()),
                avatar_url: None,
            },
            role,
        )
        .await
        .unwrap()
    }

    async fn product(db: &DBService, name: &str, price_cents: i64, stock: i64) -> Product {
        Product::create(
            &db.pool,
            &CreateProduct {
                name: name.to_string(),
                description: String::new(),
                category: "accessories".to_string(),
                brand: None,
                price_cents,
                original_price_cents: None,
                stock,
                image_url: None,
                specs: BTreeMap::new(),
                rating: 0.0,
                is_featured: false,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Buyer".to_string(),
            line1: "2 Main St".to_string(),
            city: "Springfield".to_string(),
            postal_code: "12345".to_string(),
            country: "US".to_string(),
            ..Default::default()
        }
    }

    fn request(lines: Vec<(Uuid, i64)>) -> PlaceOrder {
        PlaceOrder {
            items: lines
                .into_iter()
                .map(|(product_id, quantity)| CartLine { product_id, quantity })
                .collect(),
            shipping_address: address(),
            payment_method: PaymentMethod::CashOnDelivery,
        }
    }

    #[tokio::test]
    async fn prices_from_catalog_and_merges_duplicates() {
        let db = DBService::new_in_memory().await.unwrap();
        let buyer = customer(&db, Role::Customer).await;
        let cable = product(&db, "Cable", 1_000, 10).await;
        let case = product(&db, "Case", 2_500, 5).await;

        let order = CheckoutService::place_order(
            &db.pool,
            buyer.id,
            &request(vec![(cable.id, 1), (case.id, 1), (cable.id, 2)]),
        )
        .await
        .unwrap();

        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[0].quantity, 3);
        assert_eq!(order.total_cents, 3 * 1_000 + 2_500);
        let cable = Product::find_by_id(&db.pool, cable.id).await.unwrap().unwrap();
        assert_eq!(cable.stock, 7);
    }

    #[tokio::test]
    async fn insufficient_stock_rolls_back_everything() {
        let db = DBService::new_in_memory().await.unwrap();
        let buyer = customer(&db, Role::Customer).await;
        let cable = product(&db, "Cable", 1_000, 10).await;
        let phone = product(&db, "Phone", 50_000, 1).await;

        let err = CheckoutService::place_order(
            &db.pool,
            buyer.id,
            &request(vec![(cable.id, 2), (phone.id, 2)]),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CheckoutError::InsufficientStock { available: 1, .. }));

        let cable = Product::find_by_id(&db.pool, cable.id).await.unwrap().unwrap();
        assert_eq!(cable.stock, 10);
        assert!(Order::find_all(&db.pool, None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_bad_carts() {
        let db = DBService::new_in_memory().await.unwrap();
        let buyer = customer(&db, Role::Customer).await;
        let cable = product(&db, "Cable", 1_000, 10).await;

        let empty = CheckoutService::place_order(&db.pool, buyer.id, &request(vec![])).await;
        assert!(matches!(empty, Err(CheckoutError::EmptyCart)));

        let zero = CheckoutService::place_order(&db.pool, buyer.id, &request(vec![(cable.id, 0)]))
            .await;
        assert!(matches!(zero, Err(CheckoutError::InvalidQuantity(_))));

        let unknown_id = Uuid::new_v4();
        let unknown =
            CheckoutService::place_order(&db.pool, buyer.id, &request(vec![(unknown_id, 1)]))
                .await;
        assert!(matches!(unknown, Err(CheckoutError::ProductNotFound(id)) if id == unknown_id));

        let mut no_city = request(vec![(cable.id, 1)]);
        no_city.shipping_address.city = " ".to_string();
        let err = CheckoutService::place_order(&db.pool, buyer.id, &no_city).await;
        assert!(matches!(err, Err(CheckoutError::IncompleteAddress("city"))));
    }

    #[tokio::test]
    async fn cancel_restores_stock_and_respects_roles() {
        let db = DBService::new_in_memory().await.unwrap();
        let buyer = customer(&db, Role::Customer).await;
        let admin = customer(&db, Role::Admin).await;
        let cable = product(&db, "Cable", 1_000, 10).await;

        let order = CheckoutService::place_order(&db.pool, buyer.id, &request(vec![(cable.id, 4)]))
            .await
            .unwrap();
        let processing =
            CheckoutService::update_status(&db.pool, order.id, OrderStatus::Processing)
                .await
                .unwrap();

        let err = CheckoutService::cancel(&db.pool, &buyer, &processing).await;
        assert!(matches!(err, Err(CheckoutError::NotCancellable)));

        let cancelled = CheckoutService::cancel(&db.pool, &admin, &processing)
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        let cable = Product::find_by_id(&db.pool, cable.id).await.unwrap().unwrap();
        assert_eq!(cable.stock, 10);

        let err = CheckoutService::update_status(&db.pool, order.id, OrderStatus::Shipped).await;
        assert!(matches!(err, Err(CheckoutError::InvalidTransition { .. })));
    }

    #[test]
    fn merged_quantities_never_overflow() {
        let id = Uuid::new_v4();
        let line = |quantity| CartLine {
            product_id: id,
            quantity,
        };

        assert!(matches!(
            merge_lines(&[line(i64::MAX), line(1)]),
            Err(CheckoutError::InvalidQuantity(p)) if p == id
        ));
        assert!(matches!(
            merge_lines(&[line(60), line(40)]),
            Err(CheckoutError::InvalidQuantity(_))
        ));
        let merged = merge_lines(&[line(60), line(39)]).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].quantity, MAX_LINE_QUANTITY);
    }
}
