use crate::{
    entities::order::{self, Entity as OrderEntity, OrderStatus},
    entities::order_item::{self, Entity as OrderItemEntity},
    errors::ServiceError,
    services::cart::{text_field, CartService, ProductRef},
    services::pricing::{format_money, parse_price_str, to_money},
    session::Session,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// Checkout form contents.
#[derive(Debug, Clone, Default, Validate)]
#[validate(schema(function = "require_contact"))]
pub struct OrderSubmission {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub phone: String,
    pub email: String,
    pub comment: String,
}

impl OrderSubmission {
    pub fn from_payload(payload: &Map<String, Value>) -> Self {
        Self {
            name: text_field(payload.get("name")),
            phone: text_field(payload.get("phone")),
            email: text_field(payload.get("email")),
            comment: text_field(payload.get("comment")),
        }
    }
}

fn require_contact(submission: &OrderSubmission) -> Result<(), ValidationError> {
    if submission.phone.is_empty() && submission.email.is_empty() {
        let mut err = ValidationError::new("contact_required");
        err.message = Some("Phone or email is required".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemView {
    pub id: i32,
    pub product_id: Option<i32>,
    pub product_title: String,
    pub product_sku: String,
    pub quantity: i32,
    #[schema(example = "1234.50")]
    pub price: String,
    #[schema(example = "3703.50")]
    pub line_total: String,
}

impl From<&order_item::Model> for OrderItemView {
    fn from(item: &order_item::Model) -> Self {
        let price = to_money(item.price);
        Self {
            id: item.id,
            product_id: item.product_id,
            product_title: item.product_title.clone(),
            product_sku: item.product_sku.clone(),
            quantity: item.quantity,
            price: format_money(price),
            line_total: format_money(price * Decimal::from(item.quantity)),
        }
    }
}

/// Order as shown in the operator listing; totals are computed from items.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderSummary {
    pub id: i32,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub status: OrderStatus,
    pub comment: String,
    pub item_count: usize,
    #[schema(example = "3703.50")]
    pub total: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: OrderSummary,
    pub items: Vec<OrderItemView>,
}

fn order_total(items: &[order_item::Model]) -> Decimal {
    items
        .iter()
        .map(|item| to_money(item.price) * Decimal::from(item.quantity))
        .sum()
}

fn summarize(order: order::Model, items: &[order_item::Model]) -> OrderSummary {
    OrderSummary {
        id: order.id,
        customer_name: order.customer_name,
        customer_email: order.customer_email,
        customer_phone: order.customer_phone,
        status: order.status,
        comment: order.comment,
        item_count: items.len(),
        total: format_money(order_total(items)),
        created_at: order.created_at,
        updated_at: order.updated_at,
    }
}

/// Turns session carts into orders and serves them back to operators.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    cart: CartService,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, cart: CartService) -> Self {
        Self { db, cart }
    }

    /// Places an order for everything in the session's cart.
    ///
    /// The order and all of its items are written in one transaction. The
    /// cart is emptied only after the commit succeeds; on any failure it is
    /// left untouched and no order row exists.
    ///
    /// # Errors
    ///
    /// * `ServiceError::ValidationError` - missing name or contact, or an empty cart
    /// * `ServiceError::DatabaseError` - the transaction failed
    #[instrument(skip(self, session, submission), fields(session_id = %session.id()))]
    pub async fn place_order(
        &self,
        session: &mut Session,
        submission: OrderSubmission,
    ) -> Result<order::Model, ServiceError> {
        submission.validate()?;

        let cart = self.cart.summary(session);
        if cart.is_empty() {
            return Err(ServiceError::validation("Cart is empty"));
        }

        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let order = order::ActiveModel {
            customer_name: Set(submission.name),
            customer_email: Set(submission.email),
            customer_phone: Set(submission.phone),
            status: Set(OrderStatus::New),
            comment: Set(submission.comment),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for item in &cart.items {
            let title = if item.title.is_empty() {
                match &item.product_id {
                    ProductRef::Id(id) => format!("Product {id}"),
                    ProductRef::Key(key) => format!("Product {key}"),
                }
            } else {
                item.title.clone()
            };
            let quantity = i32::try_from(item.quantity)
                .map_err(|_| ServiceError::validation("Quantity is out of range"))?;

            order_item::ActiveModel {
                order_id: Set(order.id),
                product_id: Set(None),
                product_title: Set(title),
                product_sku: Set(item.sku.clone()),
                quantity: Set(quantity),
                price: Set(parse_price_str(&item.price)),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = order.id, "Failed to commit order creation transaction");
            ServiceError::DatabaseError(e)
        })?;

        self.cart.clear(session)?;

        info!(
            order_id = order.id,
            items = cart.items.len(),
            total = %cart.total_amount,
            "Order placed"
        );
        Ok(order)
    }

    /// Lists orders newest first, optionally filtered by status.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderSummary>, ServiceError> {
        let mut query = OrderEntity::find();
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status));
        }
        let orders = query
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .all(&*self.db)
            .await?;

        let ids: Vec<i32> = orders.iter().map(|o| o.id).collect();
        let mut items_by_order: HashMap<i32, Vec<order_item::Model>> = HashMap::new();
        if !ids.is_empty() {
            for item in OrderItemEntity::find()
                .filter(order_item::Column::OrderId.is_in(ids))
                .all(&*self.db)
                .await?
            {
                items_by_order.entry(item.order_id).or_default().push(item);
            }
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let items = items_by_order.remove(&order.id).unwrap_or_default();
                summarize(order, &items)
            })
            .collect())
    }

    /// # Errors
    ///
    /// * `ServiceError::NotFound` - no order with this id
    #[instrument(skip(self))]
    pub async fn get_order(&self, id: i32) -> Result<OrderDetail, ServiceError> {
        let order = self.find_order(id).await?;
        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(id))
            .order_by_asc(order_item::Column::Id)
            .all(&*self.db)
            .await?;

        Ok(OrderDetail {
            items: items.iter().map(OrderItemView::from).collect(),
            order: summarize(order, &items),
        })
    }

    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: i32,
        status: OrderStatus,
    ) -> Result<OrderDetail, ServiceError> {
        let order = self.find_order(id).await?;
        let previous = order.status;

        let mut active: order::ActiveModel = order.into();
        active.status = Set(status);
        active.update(&*self.db).await?;

        info!(order_id = id, from = %previous, to = %status, "Order status changed");
        self.get_order(id).await
    }

    async fn find_order(&self, id: i32) -> Result<order::Model, ServiceError> {
        OrderEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Order {id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(order_id: i32, price: Decimal, quantity: i32) -> order_item::Model {
        order_item::Model {
            id: 1,
            order_id,
            product_id: None,
            product_title: "Wire".into(),
            product_sku: "W".into(),
            quantity,
            price,
        }
    }

    #[test]
    fn totals_are_summed_from_line_totals() {
        let items = vec![item(1, dec!(1234.50), 3), item(1, dec!(0.25), 2)];
        assert_eq!(order_total(&items), dec!(3704.00));
        assert_eq!(order_total(&[]), Decimal::ZERO);
    }

    #[test]
    fn item_view_formats_money() {
        let view = OrderItemView::from(&item(1, dec!(10.5), 2));
        assert_eq!(view.price, "10.50");
        assert_eq!(view.line_total, "21.00");
    }

    #[test]
    fn submission_requires_name_and_contact() {
        let mut payload = Map::new();
        payload.insert("name".into(), Value::from("  Bob "));
        let submission = OrderSubmission::from_payload(&payload);
        assert_eq!(submission.name, "Bob");
        assert!(submission.validate().is_err());

        payload.insert("email".into(), Value::from("bob@example.com"));
        assert!(OrderSubmission::from_payload(&payload).validate().is_ok());
    }
}
