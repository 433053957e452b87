use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;

use crate::database::Supabase;
use crate::models::{Order, OrderStatus, Session, StoreId};
use crate::utils::AppError;

/// Acesso aos pedidos no backend.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Public read used by the display. An empty store is `Ok(vec![])`.
    async fn get_orders(&self, store_id: &StoreId) -> Result<Vec<Order>, AppError>;

    async fn create_order(
        &self,
        session: &Session,
        store_id: &StoreId,
        order_id: &str,
        name: &str,
    ) -> Result<Order, AppError>;

    /// With `store_id` set, an order of another store counts as not found.
    async fn update_order_status(
        &self,
        session: &Session,
        store_id: Option<&StoreId>,
        id: &str,
        status: OrderStatus,
    ) -> Result<Order, AppError>;
}

/// Validates the admin form before anything goes over the wire.
pub fn validate_new_order(order_id: &str, name: &str) -> Result<(String, String), AppError> {
    let order_id = order_id.trim();
    let name = name.trim();

    if order_id.is_empty() {
        return Err(AppError::InvalidRequest("order_id must not be empty".into()));
    }
    if name.is_empty() {
        return Err(AppError::InvalidRequest("name must not be empty".into()));
    }

    Ok((order_id.to_string(), name.to_string()))
}

pub fn validate_status(status: OrderStatus) -> Result<OrderStatus, AppError> {
    match status {
        OrderStatus::Unknown => Err(AppError::InvalidRequest("status UNKNOWN cannot be assigned".into())),
        other => Ok(other),
    }
}

#[async_trait]
impl OrderRepository for Supabase {
    async fn get_orders(&self, store_id: &StoreId) -> Result<Vec<Order>, AppError> {
        let request = self
            .rest(Method::GET, "orders", None)
            .query(&[
                ("select", "*".to_string()),
                ("store_id", format!("eq.{}", store_id)),
                ("order", "updated_at.desc".to_string()),
            ]);

        let orders: Vec<Order> = Supabase::send_json(request).await?;
        log::debug!("📦 Fetched {} orders for store {}", orders.len(), store_id);
        Ok(orders)
    }

    async fn create_order(
        &self,
        session: &Session,
        store_id: &StoreId,
        order_id: &str,
        name: &str,
    ) -> Result<Order, AppError> {
        let (order_id, name) = validate_new_order(order_id, name)?;
        let now = Utc::now();

        let request = self
            .rest(Method::POST, "orders", Some(session.access_token.as_str()))
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({
                "store_id": store_id,
                "order_id": order_id,
                "name": name,
                "status": OrderStatus::Preparing,
                "updated_at": now,
            }));

        let mut created: Vec<Order> = Supabase::send_json(request).await?;
        created
            .pop()
            .ok_or_else(|| AppError::Backend { status: 200, message: "Insert returned no row".into() })
    }

    async fn update_order_status(
        &self,
        session: &Session,
        store_id: Option<&StoreId>,
        id: &str,
        status: OrderStatus,
    ) -> Result<Order, AppError> {
        let status = validate_status(status)?;

        let mut filters = vec![("id", format!("eq.{}", id))];
        if let Some(store_id) = store_id {
            filters.push(("store_id", format!("eq.{}", store_id)));
        }

        let request = self
            .rest(Method::PATCH, "orders", Some(session.access_token.as_str()))
            .query(&filters)
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({
                "status": status,
                "updated_at": Utc::now(),
            }));

        let mut updated: Vec<Order> = Supabase::send_json(request).await?;
        updated
            .pop()
            .ok_or_else(|| AppError::NotFound(format!("Order {} not found", id)))
    }
}
