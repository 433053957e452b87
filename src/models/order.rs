use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StoreId;

/// Status de um pedido. Valores que o backend devolve e que não conhecemos
/// caem em `Unknown` em vez de quebrar a desserialização da lista inteira.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Preparing,
    Completed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Unknown => "UNKNOWN",
        }
    }

    /// Label shown to customers and in the admin table.
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Preparing => "Sedang di Masak",
            OrderStatus::Completed => "Selesai",
            OrderStatus::Cancelled => "Dibatalkan",
            OrderStatus::Unknown => "Tidak diketahui",
        }
    }

    /// Statuses an admin may set. `Unknown` only ever comes from the backend.
    pub fn assignable() -> [OrderStatus; 3] {
        [OrderStatus::Preparing, OrderStatus::Completed, OrderStatus::Cancelled]
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PREPARING" => Some(OrderStatus::Preparing),
            "COMPLETED" => Some(OrderStatus::Completed),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, utoipa::ToSchema)]
pub struct Order {
    pub id: String,
    pub store_id: StoreId,
    /// Número exibido no painel (`F-xxxx<order_id>`).
    pub order_id: String,
    pub name: String,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, utoipa::ToSchema)]
pub struct CreateOrderRequest {
    pub order_id: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, utoipa::ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct OrdersResponse {
    pub success: bool,
    pub orders: Vec<Order>,
    pub count: usize,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct OrderResponse {
    pub success: bool,
    pub order: Order,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_status_does_not_fail_deserialization() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": "o-1",
            "store_id": "s-1",
            "order_id": "0042",
            "name": "Budi",
            "status": "QUEUED",
            "updated_at": "2024-05-01T10:00:00.123456+00:00"
        }))
        .unwrap();

        assert_eq!(order.status, OrderStatus::Unknown);
        assert_eq!(order.store_id.as_str(), "s-1");
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(OrderStatus::parse("completed"), Some(OrderStatus::Completed));
        assert_eq!(OrderStatus::parse(" PREPARING "), Some(OrderStatus::Preparing));
        assert_eq!(OrderStatus::parse("UNKNOWN"), None);
    }
}
