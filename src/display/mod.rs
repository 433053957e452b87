//! Lógica do painel público: separa os pedidos por status, ordena e calcula
//! se os dados estão velhos.

pub mod render;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Order, OrderStatus, StoreId};
use crate::utils::{time, QuerySnapshot};

/// Orders split into the two columns of the display.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Partition {
    pub preparing: Vec<Order>,
    pub completed: Vec<Order>,
    /// Pedidos com outro status (cancelado, desconhecido): não aparecem no painel.
    pub hidden_count: usize,
}

/// Splits orders by status and sorts each group by `updated_at`, most recent
/// first. The sort is stable, so equal timestamps keep their input order.
pub fn partition_orders(orders: Vec<Order>) -> Partition {
    let mut partition = Partition::default();

    for order in orders {
        match order.status {
            OrderStatus::Preparing => partition.preparing.push(order),
            OrderStatus::Completed => partition.completed.push(order),
            OrderStatus::Cancelled | OrderStatus::Unknown => partition.hidden_count += 1,
        }
    }

    partition.preparing.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    partition.completed.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    partition
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Staleness {
    pub seconds_since_update: Option<i64>,
    pub is_stale: bool,
}

/// Stale iff more than `threshold_secs` whole seconds passed since the last
/// successful fetch. Never fetched counts as stale.
pub fn staleness(now: DateTime<Utc>, updated_at: Option<DateTime<Utc>>, threshold_secs: i64) -> Staleness {
    match updated_at {
        Some(updated) => {
            let elapsed = time::elapsed_secs(now, updated);
            Staleness {
                seconds_since_update: Some(elapsed),
                is_stale: elapsed > threshold_secs,
            }
        }
        None => Staleness { seconds_since_update: None, is_stale: true },
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct DisplayBoard {
    pub store_id: StoreId,
    pub preparing: Vec<Order>,
    pub completed: Vec<Order>,
    pub hidden_count: usize,
    pub data_updated_at: Option<DateTime<Utc>>,
    pub seconds_since_update: Option<i64>,
    pub is_stale: bool,
    /// Threshold used for `is_stale`; the page re-derives the flag with it
    /// between pushes.
    pub stale_after_secs: i64,
    /// Mensagem da última falha de busca, se a mais recente falhou.
    pub last_error: Option<String>,
}

impl DisplayBoard {
    pub fn build(
        store_id: StoreId,
        snapshot: &QuerySnapshot<Vec<Order>>,
        now: DateTime<Utc>,
        stale_after_secs: i64,
    ) -> Self {
        let Partition { preparing, completed, hidden_count } = partition_orders(snapshot.data.clone());
        let Staleness { seconds_since_update, is_stale } =
            staleness(now, snapshot.data_updated_at, stale_after_secs);

        Self {
            store_id,
            preparing,
            completed,
            hidden_count,
            data_updated_at: snapshot.data_updated_at,
            seconds_since_update,
            is_stale,
            stale_after_secs,
            last_error: snapshot.error.as_ref().map(|e| e.to_string()),
        }
    }
}
