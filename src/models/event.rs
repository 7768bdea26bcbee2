use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::order::{Order, OrderStatus};

/// Broadcast on every lifecycle change; feeds the live tracking stream.
#[derive(Debug, Clone, Serialize)]
pub struct OrderEvent {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub courier_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
}

impl OrderEvent {
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id,
            status: order.status,
            courier_id: order.courier_id,
            occurred_at: order.updated_at,
        }
    }
}
