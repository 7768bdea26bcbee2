use serde::Serialize;
use uuid::Uuid;

use crate::models::order::{Order, OrderStatus};

/// The delivery progression shown to customers, in order.
const PROGRESSION: [(OrderStatus, &str); 6] = [
    (OrderStatus::Pending, "Order Placed"),
    (OrderStatus::SearchingCourier, "Finding Courier"),
    (OrderStatus::Accepted, "Courier Assigned"),
    (OrderStatus::PickedUp, "Package Picked Up"),
    (OrderStatus::InTransit, "In Transit"),
    (OrderStatus::Delivered, "Delivered"),
];

#[derive(Debug, Clone, Serialize)]
pub struct Milestone {
    pub status: OrderStatus,
    pub label: &'static str,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackingView {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub courier_id: Option<Uuid>,
    pub estimated_minutes: u32,
    pub milestones: Vec<Milestone>,
}

/// Read-only projection of an order's progress; never mutates.
///
/// A milestone is completed when its rank is at or below the order's current
/// rank. Cancellation is off the ordering: a cancelled order reports the
/// ordered milestones as pending plus a completed terminal `Cancelled` one.
pub fn project(order: &Order) -> TrackingView {
    let reached = order.status.rank();

    let mut milestones: Vec<Milestone> = PROGRESSION
        .iter()
        .map(|&(status, label)| Milestone {
            status,
            label,
            completed: matches!(
                (reached, status.rank()),
                (Some(current), Some(milestone)) if milestone <= current
            ),
        })
        .collect();

    if order.status == OrderStatus::Cancelled {
        milestones.push(Milestone {
            status: OrderStatus::Cancelled,
            label: "Cancelled",
            completed: true,
        });
    }

    TrackingView {
        order_id: order.id,
        status: order.status,
        courier_id: order.courier_id,
        estimated_minutes: order.estimated_minutes,
        milestones,
    }
}
