use crate::geo::haversine_km;
use crate::models::courier::{Courier, CourierPool};
use crate::models::order::Order;

/// A courier is eligible when they are taking work, not already out on a
/// delivery, and their vehicle can carry the package class.
pub fn eligible(courier: &Courier, order: &Order) -> bool {
    courier.active
        && courier.on_delivery.is_none()
        && order.package.size <= courier.vehicle.max_package()
}

/// Deterministic matching policy: nearest eligible courier to the pickup,
/// ties broken by higher rating, then by earliest registration.
pub fn select_courier(pool: &CourierPool, order: &Order) -> Option<Courier> {
    pool.snapshot()
        .into_iter()
        .filter(|courier| eligible(courier, order))
        .map(|courier| {
            let distance = haversine_km(&courier.location, &order.pickup.coordinates);
            (distance, courier)
        })
        .min_by(|(da, a), (db, b)| {
            da.total_cmp(db)
                .then_with(|| b.rating.total_cmp(&a.rating))
                .then_with(|| a.registered_at.cmp(&b.registered_at))
        })
        .map(|(_, courier)| courier)
}
