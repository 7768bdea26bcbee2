use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::RoutePlanner;
use crate::models::actor::{Actor, Role};
use crate::models::order::{Order, OrderFilter, OrderStatus, PackageSpec, Stop};
use crate::pricing::PriceSchedule;

/// Time source, injected so tests can pin the clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Order id source, injected alongside the clock.
pub trait IdSource: Send + Sync {
    fn next_id(&self) -> Uuid;
}

pub struct RandomIds;

impl IdSource for RandomIds {
    fn next_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}

pub struct NewOrder {
    pub customer_id: Uuid,
    pub pickup: Stop,
    pub dropoff: Stop,
    pub package: PackageSpec,
}

/// Owns the order collection. Every status mutation goes through
/// [`OrderStore::transition`]; there is no other write path.
pub struct OrderStore {
    orders: DashMap<Uuid, Order>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,
    router: Arc<dyn RoutePlanner>,
    pricing: PriceSchedule,
}

impl OrderStore {
    pub fn new(
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdSource>,
        router: Arc<dyn RoutePlanner>,
        pricing: PriceSchedule,
    ) -> Self {
        Self {
            orders: DashMap::new(),
            clock,
            ids,
            router,
            pricing,
        }
    }

    /// Validates the request, prices the route and inserts the order in
    /// `pending`. Nothing is stored when validation fails.
    pub fn create(&self, new: NewOrder) -> Result<Order, AppError> {
        if new.pickup.address.trim().is_empty() {
            return Err(AppError::Validation(
                "pickup address cannot be empty".to_string(),
            ));
        }
        if new.dropoff.address.trim().is_empty() {
            return Err(AppError::Validation(
                "dropoff address cannot be empty".to_string(),
            ));
        }
        if new.package.description.trim().is_empty() {
            return Err(AppError::Validation(
                "package description cannot be empty".to_string(),
            ));
        }
        if !(new.package.weight_kg > 0.0) {
            return Err(AppError::Validation(
                "package weight must be positive".to_string(),
            ));
        }
        if new.package.weight_kg > new.package.size.max_weight_kg() {
            return Err(AppError::Validation(format!(
                "{} kg exceeds the {} kg limit for size {}",
                new.package.weight_kg,
                new.package.size.max_weight_kg(),
                new.package.size
            )));
        }

        let route = self
            .router
            .estimate(&new.pickup.coordinates, &new.dropoff.coordinates);
        let price = self.pricing.quote(new.package.size, route.distance_km)?;
        let now = self.clock.now();

        let order = Order {
            id: self.ids.next_id(),
            customer_id: new.customer_id,
            courier_id: None,
            pickup: new.pickup,
            dropoff: new.dropoff,
            package: new.package,
            status: OrderStatus::Pending,
            price,
            distance_km: route.distance_km,
            estimated_minutes: route.duration_minutes,
            created_at: now,
            updated_at: now,
        };

        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    pub fn get(&self, id: Uuid) -> Result<Order, AppError> {
        self.orders
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(AppError::OrderNotFound(id))
    }

    /// Lists orders visible to the given parties, newest first.
    pub fn list(
        &self,
        customer_id: Option<Uuid>,
        courier_id: Option<Uuid>,
        filter: OrderFilter,
    ) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| {
                let order = entry.value();
                customer_id.is_none_or(|id| order.customer_id == id)
                    && courier_id.is_none_or(|id| order.courier_id == Some(id))
                    && filter.matches(order.status)
            })
            .map(|entry| entry.value().clone())
            .collect();

        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    /// Applies one edge of the status table on behalf of `actor`.
    ///
    /// The whole check-and-set runs under the exclusive entry guard, so two
    /// racing accepts cannot both win: the loser observes the advanced state
    /// and gets `InvalidTransition`.
    pub fn transition(
        &self,
        order_id: Uuid,
        target: OrderStatus,
        actor: &Actor,
    ) -> Result<Order, AppError> {
        let mut entry = self
            .orders
            .get_mut(&order_id)
            .ok_or(AppError::OrderNotFound(order_id))?;
        let order = entry.value_mut();

        if !order.status.allows(target) {
            return Err(AppError::InvalidTransition {
                from: order.status,
                to: target,
                role: actor.role,
            });
        }

        match target {
            OrderStatus::SearchingCourier => {
                if actor.role != Role::Operator {
                    return Err(AppError::Unauthorized(
                        "only the dispatcher may start a courier search".to_string(),
                    ));
                }
            }
            OrderStatus::Accepted => {
                if actor.role != Role::Courier {
                    return Err(AppError::Unauthorized(
                        "only a courier may accept an order".to_string(),
                    ));
                }
                if order.courier_id.is_some() {
                    return Err(AppError::InvalidTransition {
                        from: order.status,
                        to: target,
                        role: actor.role,
                    });
                }
                order.courier_id = Some(actor.id);
            }
            OrderStatus::PickedUp | OrderStatus::InTransit | OrderStatus::Delivered => {
                if actor.role != Role::Courier || order.courier_id != Some(actor.id) {
                    return Err(AppError::Unauthorized(
                        "only the assigned courier may advance this order".to_string(),
                    ));
                }
            }
            OrderStatus::Cancelled => {
                let owner = actor.role == Role::Customer && actor.id == order.customer_id;
                if !owner && actor.role != Role::Operator {
                    return Err(AppError::Unauthorized(
                        "only the owning customer or an operator may cancel".to_string(),
                    ));
                }
            }
            OrderStatus::Pending => unreachable!("no transition targets pending"),
        }

        order.status = target;

        // updated_at never moves backwards, even if the clock does.
        let now = self.clock.now();
        if now > order.updated_at {
            order.updated_at = now;
        }

        Ok(order.clone())
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use uuid::Uuid;

    use super::{Clock, IdSource, NewOrder, OrderStore};
    use crate::error::AppError;
    use crate::geo::{GeoPoint, RouteEstimate, RoutePlanner};
    use crate::models::actor::Actor;
    use crate::models::order::{OrderFilter, OrderStatus, PackageSize, PackageSpec, Stop};
    use crate::pricing::PriceSchedule;

    struct FixedClock(Mutex<DateTime<Utc>>);

    impl FixedClock {
        fn at(t: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self(Mutex::new(t)))
        }

        fn set(&self, t: DateTime<Utc>) {
            *self.0.lock().unwrap() = t;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    struct SeqIds(AtomicU64);

    impl IdSource for SeqIds {
        fn next_id(&self) -> Uuid {
            Uuid::from_u128(self.0.fetch_add(1, Ordering::Relaxed) as u128 + 1)
        }
    }

    /// Pins the route so prices are predictable in tests.
    struct FixedRoute;

    impl RoutePlanner for FixedRoute {
        fn estimate(&self, _from: &GeoPoint, _to: &GeoPoint) -> RouteEstimate {
            RouteEstimate {
                distance_km: 3.5,
                duration_minutes: 25,
            }
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn store_at(clock: Arc<FixedClock>) -> OrderStore {
        OrderStore::new(
            clock,
            Arc::new(SeqIds(AtomicU64::new(0))),
            Arc::new(FixedRoute),
            PriceSchedule::default(),
        )
    }

    fn store() -> OrderStore {
        store_at(FixedClock::at(t0()))
    }

    fn stop(address: &str) -> Stop {
        Stop {
            address: address.to_string(),
            coordinates: GeoPoint {
                lat: 40.7128,
                lng: -74.0060,
            },
            instructions: String::new(),
        }
    }

    fn new_order(customer: Uuid) -> NewOrder {
        NewOrder {
            customer_id: customer,
            pickup: stop("1 Main St"),
            dropoff: stop("99 Elm St"),
            package: PackageSpec {
                size: PackageSize::M,
                weight_kg: 2.0,
                description: "documents".to_string(),
            },
        }
    }

    fn customer() -> Uuid {
        Uuid::from_u128(0xC0FFEE)
    }

    fn courier() -> Uuid {
        Uuid::from_u128(0xBEEF)
    }

    #[test]
    fn create_prices_the_route_and_starts_pending() {
        let store = store();
        let order = store.create(new_order(customer())).unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.courier_id, None);
        assert_eq!(order.price, 22.75);
        assert_eq!(order.distance_km, 3.5);
        assert_eq!(order.estimated_minutes, 25);
        assert_eq!(order.created_at, order.updated_at);
    }

    #[test]
    fn create_rejects_blank_pickup_without_storing() {
        let store = store();
        let mut req = new_order(customer());
        req.pickup.address = "   ".to_string();

        assert!(matches!(store.create(req), Err(AppError::Validation(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn create_rejects_blank_description() {
        let store = store();
        let mut req = new_order(customer());
        req.package.description = String::new();

        assert!(matches!(store.create(req), Err(AppError::Validation(_))));
    }

    #[test]
    fn create_rejects_overweight_package() {
        let store = store();
        let mut req = new_order(customer());
        req.package.size = PackageSize::S;
        req.package.weight_kg = 3.0;

        assert!(matches!(store.create(req), Err(AppError::Validation(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn full_delivery_path_succeeds_in_order() {
        let store = store();
        let order = store.create(new_order(customer())).unwrap();
        let dispatcher = Actor::operator(Uuid::nil());
        let rider = Actor::courier(courier());

        store
            .transition(order.id, OrderStatus::SearchingCourier, &dispatcher)
            .unwrap();
        let accepted = store
            .transition(order.id, OrderStatus::Accepted, &rider)
            .unwrap();
        assert_eq!(accepted.courier_id, Some(courier()));

        store
            .transition(order.id, OrderStatus::PickedUp, &rider)
            .unwrap();
        store
            .transition(order.id, OrderStatus::InTransit, &rider)
            .unwrap();
        let delivered = store
            .transition(order.id, OrderStatus::Delivered, &rider)
            .unwrap();

        assert_eq!(delivered.status, OrderStatus::Delivered);
        assert_eq!(delivered.courier_id, Some(courier()));
    }

    #[test]
    fn delivered_is_unreachable_without_the_full_path() {
        let store = store();
        let order = store.create(new_order(customer())).unwrap();
        let dispatcher = Actor::operator(Uuid::nil());
        let rider = Actor::courier(courier());

        store
            .transition(order.id, OrderStatus::SearchingCourier, &dispatcher)
            .unwrap();
        store
            .transition(order.id, OrderStatus::Accepted, &rider)
            .unwrap();

        // Skipping pickup and transit is rejected.
        assert!(matches!(
            store.transition(order.id, OrderStatus::Delivered, &rider),
            Err(AppError::InvalidTransition { .. })
        ));
        assert!(matches!(
            store.transition(order.id, OrderStatus::InTransit, &rider),
            Err(AppError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn second_accept_loses_with_invalid_transition() {
        let store = store();
        let order = store.create(new_order(customer())).unwrap();
        store
            .transition(
                order.id,
                OrderStatus::SearchingCourier,
                &Actor::operator(Uuid::nil()),
            )
            .unwrap();

        let first = Actor::courier(Uuid::from_u128(1));
        let second = Actor::courier(Uuid::from_u128(2));

        store
            .transition(order.id, OrderStatus::Accepted, &first)
            .unwrap();
        assert!(matches!(
            store.transition(order.id, OrderStatus::Accepted, &second),
            Err(AppError::InvalidTransition { .. })
        ));
        assert_eq!(store.get(order.id).unwrap().courier_id, Some(first.id));
    }

    #[test]
    fn concurrent_accepts_have_exactly_one_winner() {
        let store = Arc::new(store());
        let order = store.create(new_order(customer())).unwrap();
        store
            .transition(
                order.id,
                OrderStatus::SearchingCourier,
                &Actor::operator(Uuid::nil()),
            )
            .unwrap();

        let outcomes: Vec<Result<_, _>> = std::thread::scope(|scope| {
            (1..=2u128)
                .map(|seed| {
                    let store = store.clone();
                    scope.spawn(move || {
                        store.transition(
                            order.id,
                            OrderStatus::Accepted,
                            &Actor::courier(Uuid::from_u128(seed)),
                        )
                    })
                })
                .collect::<Vec<_>>()
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        });

        let wins = outcomes.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(AppError::InvalidTransition { .. }))));

        let winner = store.get(order.id).unwrap().courier_id.unwrap();
        assert!(winner == Uuid::from_u128(1) || winner == Uuid::from_u128(2));
    }

    #[test]
    fn cancel_is_rejected_once_picked_up() {
        let store = store();
        let owner = customer();
        let order = store.create(new_order(owner)).unwrap();
        let rider = Actor::courier(courier());

        store
            .transition(
                order.id,
                OrderStatus::SearchingCourier,
                &Actor::operator(Uuid::nil()),
            )
            .unwrap();
        store
            .transition(order.id, OrderStatus::Accepted, &rider)
            .unwrap();
        store
            .transition(order.id, OrderStatus::PickedUp, &rider)
            .unwrap();

        assert!(matches!(
            store.transition(order.id, OrderStatus::Cancelled, &Actor::customer(owner)),
            Err(AppError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn only_the_owner_or_an_operator_may_cancel() {
        let store = store();
        let owner = customer();
        let order = store.create(new_order(owner)).unwrap();

        let stranger = Actor::customer(Uuid::from_u128(0xDEAD));
        assert!(matches!(
            store.transition(order.id, OrderStatus::Cancelled, &stranger),
            Err(AppError::Unauthorized(_))
        ));

        let cancelled = store
            .transition(order.id, OrderStatus::Cancelled, &Actor::customer(owner))
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
    }

    #[test]
    fn only_the_assigned_courier_may_advance() {
        let store = store();
        let order = store.create(new_order(customer())).unwrap();
        let rider = Actor::courier(courier());

        store
            .transition(
                order.id,
                OrderStatus::SearchingCourier,
                &Actor::operator(Uuid::nil()),
            )
            .unwrap();
        store
            .transition(order.id, OrderStatus::Accepted, &rider)
            .unwrap();

        let imposter = Actor::courier(Uuid::from_u128(0xBAD));
        assert!(matches!(
            store.transition(order.id, OrderStatus::PickedUp, &imposter),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            store.transition(order.id, OrderStatus::PickedUp, &Actor::customer(customer())),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn only_an_operator_may_start_the_search() {
        let store = store();
        let owner = customer();
        let order = store.create(new_order(owner)).unwrap();

        assert!(matches!(
            store.transition(
                order.id,
                OrderStatus::SearchingCourier,
                &Actor::customer(owner)
            ),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn failed_guard_leaves_the_order_untouched() {
        let store = store();
        let order = store.create(new_order(customer())).unwrap();

        let before = store.get(order.id).unwrap();
        let _ = store.transition(
            order.id,
            OrderStatus::SearchingCourier,
            &Actor::customer(customer()),
        );
        let after = store.get(order.id).unwrap();

        assert_eq!(after.status, before.status);
        assert_eq!(after.updated_at, before.updated_at);
    }

    #[test]
    fn updated_at_never_moves_backwards() {
        let clock = FixedClock::at(t0());
        let store = store_at(clock.clone());
        let order = store.create(new_order(customer())).unwrap();

        clock.set(t0() - Duration::minutes(5));
        let updated = store
            .transition(
                order.id,
                OrderStatus::SearchingCourier,
                &Actor::operator(Uuid::nil()),
            )
            .unwrap();

        assert_eq!(updated.updated_at, t0());

        clock.set(t0() + Duration::minutes(1));
        let accepted = store
            .transition(order.id, OrderStatus::Accepted, &Actor::courier(courier()))
            .unwrap();
        assert_eq!(accepted.updated_at, t0() + Duration::minutes(1));
    }

    #[test]
    fn list_filters_by_party_and_status() {
        let store = store();
        let alice = Uuid::from_u128(10);
        let bob = Uuid::from_u128(11);

        let first = store.create(new_order(alice)).unwrap();
        let second = store.create(new_order(alice)).unwrap();
        store.create(new_order(bob)).unwrap();

        store
            .transition(first.id, OrderStatus::Cancelled, &Actor::customer(alice))
            .unwrap();

        let all = store.list(Some(alice), None, OrderFilter::All);
        assert_eq!(all.len(), 2);

        let active = store.list(Some(alice), None, OrderFilter::Active);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, second.id);

        let cancelled = store.list(Some(alice), None, OrderFilter::Cancelled);
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].id, first.id);

        assert_eq!(store.list(None, None, OrderFilter::All).len(), 3);
        assert!(store
            .list(Some(alice), None, OrderFilter::Delivered)
            .is_empty());
    }

    #[test]
    fn list_by_courier_sees_assigned_orders_only() {
        let store = store();
        let order = store.create(new_order(customer())).unwrap();
        store.create(new_order(customer())).unwrap();

        store
            .transition(
                order.id,
                OrderStatus::SearchingCourier,
                &Actor::operator(Uuid::nil()),
            )
            .unwrap();
        store
            .transition(order.id, OrderStatus::Accepted, &Actor::courier(courier()))
            .unwrap();

        let mine = store.list(None, Some(courier()), OrderFilter::All);
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, order.id);
    }
}
