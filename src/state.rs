use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use crate::config::Config;
use crate::engine::queue::DispatchJob;
use crate::geo::HaversineRouter;
use crate::models::courier::CourierPool;
use crate::models::event::OrderEvent;
use crate::models::order::Order;
use crate::observability::metrics::Metrics;
use crate::pricing::PriceSchedule;
use crate::store::{Clock, IdSource, OrderStore, RandomIds, SystemClock};

#[derive(Debug, Clone, Copy)]
pub struct DispatchSettings {
    /// Delay before a search with no eligible courier is retried.
    pub retry: Duration,
    /// Total time budget for one order's courier search.
    pub timeout: Duration,
}

pub struct AppState {
    pub store: OrderStore,
    pub couriers: CourierPool,
    pub dispatch_tx: mpsc::Sender<DispatchJob>,
    pub order_events_tx: broadcast::Sender<OrderEvent>,
    pub metrics: Metrics,
    pub dispatch: DispatchSettings,
}

impl AppState {
    pub fn new(config: &Config) -> (Self, mpsc::Receiver<DispatchJob>) {
        let (dispatch_tx, dispatch_rx) = mpsc::channel(config.dispatch_queue_size);
        let (order_events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let ids: Arc<dyn IdSource> = Arc::new(RandomIds);

        (
            Self {
                store: OrderStore::new(
                    clock.clone(),
                    ids.clone(),
                    Arc::new(HaversineRouter),
                    PriceSchedule::default(),
                ),
                couriers: CourierPool::new(clock, ids),
                dispatch_tx,
                order_events_tx,
                metrics: Metrics::new(),
                dispatch: DispatchSettings {
                    retry: Duration::from_millis(config.dispatch_retry_ms),
                    timeout: Duration::from_millis(config.dispatch_timeout_ms),
                },
            },
            dispatch_rx,
        )
    }

    /// Records the status change and fans it out to tracking subscribers.
    pub fn publish(&self, order: &Order) {
        self.metrics
            .order_transitions_total
            .with_label_values(&[order.status.as_str()])
            .inc();
        let _ = self.order_events_tx.send(OrderEvent::from_order(order));
    }
}
