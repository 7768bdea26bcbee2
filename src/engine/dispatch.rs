use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::queue::{enqueue_job, DispatchJob};
use crate::engine::selection::select_courier;
use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatchOutcome {
    Matched,
    Requeued,
    /// The order was advanced (or cancelled) by someone else first.
    Superseded,
    NoCourier,
}

impl DispatchOutcome {
    fn as_str(self) -> &'static str {
        match self {
            DispatchOutcome::Matched => "matched",
            DispatchOutcome::Requeued => "requeued",
            DispatchOutcome::Superseded => "superseded",
            DispatchOutcome::NoCourier => "no_courier",
        }
    }
}

pub async fn run_dispatch_engine(state: Arc<AppState>, mut job_rx: mpsc::Receiver<DispatchJob>) {
    info!("dispatch engine started");

    while let Some(job) = job_rx.recv().await {
        state.metrics.orders_awaiting_dispatch.dec();

        let start = Instant::now();
        match process_job(&state, job).await {
            Ok(outcome) => {
                let elapsed = start.elapsed().as_secs_f64();
                state
                    .metrics
                    .dispatch_latency_seconds
                    .with_label_values(&[outcome.as_str()])
                    .observe(elapsed);
                state
                    .metrics
                    .dispatches_total
                    .with_label_values(&[outcome.as_str()])
                    .inc();
            }
            Err(err) => {
                let elapsed = start.elapsed().as_secs_f64();
                state
                    .metrics
                    .dispatch_latency_seconds
                    .with_label_values(&["error"])
                    .observe(elapsed);
                state
                    .metrics
                    .dispatches_total
                    .with_label_values(&["error"])
                    .inc();
                error!(order_id = %job.order_id, error = %err, "failed to dispatch order");
            }
        }
    }

    warn!("dispatch engine stopped: queue channel closed");
}

async fn process_job(state: &Arc<AppState>, job: DispatchJob) -> Result<DispatchOutcome, AppError> {
    let order = state.store.get(job.order_id)?;

    // The engine drives the search with operator authority.
    let order = match order.status {
        OrderStatus::Pending => {
            let updated = state.store.transition(
                order.id,
                OrderStatus::SearchingCourier,
                &Actor::operator(Uuid::nil()),
            )?;
            state.publish(&updated);
            updated
        }
        OrderStatus::SearchingCourier => order,
        _ => return Ok(DispatchOutcome::Superseded),
    };

    let Some(courier) = select_courier(&state.couriers, &order) else {
        if tokio::time::Instant::now() >= job.deadline {
            warn!(order_id = %order.id, "courier search timed out");
            return Ok(DispatchOutcome::NoCourier);
        }

        // Retry later without stalling the queue behind this order.
        let retry = state.dispatch.retry;
        let state = state.clone();
        tokio::spawn(async move {
            sleep(retry).await;
            if let Err(err) = enqueue_job(&state, job).await {
                error!(order_id = %job.order_id, error = %err, "failed to re-queue order");
            }
        });

        return Ok(DispatchOutcome::Requeued);
    };

    match try_accept(state, order.id, courier.id) {
        Ok(accepted) => {
            info!(
                order_id = %accepted.id,
                courier_id = %courier.id,
                distance_km = accepted.distance_km,
                "courier matched"
            );
            Ok(DispatchOutcome::Matched)
        }
        Err(AppError::InvalidTransition { .. }) => Ok(DispatchOutcome::Superseded),
        Err(err) => Err(err),
    }
}

/// Claims the courier, then takes the accept edge. The claim is rolled back
/// if the order was advanced in between, so a losing accept never strands a
/// courier outside the pool.
pub fn try_accept(state: &AppState, order_id: Uuid, courier_id: Uuid) -> Result<Order, AppError> {
    state.couriers.claim(courier_id, order_id)?;

    match state
        .store
        .transition(order_id, OrderStatus::Accepted, &Actor::courier(courier_id))
    {
        Ok(order) => {
            state.metrics.active_deliveries.inc();
            state.publish(&order);
            Ok(order)
        }
        Err(err) => {
            state.couriers.release(courier_id);
            Err(err)
        }
    }
}

/// Returns the courier to the pool once their order leaves the active set.
pub fn release_courier(state: &AppState, order: &Order) {
    if !order.status.is_terminal() {
        return;
    }

    if let Some(courier_id) = order.courier_id {
        state.couriers.release(courier_id);
        state.metrics.active_deliveries.dec();
    }
}
