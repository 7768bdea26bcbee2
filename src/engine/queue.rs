use tokio::time::Instant;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy)]
pub struct DispatchJob {
    pub order_id: Uuid,
    /// The search is abandoned once this passes.
    pub deadline: Instant,
}

impl DispatchJob {
    pub fn new(state: &AppState, order_id: Uuid) -> Self {
        Self {
            order_id,
            deadline: Instant::now() + state.dispatch.timeout,
        }
    }
}

pub async fn enqueue_job(state: &AppState, job: DispatchJob) -> Result<(), AppError> {
    state
        .dispatch_tx
        .send(job)
        .await
        .map_err(|err| AppError::Internal(format!("dispatch queue send failed: {err}")))?;

    state.metrics.orders_awaiting_dispatch.inc();
    Ok(())
}
