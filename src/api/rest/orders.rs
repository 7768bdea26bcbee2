use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::dispatch::{release_courier, try_accept};
use crate::engine::queue::{enqueue_job, DispatchJob};
use crate::error::AppError;
use crate::models::actor::{Actor, Role};
use crate::models::order::{Order, OrderFilter, OrderStatus, PackageSize, PackageSpec, Stop};
use crate::state::AppState;
use crate::store::NewOrder;
use crate::tracking::{self, TrackingView};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/status", post(change_status))
        .route("/orders/:id/tracking", get(track_order))
}

#[derive(Deserialize)]
pub struct PackageDraft {
    pub size: String,
    pub weight_kg: f64,
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,
    pub pickup: Stop,
    pub dropoff: Stop,
    pub package: PackageDraft,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    let size: PackageSize = payload.package.size.parse()?;

    let order = state.store.create(NewOrder {
        customer_id: payload.customer_id,
        pickup: payload.pickup,
        dropoff: payload.dropoff,
        package: PackageSpec {
            size,
            weight_kg: payload.package.weight_kg,
            description: payload.package.description,
        },
    })?;

    state.publish(&order);
    enqueue_job(&state, DispatchJob::new(&state, order.id)).await?;

    Ok(Json(order))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub customer_id: Option<Uuid>,
    pub courier_id: Option<Uuid>,
    #[serde(default)]
    pub filter: OrderFilter,
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<Order>> {
    Json(
        state
            .store
            .list(query.customer_id, query.courier_id, query.filter),
    )
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    state.store.get(id).map(Json)
}

#[derive(Deserialize)]
pub struct ChangeStatusRequest {
    pub status: OrderStatus,
    pub actor_id: Uuid,
    pub role: Role,
}

async fn change_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChangeStatusRequest>,
) -> Result<Json<Order>, AppError> {
    let actor = Actor {
        id: payload.actor_id,
        role: payload.role,
    };

    let order = match payload.status {
        // Accepting also claims the courier, so it goes through the same
        // path the dispatch engine uses.
        OrderStatus::Accepted => {
            if actor.role != Role::Courier {
                return Err(AppError::Unauthorized(
                    "only a courier may accept an order".to_string(),
                ));
            }
            try_accept(&state, id, actor.id)?
        }
        target => {
            let order = state.store.transition(id, target, &actor)?;
            state.publish(&order);
            release_courier(&state, &order);
            order
        }
    };

    Ok(Json(order))
}

async fn track_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TrackingView>, AppError> {
    let order = state.store.get(id)?;
    Ok(Json(tracking::project(&order)))
}
