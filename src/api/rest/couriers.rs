use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::courier::{Courier, VehicleType};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers", post(register_courier).get(list_couriers))
        .route("/couriers/:id/active", patch(update_active))
        .route("/couriers/:id/location", patch(update_location))
}

#[derive(Deserialize)]
pub struct RegisterCourierRequest {
    pub name: String,
    pub vehicle: VehicleType,
    pub location: GeoPoint,
    pub rating: f64,
}

#[derive(Deserialize)]
pub struct UpdateActiveRequest {
    pub active: bool,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

async fn register_courier(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterCourierRequest>,
) -> Result<Json<Courier>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }

    let courier = state.couriers.register(
        payload.name,
        payload.vehicle,
        payload.location,
        payload.rating,
    );

    Ok(Json(courier))
}

async fn list_couriers(State(state): State<Arc<AppState>>) -> Json<Vec<Courier>> {
    Json(state.couriers.snapshot())
}

async fn update_active(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateActiveRequest>,
) -> Result<Json<Courier>, AppError> {
    state.couriers.set_active(id, payload.active).map(Json)
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Courier>, AppError> {
    state
        .couriers
        .update_location(id, payload.location)
        .map(Json)
}
