use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::order::PackageSize;
use crate::store::{Clock, IdSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    Foot,
    Bike,
    Car,
}

impl VehicleType {
    /// Largest package class the vehicle can carry, derived from the size
    /// weight ceilings (2/5/10/20 kg).
    pub fn max_package(self) -> PackageSize {
        match self {
            VehicleType::Foot => PackageSize::M,
            VehicleType::Bike => PackageSize::L,
            VehicleType::Car => PackageSize::Xl,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    pub id: Uuid,
    pub name: String,
    pub vehicle: VehicleType,
    pub location: GeoPoint,
    pub active: bool,
    pub rating: f64,
    /// The order this courier is currently out on, if any. A claimed courier
    /// is out of the matching pool until released.
    pub on_delivery: Option<Uuid>,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct CourierPool {
    couriers: DashMap<Uuid, Courier>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,
}

impl CourierPool {
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdSource>) -> Self {
        Self {
            couriers: DashMap::new(),
            clock,
            ids,
        }
    }

    pub fn register(
        &self,
        name: String,
        vehicle: VehicleType,
        location: GeoPoint,
        rating: f64,
    ) -> Courier {
        let now = self.clock.now();
        let courier = Courier {
            id: self.ids.next_id(),
            name,
            vehicle,
            location,
            active: true,
            rating: rating.clamp(0.0, 5.0),
            on_delivery: None,
            registered_at: now,
            updated_at: now,
        };

        self.couriers.insert(courier.id, courier.clone());
        courier
    }

    pub fn get(&self, id: Uuid) -> Result<Courier, AppError> {
        self.couriers
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(AppError::CourierNotFound(id))
    }

    pub fn snapshot(&self) -> Vec<Courier> {
        self.couriers
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn set_active(&self, id: Uuid, active: bool) -> Result<Courier, AppError> {
        let mut courier = self
            .couriers
            .get_mut(&id)
            .ok_or(AppError::CourierNotFound(id))?;

        courier.active = active;
        courier.updated_at = self.clock.now();

        Ok(courier.clone())
    }

    pub fn update_location(&self, id: Uuid, location: GeoPoint) -> Result<Courier, AppError> {
        let mut courier = self
            .couriers
            .get_mut(&id)
            .ok_or(AppError::CourierNotFound(id))?;

        courier.location = location;
        courier.updated_at = self.clock.now();

        Ok(courier.clone())
    }

    /// Reserves the courier for one order. The check and the claim happen
    /// under the exclusive entry guard, so a courier cannot be double-booked.
    pub fn claim(&self, id: Uuid, order_id: Uuid) -> Result<(), AppError> {
        let mut courier = self
            .couriers
            .get_mut(&id)
            .ok_or(AppError::CourierNotFound(id))?;

        if !courier.active || courier.on_delivery.is_some() {
            return Err(AppError::NoCourierAvailable);
        }

        courier.on_delivery = Some(order_id);
        courier.updated_at = self.clock.now();

        Ok(())
    }

    /// Returns the courier to the matching pool. Unknown ids are ignored.
    pub fn release(&self, id: Uuid) {
        if let Some(mut courier) = self.couriers.get_mut(&id) {
            courier.on_delivery = None;
            courier.updated_at = self.clock.now();
        }
    }

    pub fn len(&self) -> usize {
        self.couriers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.couriers.is_empty()
    }
}
