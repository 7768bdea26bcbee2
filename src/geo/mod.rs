use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Average door-to-door courier speed used for duration estimates.
const AVG_SPEED_KMH: f64 = 20.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RouteEstimate {
    pub distance_km: f64,
    pub duration_minutes: u32,
}

/// Routing is an external collaborator; the order store only depends on this
/// contract (non-negative distance, non-negative duration).
pub trait RoutePlanner: Send + Sync {
    fn estimate(&self, from: &GeoPoint, to: &GeoPoint) -> RouteEstimate;
}

/// Great-circle estimator used when no real routing engine is wired in.
pub struct HaversineRouter;

impl RoutePlanner for HaversineRouter {
    fn estimate(&self, from: &GeoPoint, to: &GeoPoint) -> RouteEstimate {
        let distance_km = haversine_km(from, to);
        let duration_minutes = (distance_km / AVG_SPEED_KMH * 60.0).ceil() as u32;

        RouteEstimate {
            distance_km,
            duration_minutes,
        }
    }
}

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}
