use crate::error::AppError;
use crate::models::order::PackageSize;

/// Fixed price schedule: a base per size class, a linear per-kilometer rate
/// and a flat service fee. Base prices must stay monotone in size.
#[derive(Debug, Clone)]
pub struct PriceSchedule {
    base: [f64; 4],
    per_km: f64,
    service_fee: f64,
}

impl Default for PriceSchedule {
    fn default() -> Self {
        Self {
            base: [8.00, 12.00, 18.00, 25.00],
            per_km: 2.50,
            service_fee: 2.00,
        }
    }
}

impl PriceSchedule {
    pub fn base(&self, size: PackageSize) -> f64 {
        self.base[size as usize]
    }

    /// Deterministic quote in currency units, rounded half-up to cents.
    pub fn quote(&self, size: PackageSize, distance_km: f64) -> Result<f64, AppError> {
        if !distance_km.is_finite() || distance_km < 0.0 {
            return Err(AppError::InvalidDistance(distance_km));
        }

        let raw = self.base(size) + distance_km * self.per_km + self.service_fee;
        Ok(round_cents(raw))
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
