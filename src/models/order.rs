use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::GeoPoint;

/// Closed set of package size classes. Ordering follows physical size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PackageSize {
    S,
    M,
    L,
    Xl,
}

impl PackageSize {
    /// Weight ceiling per size class, in kilograms.
    pub fn max_weight_kg(self) -> f64 {
        match self {
            PackageSize::S => 2.0,
            PackageSize::M => 5.0,
            PackageSize::L => 10.0,
            PackageSize::Xl => 20.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PackageSize::S => "S",
            PackageSize::M => "M",
            PackageSize::L => "L",
            PackageSize::Xl => "XL",
        }
    }
}

impl FromStr for PackageSize {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "S" => Ok(PackageSize::S),
            "M" => Ok(PackageSize::M),
            "L" => Ok(PackageSize::L),
            "XL" => Ok(PackageSize::Xl),
            other => Err(AppError::InvalidPackageSize(other.to_string())),
        }
    }
}

impl fmt::Display for PackageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One end of a delivery: where, plus anything the courier should know.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stop {
    pub address: String,
    pub coordinates: GeoPoint,
    #[serde(default)]
    pub instructions: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSpec {
    pub size: PackageSize,
    pub weight_kg: f64,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    SearchingCourier,
    Accepted,
    PickedUp,
    InTransit,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// The full transition table. Everything not listed here is rejected.
    pub fn allows(self, target: OrderStatus) -> bool {
        use OrderStatus::*;

        matches!(
            (self, target),
            (Pending, SearchingCourier)
                | (SearchingCourier, Accepted)
                | (Accepted, PickedUp)
                | (PickedUp, InTransit)
                | (InTransit, Delivered)
                | (Pending | SearchingCourier | Accepted, Cancelled)
        )
    }

    /// Position on the delivery progression. `Cancelled` has none.
    pub fn rank(self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::SearchingCourier => Some(1),
            OrderStatus::Accepted => Some(2),
            OrderStatus::PickedUp => Some(3),
            OrderStatus::InTransit => Some(4),
            OrderStatus::Delivered => Some(5),
            OrderStatus::Cancelled => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::SearchingCourier => "searching_courier",
            OrderStatus::Accepted => "accepted",
            OrderStatus::PickedUp => "picked_up",
            OrderStatus::InTransit => "in_transit",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    /// Set exactly once, on the accept transition. Never reassigned.
    pub courier_id: Option<Uuid>,
    pub pickup: Stop,
    pub dropoff: Stop,
    pub package: PackageSpec,
    pub status: OrderStatus,
    pub price: f64,
    pub distance_km: f64,
    pub estimated_minutes: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing filter; `active` covers every non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderFilter {
    #[default]
    All,
    Active,
    Delivered,
    Cancelled,
}

impl OrderFilter {
    pub fn matches(self, status: OrderStatus) -> bool {
        match self {
            OrderFilter::All => true,
            OrderFilter::Active => !status.is_terminal(),
            OrderFilter::Delivered => status == OrderStatus::Delivered,
            OrderFilter::Cancelled => status == OrderStatus::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{OrderFilter, OrderStatus, PackageSize};

    use OrderStatus::*;

    const ALL: [OrderStatus; 7] = [
        Pending,
        SearchingCourier,
        Accepted,
        PickedUp,
        InTransit,
        Delivered,
        Cancelled,
    ];

    #[test]
    fn delivery_path_is_strictly_ordered() {
        assert!(Pending.allows(SearchingCourier));
        assert!(SearchingCourier.allows(Accepted));
        assert!(Accepted.allows(PickedUp));
        assert!(PickedUp.allows(InTransit));
        assert!(InTransit.allows(Delivered));

        // No skipping ahead.
        assert!(!Pending.allows(Accepted));
        assert!(!SearchingCourier.allows(PickedUp));
        assert!(!Accepted.allows(Delivered));
        assert!(!PickedUp.allows(Delivered));
    }

    #[test]
    fn cancel_allowed_only_before_pickup() {
        assert!(Pending.allows(Cancelled));
        assert!(SearchingCourier.allows(Cancelled));
        assert!(Accepted.allows(Cancelled));

        assert!(!PickedUp.allows(Cancelled));
        assert!(!InTransit.allows(Cancelled));
        assert!(!Delivered.allows(Cancelled));
        assert!(!Cancelled.allows(Cancelled));
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        for target in ALL {
            assert!(!Delivered.allows(target));
            assert!(!Cancelled.allows(target));
        }
    }

    #[test]
    fn nothing_leads_back_to_pending() {
        for from in ALL {
            assert!(!from.allows(Pending));
        }
    }

    #[test]
    fn rank_is_monotone_along_the_delivery_path() {
        let path = [Pending, SearchingCourier, Accepted, PickedUp, InTransit, Delivered];
        for pair in path.windows(2) {
            assert!(pair[0].rank().unwrap() < pair[1].rank().unwrap());
        }
        assert_eq!(Cancelled.rank(), None);
    }

    #[test]
    fn active_filter_matches_exactly_the_non_terminal_states() {
        let active = [Pending, SearchingCourier, Accepted, PickedUp, InTransit];
        for status in ALL {
            assert_eq!(
                OrderFilter::Active.matches(status),
                active.contains(&status)
            );
        }
        assert!(OrderFilter::Delivered.matches(Delivered));
        assert!(!OrderFilter::Delivered.matches(Cancelled));
        assert!(OrderFilter::Cancelled.matches(Cancelled));
    }

    #[test]
    fn size_ordering_and_weight_ceilings_are_monotone() {
        let sizes = [PackageSize::S, PackageSize::M, PackageSize::L, PackageSize::Xl];
        for pair in sizes.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].max_weight_kg() < pair[1].max_weight_kg());
        }
    }

    #[test]
    fn size_parses_the_closed_set_only() {
        assert_eq!("XL".parse::<PackageSize>().unwrap(), PackageSize::Xl);
        assert!("XXL".parse::<PackageSize>().is_err());
        assert!("s".parse::<PackageSize>().is_err());
    }
}
