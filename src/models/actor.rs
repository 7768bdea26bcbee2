use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Courier,
    Operator,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Courier => "courier",
            Role::Operator => "operator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller identity for transitions and listings. Capability checks happen in
/// the store, not at call sites.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn customer(id: Uuid) -> Self {
        Self {
            id,
            role: Role::Customer,
        }
    }

    pub fn courier(id: Uuid) -> Self {
        Self {
            id,
            role: Role::Courier,
        }
    }

    pub fn operator(id: Uuid) -> Self {
        Self {
            id,
            role: Role::Operator,
        }
    }
}
