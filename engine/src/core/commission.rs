//! Commission calculation
//!
//! Commission depends only on the service type: portability and winback sales
//! earn the premium rate, everything else the base rate.

use serde::{Deserialize, Serialize};
use shared::{Cents, ServiceType};

/// Service types paid at the premium rate
pub const PREMIUM_SERVICE_TYPES: [ServiceType; 2] = [ServiceType::Portability, ServiceType::Winback];

/// Base/premium commission rates in cents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommissionSchedule {
    pub base_cents: Cents,
    pub premium_cents: Cents,
}

impl CommissionSchedule {
    pub const DEFAULT_BASE_CENTS: Cents = 10_000;
    pub const DEFAULT_PREMIUM_CENTS: Cents = 15_000;

    pub fn new(base_cents: Cents, premium_cents: Cents) -> Self {
        Self {
            base_cents,
            premium_cents,
        }
    }

    /// Commission earned for one installed client of `service_type`
    pub fn commission(&self, service_type: ServiceType) -> Cents {
        if is_premium(service_type) {
            self.premium_cents
        } else {
            self.base_cents
        }
    }

    /// Sum of commissions for a set of service types
    pub fn total<I>(&self, service_types: I) -> Cents
    where
        I: IntoIterator<Item = ServiceType>,
    {
        service_types.into_iter().map(|service_type| self.commission(service_type)).sum()
    }
}

impl Default for CommissionSchedule {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BASE_CENTS, Self::DEFAULT_PREMIUM_CENTS)
    }
}

pub fn is_premium(service_type: ServiceType) -> bool {
    PREMIUM_SERVICE_TYPES.contains(&service_type)
}

/// Commission at the default rates
pub fn commission(service_type: ServiceType) -> Cents {
    CommissionSchedule::default().commission(service_type)
}
