//! Vehicle and lease models.
//!
//! Both records are owned by the wider rental system; this crate only reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A rental vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Unique identifier for the vehicle.
    pub id: String,
    /// The vehicle's license plate.
    pub license_plate: String,
    /// When the vehicle record was created.
    pub created_at: DateTime<Utc>,
}

/// A rental agreement for one vehicle over a date interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    /// Unique identifier for the lease.
    pub id: String,
    /// The leased vehicle.
    pub vehicle_id: String,
    /// The customer holding the lease.
    pub customer_id: String,
    /// Start of the lease.
    pub start_date: DateTime<Utc>,
    /// End of the lease. `None` means the lease is still active.
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

impl Lease {
    /// Returns true if the lease has no end date yet.
    pub fn is_open(&self) -> bool {
        self.end_date.is_none()
    }
}
