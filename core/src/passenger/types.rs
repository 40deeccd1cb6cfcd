// Bus snapshots and passenger request records
//
// Field names serialize in camelCase to stay readable by the browser client
// that writes the same keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Occupancy {
    Low,
    Medium,
    High,
}

impl fmt::Display for Occupancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Occupancy::Low => "low",
            Occupancy::Medium => "medium",
            Occupancy::High => "high",
        };
        f.write_str(label)
    }
}

/// Point-in-time description of a bus, as listed by the bus provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusSnapshot {
    pub id: u32,
    pub route: String,
    pub number: String,
    pub eta: String,
    pub distance: String,
    pub occupancy: Occupancy,
    pub seats: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_name: Option<String>,
    /// `[latitude, longitude]`
    pub coordinates: [f64; 2],
}

impl BusSnapshot {
    /// Driver id and name, when both are present and non-empty
    pub fn driver(&self) -> Option<(&str, &str)> {
        match (self.driver_id.as_deref(), self.driver_name.as_deref()) {
            (Some(id), Some(name)) if !id.is_empty() && !name.is_empty() => Some((id, name)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Acknowledged,
    Completed,
}

impl RequestStatus {
    /// Forward-only progression: `pending -> acknowledged -> completed`.
    /// Re-applying the current status is allowed and changes nothing.
    pub fn can_advance_to(self, next: RequestStatus) -> bool {
        next >= self
    }

    pub fn label(self) -> &'static str {
        match self {
            RequestStatus::Pending => "Awaiting driver",
            RequestStatus::Acknowledged => "Driver acknowledged",
            RequestStatus::Completed => "Trip completed",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Acknowledged => "acknowledged",
            RequestStatus::Completed => "completed",
        };
        f.write_str(tag)
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "acknowledged" => Ok(RequestStatus::Acknowledged),
            "completed" => Ok(RequestStatus::Completed),
            other => Err(format!("unknown request status: {other}")),
        }
    }
}

/// A passenger's ping to a bus driver. The driver queue holds the same record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengerHistoryEntry {
    #[serde(flatten)]
    pub bus: BusSnapshot,
    pub request_id: String,
    pub requested_at: String,
    pub status: RequestStatus,
}

/// Driver-facing view of a passenger request
pub type DriverRequest = PassengerHistoryEntry;
