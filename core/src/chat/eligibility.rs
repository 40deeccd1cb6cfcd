// Chat eligibility — which drivers the passenger may message
//
// Derived on every read from the current passenger history and chat threads;
// nothing here is persisted.

use crate::chat::types::ChatThread;
use crate::passenger::PassengerHistoryEntry;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleDriver {
    pub driver_id: String,
    pub driver_name: String,
    pub bus_number: String,
}

/// Drivers seen in `history` with a non-empty id and name.
///
/// Each driver appears once, described by its first entry in `history`
/// (the newest one when history is read newest-first).
pub fn eligible_drivers(history: &[PassengerHistoryEntry]) -> Vec<EligibleDriver> {
    let mut seen = HashSet::new();
    history
        .iter()
        .filter_map(|entry| {
            let (driver_id, driver_name) = entry.bus.driver()?;
            seen.insert(driver_id.to_string()).then(|| EligibleDriver {
                driver_id: driver_id.to_string(),
                driver_name: driver_name.to_string(),
                bus_number: entry.bus.number.clone(),
            })
        })
        .collect()
}

/// The stored thread for `driver`, or an empty one if none exists yet
pub fn conversation_for(driver: &EligibleDriver, threads: &[ChatThread]) -> ChatThread {
    threads
        .iter()
        .find(|thread| thread.driver_id == driver.driver_id)
        .cloned()
        .unwrap_or_else(|| ChatThread::empty(&driver.driver_id, &driver.driver_name))
}

/// Trimmed draft, or `None` when there is nothing to send
pub fn prepare_draft(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
