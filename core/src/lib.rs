// Myatri Core — local stores for passenger pings, driver queues and chat
//
// Each store is a JSON collection over a durable key/value medium with a
// listener registry; consumers subscribe and re-read after every change.

pub mod buses;
pub mod chat;
pub mod clock;
pub mod passenger;
pub mod session;
pub mod store;

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

pub use buses::{BusProvider, SimulatedBusProvider};
pub use chat::{ChatMessage, ChatSender, ChatStore, ChatThread, EligibleDriver, OutgoingMessage};
pub use passenger::{
    BusSnapshot, DriverRequest, Occupancy, PassengerHistoryEntry, PassengerStore, RequestStatus,
};
pub use session::{AuthSession, AuthSessionUser, UserRole};
pub use store::{MemoryStorage, SledStorage, StorageBackend, StorageError, Subscription};

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Debug, Error, Clone)]
pub enum MyatriError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Bus listing unavailable: {0}")]
    BusListing(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

// ============================================================================
// CORE
// ============================================================================

/// All client stores over one shared medium.
///
/// Each store owns its own listeners, so a chat subscriber is not woken by
/// passenger pings and vice versa.
#[derive(Clone)]
pub struct MyatriCore {
    pub passengers: PassengerStore,
    pub chat: ChatStore,
    pub session: AuthSession,
}

impl MyatriCore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            passengers: PassengerStore::new(Arc::clone(&backend)),
            chat: ChatStore::new(Arc::clone(&backend)),
            session: AuthSession::new(backend),
        }
    }

    /// Durable stores in a sled database at `path`
    pub fn with_storage(path: impl AsRef<Path>) -> Result<Self, MyatriError> {
        let path = path.as_ref();
        let backend = SledStorage::open(path)?;
        info!(path = %path.display(), "Opened durable store");
        Ok(Self::new(Arc::new(backend)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Stores with no durable medium: every read is empty, every write dropped
    pub fn detached() -> Self {
        Self {
            passengers: PassengerStore::detached(),
            chat: ChatStore::detached(),
            session: AuthSession::detached(),
        }
    }

    /// Drivers the passenger may message, from the current history
    pub fn eligible_drivers(&self) -> Vec<EligibleDriver> {
        chat::eligible_drivers(&self.passengers.passenger_history())
    }

    /// Send `text` from the passenger to an eligible driver.
    ///
    /// Blank drafts and drivers outside the passenger's history are rejected.
    pub fn message_driver(&self, driver_id: &str, text: &str) -> Result<ChatMessage, MyatriError> {
        let draft = chat::prepare_draft(text)
            .ok_or_else(|| MyatriError::InvalidInput("message is empty".to_string()))?;
        let driver = self
            .eligible_drivers()
            .into_iter()
            .find(|driver| driver.driver_id == driver_id)
            .ok_or_else(|| {
                MyatriError::InvalidInput(format!("driver {driver_id} is not in your trip history"))
            })?;

        Ok(self.chat.send_message(OutgoingMessage {
            driver_id: driver.driver_id,
            driver_name: driver.driver_name,
            sender: ChatSender::Passenger,
            text: draft.to_string(),
        }))
    }

    pub fn flush(&self) {
        self.passengers.flush();
        self.chat.flush();
        self.session.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus_with_driver() -> BusSnapshot {
        buses::default_fleet().remove(0)
    }

    #[test]
    fn message_driver_requires_trip_history() {
        let core = MyatriCore::in_memory();
        let bus = bus_with_driver();
        let driver_id = bus.driver_id.clone().unwrap();

        assert!(matches!(
            core.message_driver(&driver_id, "hello"),
            Err(MyatriError::InvalidInput(_))
        ));

        core.passengers.record_request(&bus);
        let message = core.message_driver(&driver_id, "  hello  ").unwrap();
        assert_eq!(message.text, "hello");
        assert_eq!(message.sender, ChatSender::Passenger);
        assert_eq!(core.chat.thread(&driver_id).unwrap().messages.len(), 1);
    }

    #[test]
    fn message_driver_rejects_blank_text() {
        let core = MyatriCore::in_memory();
        let bus = bus_with_driver();
        core.passengers.record_request(&bus);
        let driver_id = bus.driver_id.unwrap();

        assert!(core.message_driver(&driver_id, "   ").is_err());
        assert!(core.chat.thread(&driver_id).is_none());
    }

    #[test]
    fn stores_keep_separate_listeners() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let core = MyatriCore::in_memory();
        let chat_hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&chat_hits);
        let _sub = core.chat.subscribe(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        core.passengers.record_request(&bus_with_driver());
        assert_eq!(chat_hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn detached_core_reads_empty() {
        let core = MyatriCore::detached();
        core.passengers.record_request(&bus_with_driver());
        assert!(core.eligible_drivers().is_empty());
        assert!(core.chat.threads().is_empty());
        assert!(core.session.user().is_none());
    }
}
