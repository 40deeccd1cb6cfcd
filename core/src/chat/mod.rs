// Chat store — per-driver message threads
//
// The whole thread map is persisted under one key. Messages are appended in
// call order and never re-sorted.

pub mod eligibility;
pub mod types;

use crate::clock::{Clock, StampIssuer};
use crate::store::{LocalStore, StorageBackend, Subscription};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

pub use eligibility::{conversation_for, eligible_drivers, prepare_draft, EligibleDriver};
pub use types::{ChatMessage, ChatSender, ChatThread, OutgoingMessage};

pub const CHAT_KEY: &str = "myatri:chat-threads";

type ThreadMap = BTreeMap<String, ChatThread>;

#[derive(Clone)]
pub struct ChatStore {
    local: LocalStore,
    stamps: StampIssuer,
}

impl ChatStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            local: LocalStore::new("chat", backend),
            stamps: StampIssuer::system(),
        }
    }

    pub fn with_clock(backend: Arc<dyn StorageBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            local: LocalStore::new("chat", backend),
            stamps: StampIssuer::new(clock),
        }
    }

    /// Non-persistent store for hosts without a durable medium
    pub fn detached() -> Self {
        Self {
            local: LocalStore::detached("chat"),
            stamps: StampIssuer::system(),
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.local.subscribe(listener)
    }

    /// All threads, ordered by driver id
    pub fn threads(&self) -> Vec<ChatThread> {
        self.read_threads().into_values().collect()
    }

    /// Thread for `driver_id`, if one has been started. Never creates one.
    pub fn thread(&self, driver_id: &str) -> Option<ChatThread> {
        self.read_threads().remove(driver_id)
    }

    /// Append a message to the driver's thread, creating the thread on first
    /// use. The thread's driver name follows the latest message.
    pub fn send_message(&self, outgoing: OutgoingMessage) -> ChatMessage {
        let stamp = self.stamps.next();
        let message = ChatMessage {
            id: format!("{}-{}", outgoing.driver_id, stamp.epoch_millis),
            driver_id: outgoing.driver_id,
            driver_name: outgoing.driver_name,
            sender: outgoing.sender,
            text: outgoing.text,
            timestamp: stamp.iso,
        };

        let mut threads = self.read_threads();
        let thread = threads
            .entry(message.driver_id.clone())
            .or_insert_with(|| ChatThread::empty(&message.driver_id, &message.driver_name));
        thread.driver_name = message.driver_name.clone();
        thread.messages.push(message.clone());
        let length = thread.messages.len();

        self.local.write(CHAT_KEY, &threads);
        debug!(
            driver_id = %message.driver_id,
            sender = %message.sender,
            length,
            "Appended chat message"
        );
        message
    }

    /// Drop every thread
    pub fn clear(&self) {
        self.local.remove(CHAT_KEY);
        info!("Cleared chat threads");
    }

    pub fn flush(&self) {
        self.local.flush();
    }

    fn read_threads(&self) -> ThreadMap {
        self.local.read(CHAT_KEY, ThreadMap::new())
    }
}
