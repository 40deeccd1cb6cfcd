// Store module — durable key/value medium, reactive accessor, listeners

pub mod backend;
pub mod listeners;
pub mod local;

pub use backend::{MemoryStorage, SledStorage, StorageBackend, StorageError};
pub use listeners::{Listener, ListenerRegistry, Subscription};
pub use local::LocalStore;
