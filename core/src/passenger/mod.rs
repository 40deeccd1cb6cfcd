// Passenger store — trip pings mirrored into the driver request queue
//
// Every request lives in two persisted collections: the passenger's history
// and the drivers' request queue. Both are rewritten together on each
// mutation and kept consistent by `request_id`.

pub mod types;

use crate::buses::BusProvider;
use crate::clock::{recency_key, Clock, StampIssuer};
use crate::store::{LocalStore, StorageBackend, Subscription};
use crate::MyatriError;
use parking_lot::RwLock;
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use types::{BusSnapshot, DriverRequest, Occupancy, PassengerHistoryEntry, RequestStatus};

pub const HISTORY_KEY: &str = "myatri:passenger-history";
pub const DRIVER_REQUESTS_KEY: &str = "myatri:driver-requests";

#[derive(Clone)]
pub struct PassengerStore {
    local: LocalStore,
    stamps: StampIssuer,
    buses: Arc<RwLock<Vec<BusSnapshot>>>,
}

impl PassengerStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::from_parts(LocalStore::new("passenger", backend), StampIssuer::system())
    }

    pub fn with_clock(backend: Arc<dyn StorageBackend>, clock: Arc<dyn Clock>) -> Self {
        Self::from_parts(
            LocalStore::new("passenger", backend),
            StampIssuer::new(clock),
        )
    }

    /// Non-persistent store for hosts without a durable medium
    pub fn detached() -> Self {
        Self::from_parts(LocalStore::detached("passenger"), StampIssuer::system())
    }

    fn from_parts(local: LocalStore, stamps: StampIssuer) -> Self {
        Self {
            local,
            stamps,
            buses: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.local.subscribe(listener)
    }

    /// Passenger history, newest request first
    pub fn passenger_history(&self) -> Vec<PassengerHistoryEntry> {
        self.read_sorted(HISTORY_KEY)
    }

    /// Driver request queue, newest request first
    pub fn driver_requests(&self) -> Vec<DriverRequest> {
        self.read_sorted(DRIVER_REQUESTS_KEY)
    }

    /// Requests still waiting on a driver
    pub fn pending_requests(&self) -> Vec<DriverRequest> {
        self.driver_requests()
            .into_iter()
            .filter(|request| request.status == RequestStatus::Pending)
            .collect()
    }

    pub fn find_request(&self, request_id: &str) -> Option<DriverRequest> {
        self.driver_requests()
            .into_iter()
            .find(|request| request.request_id == request_id)
    }

    /// Ping the driver of `bus`: a new pending entry is prepended to both
    /// collections.
    pub fn record_request(&self, bus: &BusSnapshot) -> PassengerHistoryEntry {
        let stamp = self.stamps.next();
        let entry = PassengerHistoryEntry {
            bus: bus.clone(),
            request_id: format!("{}-{}", bus.id, stamp.epoch_millis),
            requested_at: stamp.iso,
            status: RequestStatus::Pending,
        };

        let mut history = self.passenger_history();
        history.insert(0, entry.clone());
        let mut requests = self.driver_requests();
        requests.insert(0, entry.clone());

        self.persist(&history, &requests);
        info!(request_id = %entry.request_id, route = %entry.bus.route, "Recorded passenger request");
        entry
    }

    /// Move the request `request_id` to `status` in both collections.
    ///
    /// Unknown ids leave both collections untouched. Backward transitions are
    /// ignored. Returns whether any entry changed.
    pub fn update_status(&self, request_id: &str, status: RequestStatus) -> bool {
        let history = self.passenger_history();
        let requests = self.driver_requests();

        let current = requests
            .iter()
            .chain(history.iter())
            .find(|entry| entry.request_id == request_id)
            .map(|entry| entry.status);
        let allowed = match current {
            Some(from) if !from.can_advance_to(status) => {
                warn!(request_id, %from, to = %status, "Ignoring backward status transition");
                false
            }
            Some(_) => true,
            None => false,
        };
        let changed = allowed && current != Some(status);

        let apply = |entries: Vec<PassengerHistoryEntry>| -> Vec<PassengerHistoryEntry> {
            entries
                .into_iter()
                .map(|mut entry| {
                    if allowed && entry.request_id == request_id {
                        entry.status = status;
                    }
                    entry
                })
                .collect()
        };

        self.persist(&apply(history), &apply(requests));
        debug!(request_id, %status, changed, "Updated request status");
        changed
    }

    /// Empty both collections. Irreversible.
    pub fn clear(&self) {
        self.persist(&[], &[]);
        info!("Cleared passenger history and driver requests");
    }

    /// Latest bus listing, as of the last refresh
    pub fn buses(&self) -> Vec<BusSnapshot> {
        self.buses.read().clone()
    }

    pub fn bus(&self, id: u32) -> Option<BusSnapshot> {
        self.buses.read().iter().find(|bus| bus.id == id).cloned()
    }

    /// Replace the bus listing from `provider` and notify listeners.
    ///
    /// A failed fetch keeps the previous listing and does not notify.
    pub async fn refresh_buses(&self, provider: &dyn BusProvider) -> Result<usize, MyatriError> {
        let buses = provider.list_buses().await.map_err(|e| {
            warn!(error = %e, "Bus listing fetch failed");
            e
        })?;
        let count = buses.len();
        *self.buses.write() = buses;
        self.local.notify();
        debug!(count, "Refreshed bus listing");
        Ok(count)
    }

    pub fn flush(&self) {
        self.local.flush();
    }

    fn read_sorted(&self, key: &str) -> Vec<PassengerHistoryEntry> {
        let mut entries: Vec<PassengerHistoryEntry> = self.local.read(key, Vec::new());
        entries.sort_by_cached_key(|entry| Reverse(recency_key(&entry.requested_at)));
        entries
    }

    fn persist(&self, history: &[PassengerHistoryEntry], requests: &[DriverRequest]) {
        let (history, requests) =
            match (serde_json::to_value(history), serde_json::to_value(requests)) {
                (Ok(history), Ok(requests)) => (history, requests),
                (Err(e), _) | (_, Err(e)) => {
                    warn!(error = %e, "Unable to serialize passenger collections");
                    return;
                }
            };
        self.local
            .write_all(&[(HISTORY_KEY, history), (DRIVER_REQUESTS_KEY, requests)]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buses::SimulatedBusProvider;
    use crate::clock::ManualClock;
    use crate::store::MemoryStorage;
    use chrono::{Duration, TimeZone, Utc};
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct LogSink(Arc<parking_lot::Mutex<Vec<u8>>>);

    struct LogWriter(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl<'a> MakeWriter<'a> for LogSink {
        type Writer = LogWriter;

        fn make_writer(&'a self) -> Self::Writer {
            LogWriter(Arc::clone(&self.0))
        }
    }

    impl io::Write for LogWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn ring_road() -> BusSnapshot {
        BusSnapshot {
            id: 7,
            route: "Ring Road".into(),
            number: "12".into(),
            eta: "4 min".into(),
            distance: "1.1 km".into(),
            occupancy: Occupancy::Low,
            seats: 18,
            driver_id: Some("drv-ram".into()),
            driver_name: Some("Ram Bahadur".into()),
            coordinates: [27.7172, 85.324],
        }
    }

    fn store_with_clock() -> (PassengerStore, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap());
        let store =
            PassengerStore::with_clock(Arc::new(MemoryStorage::new()), Arc::new(clock.clone()));
        (store, clock)
    }

    #[test]
    fn record_request_creates_pending_entry_in_both_collections() {
        let (store, _) = store_with_clock();
        let entry = store.record_request(&ring_road());

        assert_eq!(entry.status, RequestStatus::Pending);
        assert!(entry.request_id.starts_with("7-"));
        assert_eq!(entry.requested_at, "2024-05-01T08:00:00.000Z");
        assert_eq!(store.passenger_history(), vec![entry.clone()]);
        assert_eq!(store.driver_requests(), vec![entry]);
    }

    #[test]
    fn acknowledge_keeps_snapshot_fields() {
        let (store, _) = store_with_clock();
        let entry = store.record_request(&ring_road());

        assert!(store.update_status(&entry.request_id, RequestStatus::Acknowledged));

        let history = store.passenger_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, RequestStatus::Acknowledged);
        assert_eq!(history[0].bus.route, "Ring Road");
        assert_eq!(history[0].bus.number, "12");
        assert_eq!(
            store.find_request(&entry.request_id).map(|r| r.status),
            Some(RequestStatus::Acknowledged)
        );
    }

    #[test]
    fn history_is_newest_first() {
        let (store, clock) = store_with_clock();
        let first = store.record_request(&ring_road());
        clock.advance(Duration::minutes(5));
        let second = store.record_request(&ring_road());
        clock.advance(Duration::minutes(5));
        let third = store.record_request(&ring_road());

        let ids: Vec<String> = store
            .passenger_history()
            .into_iter()
            .map(|e| e.request_id)
            .collect();
        assert_eq!(ids, vec![third.request_id, second.request_id, first.request_id]);
    }

    #[test]
    fn same_millisecond_requests_get_distinct_ids() {
        let (store, _) = store_with_clock();
        let a = store.record_request(&ring_road());
        let b = store.record_request(&ring_road());
        assert_ne!(a.request_id, b.request_id);
        assert_eq!(store.driver_requests().len(), 2);
    }

    #[test]
    fn unknown_request_id_changes_nothing() {
        let (store, _) = store_with_clock();
        store.record_request(&ring_road());
        let before = store.driver_requests();

        assert!(!store.update_status("missing-1", RequestStatus::Completed));
        assert_eq!(store.driver_requests(), before);
        assert_eq!(store.passenger_history(), before);
    }

    #[test]
    fn backward_transition_is_ignored() {
        let (store, _) = store_with_clock();
        let entry = store.record_request(&ring_road());
        store.update_status(&entry.request_id, RequestStatus::Completed);

        assert!(!store.update_status(&entry.request_id, RequestStatus::Pending));
        assert_eq!(store.passenger_history()[0].status, RequestStatus::Completed);
        assert_eq!(store.driver_requests()[0].status, RequestStatus::Completed);
    }

    #[test]
    fn backward_transition_warns_once() {
        let (store, _) = store_with_clock();
        let entry = store.record_request(&ring_road());
        store.update_status(&entry.request_id, RequestStatus::Completed);

        let sink = LogSink::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(sink.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            store.update_status(&entry.request_id, RequestStatus::Acknowledged);
        });

        let output = String::from_utf8(sink.0.lock().clone()).unwrap();
        assert_eq!(
            output.matches("Ignoring backward status transition").count(),
            1
        );
    }

    #[test]
    fn history_with_mixed_stamp_formats_still_reads() {
        let storage = MemoryStorage::new();
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap();
        let entries: Vec<PassengerHistoryEntry> = (0..200)
            .map(|i| {
                let at = base + Duration::minutes(i * 7 % 180);
                let requested_at = match i % 3 {
                    0 => at
                        .with_timezone(&chrono::FixedOffset::east_opt(5 * 3600 + 45 * 60).unwrap())
                        .format("%Y-%m-%dT%H:%M:%S%.3f%:z")
                        .to_string(),
                    1 => format!("{}x", at.format("%Y-%m-%dT%H:%M:%S%.3fZ")),
                    _ => at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
                };
                PassengerHistoryEntry {
                    bus: ring_road(),
                    request_id: format!("7-{i}"),
                    requested_at,
                    status: RequestStatus::Pending,
                }
            })
            .collect();
        let raw = serde_json::to_string(&entries).unwrap();
        storage.put(HISTORY_KEY, &raw).unwrap();
        storage.put(DRIVER_REQUESTS_KEY, &raw).unwrap();

        let store = PassengerStore::new(Arc::new(storage));
        let history = store.passenger_history();

        assert_eq!(history.len(), 200);
        let keys: Vec<_> = history
            .iter()
            .map(|e| recency_key(&e.requested_at))
            .collect();
        assert!(keys.windows(2).all(|pair| pair[0] >= pair[1]));
        assert!(history[..133].iter().all(|e| !e.requested_at.ends_with('x')));

        let newest = store.record_request(&ring_road());
        assert_eq!(store.driver_requests().len(), 201);
        assert!(store.update_status(&newest.request_id, RequestStatus::Acknowledged));
    }

    #[test]
    fn pending_requests_filters_queue() {
        let (store, clock) = store_with_clock();
        let first = store.record_request(&ring_road());
        clock.advance(Duration::seconds(30));
        let second = store.record_request(&ring_road());
        store.update_status(&first.request_id, RequestStatus::Acknowledged);

        let pending = store.pending_requests();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].request_id, second.request_id);
    }

    #[test]
    fn clear_empties_both_collections() {
        let (store, _) = store_with_clock();
        store.record_request(&ring_road());
        store.clear();
        assert!(store.passenger_history().is_empty());
        assert!(store.driver_requests().is_empty());
    }

    #[test]
    fn each_mutation_notifies_once() {
        let (store, _) = store_with_clock();
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let subscription = store.subscribe(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let entry = store.record_request(&ring_road());
        store.update_status(&entry.request_id, RequestStatus::Acknowledged);
        store.clear();
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        subscription.unsubscribe();
        store.clear();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn detached_store_is_empty_and_silent() {
        let store = PassengerStore::detached();
        let entry = store.record_request(&ring_road());
        assert!(entry.request_id.starts_with("7-"));
        assert!(store.passenger_history().is_empty());
        assert!(!store.update_status(&entry.request_id, RequestStatus::Acknowledged));
        store.clear();
    }

    #[tokio::test]
    async fn refresh_buses_replaces_listing_and_notifies() {
        let (store, _) = store_with_clock();
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let _subscription = store.subscribe(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let provider = SimulatedBusProvider::new(std::time::Duration::ZERO);
        let count = store.refresh_buses(&provider).await.unwrap();

        assert_eq!(count, store.buses().len());
        assert_eq!(store.bus(1).map(|b| b.route), Some("Ring Road".to_string()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    struct OfflineProvider;

    #[async_trait::async_trait]
    impl BusProvider for OfflineProvider {
        async fn list_buses(&self) -> Result<Vec<BusSnapshot>, MyatriError> {
            Err(MyatriError::BusListing("network unreachable".into()))
        }
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_listing() {
        let (store, _) = store_with_clock();
        let provider = SimulatedBusProvider::new(std::time::Duration::ZERO);
        store.refresh_buses(&provider).await.unwrap();

        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let _subscription = store.subscribe(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let result = store.refresh_buses(&OfflineProvider).await;

        assert!(matches!(result, Err(MyatriError::BusListing(_))));
        assert_eq!(store.buses().len(), 4);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
