// Time source for request and message stamps
//
// Stamps are fixed-width ISO-8601 UTC strings with millisecond precision
// (`2024-05-01T08:15:30.123Z`), so lexicographic order equals time order.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::sync::Arc;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock() = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// A single issued stamp: epoch millis for ids, ISO string for display/sort
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    pub epoch_millis: i64,
    pub iso: String,
}

/// Issues strictly increasing millisecond stamps from a [`Clock`].
///
/// Two calls within the same millisecond (or a clock that steps backwards)
/// get bumped forward by one millisecond, so ids built from the stamp never
/// collide within one store.
#[derive(Clone)]
pub struct StampIssuer {
    clock: Arc<dyn Clock>,
    last_millis: Arc<Mutex<Option<i64>>>,
}

impl StampIssuer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last_millis: Arc::new(Mutex::new(None)),
        }
    }

    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    pub fn next(&self) -> Stamp {
        let observed = self.clock.now().timestamp_millis();
        let mut last = self.last_millis.lock();
        let millis = match *last {
            Some(prev) if observed <= prev => prev + 1,
            _ => observed,
        };
        *last = Some(millis);

        Stamp {
            epoch_millis: millis,
            iso: format_millis(millis),
        }
    }
}

pub fn format_millis(epoch_millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(epoch_millis)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Sort key placing stamps in time order.
///
/// Stamps that parse rank by instant, whatever their offset; unparseable
/// ones rank below every parsed stamp. The raw text breaks ties, so the key
/// is a total order over arbitrary strings.
pub fn recency_key(stamp: &str) -> (Option<DateTime<Utc>>, String) {
    let instant = DateTime::parse_from_rfc3339(stamp)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc));
    (instant, stamp.to_string())
}

/// Newest-first comparison of two stamps, consistent with [`recency_key`]
pub fn newest_first(a: &str, b: &str) -> Ordering {
    recency_key(b).cmp(&recency_key(a))
}
