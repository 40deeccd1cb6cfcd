// Bus listing collaborator
//
// The real listing comes from an external service; the simulated provider
// stands in for it with a fixed fleet and a fixed network delay.

use crate::passenger::types::{BusSnapshot, Occupancy};
use crate::MyatriError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Default delay of the simulated listing fetch
pub const SIMULATED_FETCH_DELAY: Duration = Duration::from_millis(500);

/// Source of the live bus listing. An unreachable or failing service is
/// reported as [`MyatriError::BusListing`].
#[async_trait]
pub trait BusProvider: Send + Sync {
    async fn list_buses(&self) -> Result<Vec<BusSnapshot>, MyatriError>;
}

/// Fixed fleet served after a fixed delay. No retry, no backoff.
#[derive(Debug, Clone)]
pub struct SimulatedBusProvider {
    delay: Duration,
    fleet: Vec<BusSnapshot>,
}

impl SimulatedBusProvider {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            fleet: default_fleet(),
        }
    }

    pub fn with_fleet(delay: Duration, fleet: Vec<BusSnapshot>) -> Self {
        Self { delay, fleet }
    }
}

impl Default for SimulatedBusProvider {
    fn default() -> Self {
        Self::new(SIMULATED_FETCH_DELAY)
    }
}

#[async_trait]
impl BusProvider for SimulatedBusProvider {
    async fn list_buses(&self) -> Result<Vec<BusSnapshot>, MyatriError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        debug!(count = self.fleet.len(), "Served simulated bus listing");
        Ok(self.fleet.clone())
    }
}

#[allow(clippy::too_many_arguments)]
fn bus(
    id: u32,
    route: &str,
    number: &str,
    eta: &str,
    distance: &str,
    occupancy: Occupancy,
    seats: u32,
    driver: Option<(&str, &str)>,
    coordinates: [f64; 2],
) -> BusSnapshot {
    BusSnapshot {
        id,
        route: route.to_string(),
        number: number.to_string(),
        eta: eta.to_string(),
        distance: distance.to_string(),
        occupancy,
        seats,
        driver_id: driver.map(|(id, _)| id.to_string()),
        driver_name: driver.map(|(_, name)| name.to_string()),
        coordinates,
    }
}

pub fn default_fleet() -> Vec<BusSnapshot> {
    vec![
        bus(
            1,
            "Ring Road",
            "12",
            "3 min",
            "0.8 km",
            Occupancy::Medium,
            14,
            Some(("drv-ram", "Ram Bahadur")),
            [27.7172, 85.3240],
        ),
        bus(
            2,
            "Lagankhel - Ratnapark",
            "5",
            "7 min",
            "2.1 km",
            Occupancy::High,
            3,
            Some(("drv-sita", "Sita Gurung")),
            [27.6674, 85.3206],
        ),
        bus(
            3,
            "Kalanki - Koteshwor",
            "21",
            "11 min",
            "3.4 km",
            Occupancy::Low,
            26,
            Some(("drv-hari", "Hari Thapa")),
            [27.6933, 85.2814],
        ),
        bus(
            4,
            "Balaju - Bhaktapur",
            "8",
            "15 min",
            "5.0 km",
            Occupancy::Medium,
            11,
            None,
            [27.7350, 85.3020],
        ),
    ]
}
