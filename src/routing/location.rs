//! Geographic locations and the shared travel time cache.

use std::sync::OnceLock;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_AVERAGE_SPEED_KMPH;
use crate::error::{PlanningError, Result};

/// Earth radius in meters for haversine calculation.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A geographic location.
///
/// Identity is the stable `index`; two locations with the same index are
/// equal regardless of coordinates.
///
/// # Examples
///
/// ```
/// use planning_core::routing::Location;
///
/// let philadelphia = Location::new(0, 39.9526, -75.1652);
/// let new_york = Location::new(1, 40.7128, -74.0060);
///
/// // Distance is approximately 130 km
/// let distance = philadelphia.distance_meters(&new_york);
/// assert!(distance > 120_000.0 && distance < 140_000.0);
///
/// // Travel time at 50 km/h is approximately 2.6 hours
/// let travel_secs = philadelphia.travel_time_seconds(&new_york, 50.0);
/// assert!(travel_secs > 8000 && travel_secs < 10000);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Location {
    /// Index in `VehicleRoutePlan::locations`.
    pub index: usize,
    pub latitude: f64,
    pub longitude: f64,
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for Location {}

impl std::hash::Hash for Location {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl Location {
    pub fn new(index: usize, latitude: f64, longitude: f64) -> Self {
        Self {
            index,
            latitude,
            longitude,
        }
    }

    /// Great-circle distance in meters (haversine).
    pub fn distance_meters(&self, other: &Location) -> f64 {
        haversine_meters(
            (self.latitude, self.longitude),
            (other.latitude, other.longitude),
        )
    }

    /// Travel time in whole seconds at the given average speed.
    pub fn travel_time_seconds(&self, other: &Location, average_speed_kmph: f64) -> i64 {
        seconds_at_speed(self.distance_meters(other), average_speed_kmph)
    }
}

fn haversine_meters(from: (f64, f64), to: (f64, f64)) -> f64 {
    if from == to {
        return 0.0;
    }

    let lat1 = from.0.to_radians();
    let lat2 = to.0.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (to.1 - from.1).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    EARTH_RADIUS_M * 2.0 * a.sqrt().asin()
}

fn seconds_at_speed(meters: f64, average_speed_kmph: f64) -> i64 {
    // seconds = meters / (km/h * 1000 / 3600) = meters * 3.6 / km/h
    (meters * 3.6 / average_speed_kmph).round() as i64
}

/// Memoized travel times between locations, keyed by `(from.index, to.index)`.
///
/// Cells fill lazily on first lookup and can be read from many threads
/// without locking. Share it between solution clones behind an `Arc`.
///
/// # Examples
///
/// ```
/// use planning_core::routing::{Location, TravelTimeCache};
///
/// let locations = vec![Location::new(0, 0.0, 0.0), Location::new(1, 0.0, 1.0)];
/// let cache = TravelTimeCache::new(&locations, 50.0).unwrap();
///
/// let first = cache.travel_time(&locations[0], &locations[1]);
/// assert_eq!(cache.travel_time(&locations[0], &locations[1]), first);
/// assert_eq!(cache.travel_time(&locations[1], &locations[1]), 0);
/// assert_eq!(cache.filled_count(), 2);
/// ```
#[derive(Debug)]
pub struct TravelTimeCache {
    coordinates: Vec<(f64, f64)>,
    average_speed_kmph: f64,
    cells: Vec<OnceLock<i64>>,
}

impl TravelTimeCache {
    /// Builds an empty cache over `locations`, whose indices must be `0..len`.
    pub fn new(locations: &[Location], average_speed_kmph: f64) -> Result<Self> {
        if !(average_speed_kmph.is_finite() && average_speed_kmph > 0.0) {
            return Err(PlanningError::InvalidProblem(format!(
                "average speed must be positive, got {}",
                average_speed_kmph
            )));
        }
        if let Some((pos, loc)) = locations.iter().enumerate().find(|(pos, loc)| loc.index != *pos) {
            return Err(PlanningError::InvalidProblem(format!(
                "location at position {} has index {}",
                pos, loc.index
            )));
        }

        let n = locations.len();
        Ok(Self {
            coordinates: locations.iter().map(|l| (l.latitude, l.longitude)).collect(),
            average_speed_kmph,
            cells: (0..n * n).map(|_| OnceLock::new()).collect(),
        })
    }

    /// Cache over no locations; every lookup is computed directly.
    pub fn empty(average_speed_kmph: f64) -> Self {
        Self {
            coordinates: Vec::new(),
            average_speed_kmph,
            cells: Vec::new(),
        }
    }

    /// Cache at the default average speed.
    pub fn with_default_speed(locations: &[Location]) -> Result<Self> {
        Self::new(locations, DEFAULT_AVERAGE_SPEED_KMPH)
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    pub fn average_speed_kmph(&self) -> f64 {
        self.average_speed_kmph
    }

    /// Travel time in seconds from one location to another.
    ///
    /// Locations outside the cache are computed directly and not stored.
    #[inline]
    pub fn travel_time(&self, from: &Location, to: &Location) -> i64 {
        let n = self.coordinates.len();
        if from.index < n && to.index < n {
            *self.cells[from.index * n + to.index].get_or_init(|| {
                self.compute(self.coordinates[from.index], self.coordinates[to.index])
            })
        } else {
            from.travel_time_seconds(to, self.average_speed_kmph)
        }
    }

    /// Fills every cell in parallel.
    pub fn warm(&self) {
        let n = self.coordinates.len();
        self.cells.par_iter().enumerate().for_each(|(cell, slot)| {
            slot.get_or_init(|| self.compute(self.coordinates[cell / n], self.coordinates[cell % n]));
        });
    }

    /// Number of cells computed so far.
    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|c| c.get().is_some()).count()
    }

    fn compute(&self, from: (f64, f64), to: (f64, f64)) -> i64 {
        seconds_at_speed(haversine_meters(from, to), self.average_speed_kmph)
    }
}
