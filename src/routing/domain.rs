//! Domain model for vehicle routing.
//!
//! # Overview
//!
//! - Customer [`Visit`]s with time windows, demand and service duration
//! - [`Vehicle`]s with capacity, a home location and an ordered route
//! - [`VehicleRoutePlan`] owning all of them plus the shared travel time cache
//!
//! Route lists are planning variables. Links, vehicle back-references,
//! arrival times and per-vehicle aggregates are shadow fields: they are
//! readable everywhere but written only by the routing module's propagation
//! code, in response to moves or to [`VehicleRoutePlan::finalize`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{NaiveDateTime, TimeDelta};
use tracing::info;

use super::location::{Location, TravelTimeCache};
use crate::config::DEFAULT_AVERAGE_SPEED_KMPH;
use crate::error::{PlanningError, Result};
use crate::score::HardSoftScore;

/// A customer visit with time window and demand.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use planning_core::routing::{Location, Visit};
///
/// let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
/// let visit = Visit::new("1", "Restaurant A", Location::new(0, 39.95, -75.17))
///     .with_demand(8)
///     .with_time_window(day.and_hms_opt(6, 0, 0).unwrap(), day.and_hms_opt(10, 0, 0).unwrap())
///     .with_service_duration(300);
///
/// assert_eq!(visit.demand, 8);
/// assert!(!visit.is_assigned());
/// assert_eq!(visit.departure_time(), None);
/// ```
#[derive(Clone, Debug)]
pub struct Visit {
    pub id: String,
    pub name: String,
    pub location: Location,
    pub demand: i32,
    /// Earliest service start; the vehicle may wait.
    pub min_start_time: NaiveDateTime,
    /// Service must finish by this time.
    pub max_end_time: NaiveDateTime,
    /// Service duration in seconds.
    pub service_duration: i64,

    // =========================================================================
    // Shadow fields
    // =========================================================================
    pub(super) vehicle_idx: Option<usize>,
    pub(super) previous_visit_idx: Option<usize>,
    pub(super) next_visit_idx: Option<usize>,
    pub(super) arrival_time: Option<NaiveDateTime>,
}

impl Visit {
    /// Creates an unassigned visit with demand 1, no service time and an
    /// unbounded time window.
    pub fn new(id: impl Into<String>, name: impl Into<String>, location: Location) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location,
            demand: 1,
            min_start_time: NaiveDateTime::MIN,
            max_end_time: NaiveDateTime::MAX,
            service_duration: 0,
            vehicle_idx: None,
            previous_visit_idx: None,
            next_visit_idx: None,
            arrival_time: None,
        }
    }

    pub fn with_demand(mut self, demand: i32) -> Self {
        self.demand = demand;
        self
    }

    pub fn with_time_window(mut self, min_start: NaiveDateTime, max_end: NaiveDateTime) -> Self {
        self.min_start_time = min_start;
        self.max_end_time = max_end;
        self
    }

    /// Sets the service duration in seconds.
    pub fn with_service_duration(mut self, seconds: i64) -> Self {
        self.service_duration = seconds;
        self
    }

    #[inline]
    pub fn vehicle_idx(&self) -> Option<usize> {
        self.vehicle_idx
    }

    #[inline]
    pub fn previous_visit_idx(&self) -> Option<usize> {
        self.previous_visit_idx
    }

    #[inline]
    pub fn next_visit_idx(&self) -> Option<usize> {
        self.next_visit_idx
    }

    #[inline]
    pub fn arrival_time(&self) -> Option<NaiveDateTime> {
        self.arrival_time
    }

    #[inline]
    pub fn is_assigned(&self) -> bool {
        self.vehicle_idx.is_some()
    }

    #[inline]
    pub fn service_duration_delta(&self) -> TimeDelta {
        TimeDelta::seconds(self.service_duration)
    }

    /// Arrival plus service duration; `None` while unassigned.
    #[inline]
    pub fn departure_time(&self) -> Option<NaiveDateTime> {
        self.arrival_time.map(|arrival| arrival + self.service_duration_delta())
    }

    /// Later of arrival and the window start; `None` while unassigned.
    #[inline]
    pub fn start_service_time(&self) -> Option<NaiveDateTime> {
        self.arrival_time.map(|arrival| arrival.max(self.min_start_time))
    }

    /// Arrival time, failing if propagation has not established it.
    pub fn require_arrival_time(&self) -> Result<NaiveDateTime> {
        self.arrival_time.ok_or_else(|| {
            PlanningError::InvalidState(format!("visit {} has no arrival time", self.id))
        })
    }

    pub fn require_departure_time(&self) -> Result<NaiveDateTime> {
        Ok(self.require_arrival_time()? + self.service_duration_delta())
    }

    /// True if service finishes after `max_end_time`.
    #[inline]
    pub fn is_service_finished_after_max_end_time(&self) -> bool {
        self.departure_time()
            .is_some_and(|departure| departure > self.max_end_time)
    }

    /// Delay past `max_end_time`, rounded up to whole minutes; 0 when on time.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use planning_core::routing::{Location, Visit};
    ///
    /// let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
    /// let visit = Visit::new("1", "A", Location::new(0, 0.0, 0.0))
    ///     .with_time_window(day.and_hms_opt(8, 0, 0).unwrap(), day.and_hms_opt(9, 0, 0).unwrap());
    ///
    /// // Unassigned visits are never late
    /// assert_eq!(visit.service_finished_delay_minutes(), 0);
    /// ```
    pub fn service_finished_delay_minutes(&self) -> i64 {
        self.departure_time().map_or(0, |departure| {
            let delay_seconds = (departure - self.max_end_time).num_seconds().max(0);
            (delay_seconds + 59) / 60
        })
    }

    pub(super) fn clear_shadows(&mut self) {
        self.vehicle_idx = None;
        self.previous_visit_idx = None;
        self.next_visit_idx = None;
        self.arrival_time = None;
    }
}

/// A delivery vehicle with capacity and an ordered route.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use planning_core::routing::{Location, Vehicle};
///
/// let departure = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(8, 0, 0).unwrap();
/// let vehicle = Vehicle::new("1", "Truck 1", 100, Location::new(0, 39.95, -75.17), departure);
///
/// assert_eq!(vehicle.capacity, 100);
/// assert!(vehicle.visits().is_empty());
/// assert_eq!(vehicle.excess_demand(), 0);
/// ```
#[derive(Clone, Debug)]
pub struct Vehicle {
    pub id: String,
    pub name: String,
    pub capacity: i32,
    pub home_location: Location,
    pub departure_time: NaiveDateTime,

    /// Ordered visit indices (the planning list variable).
    pub(super) visits: Vec<usize>,

    // =========================================================================
    // Cached aggregates
    // =========================================================================
    pub(super) total_demand: i32,
    /// Seconds, including both home legs.
    pub(super) total_travel_time: i64,
}

impl Vehicle {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        capacity: i32,
        home_location: Location,
        departure_time: NaiveDateTime,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            capacity,
            home_location,
            departure_time,
            visits: Vec::new(),
            total_demand: 0,
            total_travel_time: 0,
        }
    }

    /// Sets the initial route. Shadows are built by [`VehicleRoutePlan::finalize`].
    pub fn with_visits(mut self, visits: Vec<usize>) -> Self {
        self.visits = visits;
        self
    }

    #[inline]
    pub fn visits(&self) -> &[usize] {
        &self.visits
    }

    #[inline]
    pub fn total_demand(&self) -> i32 {
        self.total_demand
    }

    /// Demand over capacity, 0 if within capacity.
    #[inline]
    pub fn excess_demand(&self) -> i32 {
        (self.total_demand - self.capacity).max(0)
    }

    /// Total travel time in seconds, 0 for an empty route.
    #[inline]
    pub fn total_travel_time(&self) -> i64 {
        self.total_travel_time
    }
}

/// The complete vehicle routing solution.
///
/// Call [`finalize`](Self::finalize) after construction to validate the
/// problem and initialize every shadow field.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use planning_core::routing::{Location, Vehicle, VehicleRoutePlan, Visit};
///
/// let departure = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(8, 0, 0).unwrap();
/// let depot = Location::new(0, 39.95, -75.17);
/// let customer = Location::new(1, 40.00, -75.10);
///
/// let mut plan = VehicleRoutePlan::new(
///     "Philadelphia",
///     vec![depot.clone(), customer.clone()],
///     vec![Visit::new("1", "Customer 1", customer).with_demand(5)],
///     vec![Vehicle::new("1", "Truck 1", 100, depot, departure).with_visits(vec![0])],
/// );
/// plan.finalize().unwrap();
///
/// let visit = plan.visit(0).unwrap();
/// assert_eq!(visit.vehicle_idx(), Some(0));
/// assert!(visit.arrival_time().unwrap() > departure);
/// assert_eq!(plan.vehicle(0).unwrap().total_demand(), 5);
/// ```
#[derive(Clone, Debug)]
pub struct VehicleRoutePlan {
    pub name: String,
    /// South-west corner of the bounding box, `[lat, lon]`.
    pub south_west_corner: [f64; 2],
    /// North-east corner of the bounding box, `[lat, lon]`.
    pub north_east_corner: [f64; 2],
    pub(super) locations: Vec<Location>,
    pub(super) visits: Vec<Visit>,
    pub(super) vehicles: Vec<Vehicle>,
    pub(super) score: Option<HardSoftScore>,
    average_speed_kmph: f64,
    pub(super) travel_times: Arc<TravelTimeCache>,
    visit_ids: HashMap<String, usize>,
}

impl VehicleRoutePlan {
    pub fn new(
        name: impl Into<String>,
        locations: Vec<Location>,
        visits: Vec<Visit>,
        vehicles: Vec<Vehicle>,
    ) -> Self {
        let (sw, ne) = Self::compute_bounds(&locations);

        Self {
            name: name.into(),
            south_west_corner: sw,
            north_east_corner: ne,
            locations,
            visits,
            vehicles,
            score: None,
            average_speed_kmph: DEFAULT_AVERAGE_SPEED_KMPH,
            travel_times: Arc::new(TravelTimeCache::empty(DEFAULT_AVERAGE_SPEED_KMPH)),
            visit_ids: HashMap::new(),
        }
    }

    /// Sets the speed used for travel times. Takes effect at `finalize`.
    pub fn with_average_speed(mut self, kmph: f64) -> Self {
        self.average_speed_kmph = kmph;
        self
    }

    fn compute_bounds(locations: &[Location]) -> ([f64; 2], [f64; 2]) {
        if locations.is_empty() {
            return ([0.0, 0.0], [0.0, 0.0]);
        }

        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lon = f64::MAX;
        let mut max_lon = f64::MIN;

        for loc in locations {
            min_lat = min_lat.min(loc.latitude);
            max_lat = max_lat.max(loc.latitude);
            min_lon = min_lon.min(loc.longitude);
            max_lon = max_lon.max(loc.longitude);
        }

        ([min_lat, min_lon], [max_lat, max_lon])
    }

    /// Validates the problem, builds the travel time cache and initializes
    /// every shadow field from the vehicles' routes.
    pub fn finalize(&mut self) -> Result<()> {
        self.travel_times = Arc::new(TravelTimeCache::new(&self.locations, self.average_speed_kmph)?);
        self.validate()?;

        self.visit_ids = self
            .visits
            .iter()
            .enumerate()
            .map(|(i, v)| (v.id.clone(), i))
            .collect();

        for visit in &mut self.visits {
            visit.clear_shadows();
        }
        for v in 0..self.vehicles.len() {
            self.rebuild_vehicle_shadows(v)?;
        }

        info!(
            plan = %self.name,
            locations = self.locations.len(),
            visits = self.visits.len(),
            vehicles = self.vehicles.len(),
            "Route plan finalized"
        );
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let location_count = self.locations.len();
        let invalid = |msg: String| Err(PlanningError::InvalidProblem(msg));

        let mut ids = HashSet::new();
        for visit in &self.visits {
            if !ids.insert(visit.id.as_str()) {
                return invalid(format!("duplicate visit id {}", visit.id));
            }
            if visit.location.index >= location_count {
                return invalid(format!(
                    "visit {} references location {} of {}",
                    visit.id, visit.location.index, location_count
                ));
            }
            if visit.service_duration < 0 {
                return invalid(format!("visit {} has negative service duration", visit.id));
            }
        }

        let mut vehicle_ids = HashSet::new();
        let mut routed = HashSet::new();
        for vehicle in &self.vehicles {
            if !vehicle_ids.insert(vehicle.id.as_str()) {
                return invalid(format!("duplicate vehicle id {}", vehicle.id));
            }
            if vehicle.home_location.index >= location_count {
                return invalid(format!(
                    "vehicle {} references location {} of {}",
                    vehicle.id, vehicle.home_location.index, location_count
                ));
            }
            for &visit_idx in &vehicle.visits {
                if visit_idx >= self.visits.len() {
                    return invalid(format!(
                        "vehicle {} routes unknown visit index {}",
                        vehicle.id, visit_idx
                    ));
                }
                if !routed.insert(visit_idx) {
                    return invalid(format!(
                        "visit {} appears on more than one route position",
                        self.visits[visit_idx].id
                    ));
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn visits(&self) -> &[Visit] {
        &self.visits
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    #[inline]
    pub fn visit(&self, idx: usize) -> Option<&Visit> {
        self.visits.get(idx)
    }

    #[inline]
    pub fn vehicle(&self, idx: usize) -> Option<&Vehicle> {
        self.vehicles.get(idx)
    }

    /// Index of the visit with the given id. Populated by `finalize`.
    pub fn visit_index(&self, id: &str) -> Option<usize> {
        self.visit_ids.get(id).copied()
    }

    pub fn vehicle_index(&self, id: &str) -> Option<usize> {
        self.vehicles.iter().position(|v| v.id == id)
    }

    pub fn travel_times(&self) -> &Arc<TravelTimeCache> {
        &self.travel_times
    }

    pub fn average_speed_kmph(&self) -> f64 {
        self.average_speed_kmph
    }

    pub fn score(&self) -> Option<HardSoftScore> {
        self.score
    }

    pub fn assigned_visit_count(&self) -> usize {
        self.visits.iter().filter(|v| v.is_assigned()).count()
    }

    /// Travel time in seconds between two locations.
    #[inline]
    pub fn travel_time(&self, from: &Location, to: &Location) -> i64 {
        self.travel_times.travel_time(from, to)
    }

    /// Seconds driven from the previous standstill (visit or home) to a visit.
    pub fn travel_time_from_previous(&self, visit_idx: usize) -> Result<i64> {
        let visit = self.visits.get(visit_idx).ok_or_else(|| {
            PlanningError::InvalidState(format!("no visit at index {}", visit_idx))
        })?;
        let vehicle_idx = visit.vehicle_idx.ok_or_else(|| {
            PlanningError::InvalidState(format!(
                "visit {} is unassigned; shadow fields are not initialized",
                visit.id
            ))
        })?;
        let from = match visit.previous_visit_idx {
            Some(prev) => &self.visits[prev].location,
            None => &self.vehicles[vehicle_idx].home_location,
        };
        Ok(self.travel_time(from, &visit.location))
    }

    /// Time the vehicle is back home: the last departure plus the home leg,
    /// or the departure time for an empty route.
    pub fn vehicle_arrival_time(&self, vehicle_idx: usize) -> Result<NaiveDateTime> {
        let vehicle = self.vehicles.get(vehicle_idx).ok_or_else(|| {
            PlanningError::InvalidState(format!("no vehicle at index {}", vehicle_idx))
        })?;
        match vehicle.visits.last() {
            None => Ok(vehicle.departure_time),
            Some(&last) => {
                let last = &self.visits[last];
                let home_leg = self.travel_time(&last.location, &vehicle.home_location);
                Ok(last.require_departure_time()? + TimeDelta::seconds(home_leg))
            }
        }
    }

    /// Sum of every vehicle's cached travel time.
    pub fn total_travel_time(&self) -> i64 {
        self.vehicles.iter().map(Vehicle::total_travel_time).sum()
    }

    /// Travel time of a route computed from its visit list, ignoring caches.
    pub fn route_travel_time(&self, vehicle_idx: usize) -> i64 {
        let Some(vehicle) = self.vehicles.get(vehicle_idx) else {
            return 0;
        };
        let mut total = 0;
        let mut current = &vehicle.home_location;
        for &visit_idx in &vehicle.visits {
            let location = &self.visits[visit_idx].location;
            total += self.travel_time(current, location);
            current = location;
        }
        total + self.travel_time(current, &vehicle.home_location)
    }

    /// Recomputes every shadow field from the routes and compares it with the
    /// stored value.
    pub fn verify_shadows(&self) -> Result<()> {
        let mismatch = |what: String| Err(PlanningError::InvalidState(what));
        let mut on_route = vec![false; self.visits.len()];

        for (v, vehicle) in self.vehicles.iter().enumerate() {
            let mut departure = vehicle.departure_time;
            let mut location = &vehicle.home_location;
            let mut demand = 0;

            for (pos, &idx) in vehicle.visits.iter().enumerate() {
                let visit = &self.visits[idx];
                on_route[idx] = true;
                let expected_prev = pos.checked_sub(1).map(|p| vehicle.visits[p]);
                let expected_next = vehicle.visits.get(pos + 1).copied();
                if visit.vehicle_idx != Some(v)
                    || visit.previous_visit_idx != expected_prev
                    || visit.next_visit_idx != expected_next
                {
                    return mismatch(format!("visit {} has stale links", visit.id));
                }

                let arrival = departure + TimeDelta::seconds(self.travel_time(location, &visit.location));
                if visit.arrival_time != Some(arrival) {
                    return mismatch(format!(
                        "visit {} arrival {:?}, expected {}",
                        visit.id, visit.arrival_time, arrival
                    ));
                }
                departure = arrival + visit.service_duration_delta();
                location = &visit.location;
                demand += visit.demand;
            }

            if vehicle.total_demand != demand {
                return mismatch(format!("vehicle {} demand cache is stale", vehicle.id));
            }
            if vehicle.total_travel_time != self.route_travel_time(v) {
                return mismatch(format!("vehicle {} travel time cache is stale", vehicle.id));
            }
        }

        for (visit, routed) in self.visits.iter().zip(on_route) {
            if !routed
                && (visit.vehicle_idx.is_some()
                    || visit.previous_visit_idx.is_some()
                    || visit.next_visit_idx.is_some()
                    || visit.arrival_time.is_some())
            {
                return mismatch(format!("unassigned visit {} has shadow values", visit.id));
            }
        }
        Ok(())
    }
}
