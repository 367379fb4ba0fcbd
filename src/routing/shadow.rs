//! Shadow propagation for route chains.
//!
//! These routines are the only writers of visit links, vehicle
//! back-references, arrival times and vehicle aggregates. After an edit the
//! arrival walk starts at the edit position and stops as soon as a
//! recomputed arrival equals the stored one, since everything after it is
//! then already consistent.

use chrono::TimeDelta;
use tracing::trace;

use super::domain::VehicleRoutePlan;
use super::location::Location;
use crate::error::{PlanningError, Result};

impl VehicleRoutePlan {
    /// Rebuilds links, aggregates and arrivals of one route from scratch.
    pub(super) fn rebuild_vehicle_shadows(&mut self, vehicle_idx: usize) -> Result<()> {
        let route = self.vehicles[vehicle_idx].visits.clone();
        let mut demand = 0;

        for (pos, &idx) in route.iter().enumerate() {
            let visit = &mut self.visits[idx];
            visit.vehicle_idx = Some(vehicle_idx);
            visit.previous_visit_idx = pos.checked_sub(1).map(|p| route[p]);
            visit.next_visit_idx = route.get(pos + 1).copied();
            visit.arrival_time = None;
            demand += visit.demand;
        }

        let travel = self.route_travel_time(vehicle_idx);
        let vehicle = &mut self.vehicles[vehicle_idx];
        vehicle.total_demand = demand;
        vehicle.total_travel_time = travel;

        self.propagate_arrivals(vehicle_idx, 0)?;
        Ok(())
    }

    /// Location the vehicle stands at before position `pos`.
    fn standstill_before(&self, vehicle_idx: usize, pos: usize) -> &Location {
        let vehicle = &self.vehicles[vehicle_idx];
        match pos.checked_sub(1) {
            Some(prev) => &self.visits[vehicle.visits[prev]].location,
            None => &vehicle.home_location,
        }
    }

    /// Location the vehicle heads to after position `pos`.
    fn standstill_after(&self, vehicle_idx: usize, pos: usize) -> &Location {
        let vehicle = &self.vehicles[vehicle_idx];
        match vehicle.visits.get(pos + 1) {
            Some(&next) => &self.visits[next].location,
            None => &vehicle.home_location,
        }
    }

    /// Removes a visit from its route and clears its shadow fields.
    ///
    /// Returns the vehicle and position it was removed from.
    pub(super) fn detach_visit(&mut self, visit_idx: usize) -> Result<(usize, usize)> {
        let visit = &self.visits[visit_idx];
        let vehicle_idx = visit.vehicle_idx.ok_or_else(|| {
            PlanningError::InvalidState(format!("visit {} is not on a route", visit.id))
        })?;
        let pos = self.vehicles[vehicle_idx]
            .visits
            .iter()
            .position(|&v| v == visit_idx)
            .ok_or_else(|| {
                PlanningError::InvalidState(format!(
                    "visit {} missing from vehicle {} route",
                    visit.id, self.vehicles[vehicle_idx].id
                ))
            })?;

        let before = self.standstill_before(vehicle_idx, pos);
        let after = self.standstill_after(vehicle_idx, pos);
        let location = &self.visits[visit_idx].location;
        let travel_delta = self.travel_time(before, after)
            - self.travel_time(before, location)
            - self.travel_time(location, after);

        let (prev, next) = (visit.previous_visit_idx, visit.next_visit_idx);
        let demand = visit.demand;
        if let Some(prev) = prev {
            self.visits[prev].next_visit_idx = next;
        }
        if let Some(next) = next {
            self.visits[next].previous_visit_idx = prev;
        }
        self.visits[visit_idx].clear_shadows();

        let vehicle = &mut self.vehicles[vehicle_idx];
        vehicle.visits.remove(pos);
        vehicle.total_demand -= demand;
        vehicle.total_travel_time += travel_delta;

        self.propagate_arrivals(vehicle_idx, pos)?;
        Ok((vehicle_idx, pos))
    }

    /// Inserts an unassigned visit into a route at `pos`.
    pub(super) fn attach_visit(&mut self, visit_idx: usize, vehicle_idx: usize, pos: usize) -> Result<()> {
        if self.visits[visit_idx].vehicle_idx.is_some() {
            return Err(PlanningError::InvalidState(format!(
                "visit {} is already on a route",
                self.visits[visit_idx].id
            )));
        }

        let before = self.standstill_before(vehicle_idx, pos);
        // The visit currently at `pos` becomes the successor.
        let after = match self.vehicles[vehicle_idx].visits.get(pos) {
            Some(&next) => &self.visits[next].location,
            None => &self.vehicles[vehicle_idx].home_location,
        };
        let location = &self.visits[visit_idx].location;
        let travel_delta = self.travel_time(before, location) + self.travel_time(location, after)
            - self.travel_time(before, after);

        let route = &self.vehicles[vehicle_idx].visits;
        let prev = pos.checked_sub(1).map(|p| route[p]);
        let next = route.get(pos).copied();
        if let Some(prev) = prev {
            self.visits[prev].next_visit_idx = Some(visit_idx);
        }
        if let Some(next) = next {
            self.visits[next].previous_visit_idx = Some(visit_idx);
        }

        let visit = &mut self.visits[visit_idx];
        visit.vehicle_idx = Some(vehicle_idx);
        visit.previous_visit_idx = prev;
        visit.next_visit_idx = next;
        let demand = visit.demand;

        let vehicle = &mut self.vehicles[vehicle_idx];
        vehicle.visits.insert(pos, visit_idx);
        vehicle.total_demand += demand;
        vehicle.total_travel_time += travel_delta;

        self.propagate_arrivals(vehicle_idx, pos)?;
        Ok(())
    }

    /// Recomputes arrivals from route position `start` onwards.
    ///
    /// Returns the number of visits whose arrival changed.
    pub(super) fn propagate_arrivals(&mut self, vehicle_idx: usize, start: usize) -> Result<usize> {
        let vehicle = &self.vehicles[vehicle_idx];
        let route = &vehicle.visits;

        let (mut previous_departure, mut previous_location) = match start.checked_sub(1) {
            None => (vehicle.departure_time, vehicle.home_location.clone()),
            Some(prev) => {
                let prev = &self.visits[route[prev]];
                (prev.require_departure_time()?, prev.location.clone())
            }
        };

        let mut updated = 0;
        for &idx in route.iter().skip(start) {
            let leg = self.travel_times.travel_time(&previous_location, &self.visits[idx].location);
            let arrival = previous_departure + TimeDelta::seconds(leg);

            let visit = &mut self.visits[idx];
            if visit.arrival_time == Some(arrival) {
                break;
            }
            visit.arrival_time = Some(arrival);
            updated += 1;

            previous_departure = arrival + visit.service_duration_delta();
            previous_location = visit.location.clone();
        }

        trace!(vehicle = vehicle_idx, start, updated, "Arrival times propagated");
        Ok(updated)
    }
}
