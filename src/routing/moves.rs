//! Structural edits on route lists.

use std::fmt;

use super::domain::VehicleRoutePlan;
use crate::director::{AppliedMove, PlanningSolution};
use crate::error::{PlanningError, Result};
use crate::score::HardSoftScore;

/// An edit to the route lists. Indices refer to `visits()` and `vehicles()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteMove {
    /// Inserts an unassigned visit at `position` of a route.
    Assign {
        visit: usize,
        vehicle: usize,
        position: usize,
    },
    /// Removes an assigned visit from its route.
    Unassign { visit: usize },
    /// Moves an assigned visit to `position` of a route. The position is
    /// interpreted after the visit has been removed from its current route.
    Change {
        visit: usize,
        vehicle: usize,
        position: usize,
    },
}

impl fmt::Display for RouteMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteMove::Assign {
                visit,
                vehicle,
                position,
            } => write!(f, "assign visit {} to vehicle {} at {}", visit, vehicle, position),
            RouteMove::Unassign { visit } => write!(f, "unassign visit {}", visit),
            RouteMove::Change {
                visit,
                vehicle,
                position,
            } => write!(f, "move visit {} to vehicle {} at {}", visit, vehicle, position),
        }
    }
}

impl VehicleRoutePlan {
    fn check_visit(&self, visit: usize) -> Result<()> {
        if visit >= self.visits.len() {
            return Err(PlanningError::InvalidMove(format!(
                "no visit at index {} ({} visits)",
                visit,
                self.visits.len()
            )));
        }
        Ok(())
    }

    fn check_vehicle(&self, vehicle: usize) -> Result<()> {
        if vehicle >= self.vehicles.len() {
            return Err(PlanningError::InvalidMove(format!(
                "no vehicle at index {} ({} vehicles)",
                vehicle,
                self.vehicles.len()
            )));
        }
        Ok(())
    }

    fn check_position(&self, vehicle: usize, position: usize, route_len: usize) -> Result<()> {
        if position > route_len {
            return Err(PlanningError::InvalidMove(format!(
                "position {} out of range for vehicle {} with {} visits",
                position, self.vehicles[vehicle].id, route_len
            )));
        }
        Ok(())
    }

    /// Validates and applies a route edit, returning its undo.
    ///
    /// Invalid moves fail with [`PlanningError::InvalidMove`] and leave the
    /// plan untouched.
    pub fn apply_route_move(&mut self, mv: &RouteMove) -> Result<AppliedMove<RouteMove>> {
        match *mv {
            RouteMove::Assign {
                visit,
                vehicle,
                position,
            } => {
                self.check_visit(visit)?;
                self.check_vehicle(vehicle)?;
                if self.visits[visit].is_assigned() {
                    return Err(PlanningError::InvalidMove(format!(
                        "visit {} is already assigned",
                        self.visits[visit].id
                    )));
                }
                self.check_position(vehicle, position, self.vehicles[vehicle].visits.len())?;

                self.attach_visit(visit, vehicle, position)?;
                Ok(AppliedMove::new(vec![vehicle], RouteMove::Unassign { visit }))
            }
            RouteMove::Unassign { visit } => {
                self.check_visit(visit)?;
                if !self.visits[visit].is_assigned() {
                    return Err(PlanningError::InvalidMove(format!(
                        "visit {} is not assigned",
                        self.visits[visit].id
                    )));
                }

                let (vehicle, position) = self.detach_visit(visit)?;
                Ok(AppliedMove::new(
                    vec![vehicle],
                    RouteMove::Assign {
                        visit,
                        vehicle,
                        position,
                    },
                ))
            }
            RouteMove::Change {
                visit,
                vehicle,
                position,
            } => {
                self.check_visit(visit)?;
                self.check_vehicle(vehicle)?;
                let Some(source) = self.visits[visit].vehicle_idx else {
                    return Err(PlanningError::InvalidMove(format!(
                        "visit {} is not assigned",
                        self.visits[visit].id
                    )));
                };
                let target_len = self.vehicles[vehicle].visits.len() - usize::from(source == vehicle);
                self.check_position(vehicle, position, target_len)?;

                let current = self.vehicles[source].visits.iter().position(|&v| v == visit);
                if source == vehicle && current == Some(position) {
                    return Ok(AppliedMove::new(Vec::new(), *mv));
                }

                let (source, source_position) = self.detach_visit(visit)?;
                self.attach_visit(visit, vehicle, position)?;
                Ok(AppliedMove::new(
                    vec![source, vehicle],
                    RouteMove::Change {
                        visit,
                        vehicle: source,
                        position: source_position,
                    },
                ))
            }
        }
    }
}

impl PlanningSolution for VehicleRoutePlan {
    type Move = RouteMove;

    fn group_count(&self) -> usize {
        self.vehicles.len()
    }

    fn apply_move(&mut self, mv: &RouteMove) -> Result<AppliedMove<RouteMove>> {
        self.apply_route_move(mv)
    }

    fn score(&self) -> Option<HardSoftScore> {
        self.score
    }

    fn set_score(&mut self, score: Option<HardSoftScore>) {
        self.score = score;
    }
}
