//! Constraint definitions for vehicle routing.
//!
//! Every constraint is grouped by vehicle and reads the shadow fields and
//! cached aggregates kept current by propagation.
//!
//! # Constraints
//!
//! - **Vehicle capacity** (hard): total demand must not exceed capacity
//! - **Time windows** (hard): service must complete before max end time
//! - **Minimize travel time** (soft): total driving seconds

use crate::analysis::EntityRef;
use crate::config::PlanningConfig;
use crate::constraint::{Constraint, ConstraintSet};

use super::domain::VehicleRoutePlan;

pub const VEHICLE_CAPACITY: &str = "vehicleCapacity";
pub const SERVICE_FINISHED_AFTER_MAX_END_TIME: &str = "serviceFinishedAfterMaxEndTime";
pub const MINIMIZE_TRAVEL_TIME: &str = "minimizeTravelTime";

/// Creates the constraint set for vehicle routing with configured weights.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use chrono::NaiveDate;
/// use planning_core::config::PlanningConfig;
/// use planning_core::director::ScoreDirector;
/// use planning_core::routing::{define_constraints, Location, Vehicle, VehicleRoutePlan, Visit};
///
/// let departure = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(8, 0, 0).unwrap();
/// let depot = Location::new(0, 0.0, 0.0);
/// let customer = Location::new(1, 0.0, 0.01);
///
/// let mut plan = VehicleRoutePlan::new(
///     "test",
///     vec![depot.clone(), customer.clone()],
///     vec![Visit::new("a", "A", customer).with_demand(5)],
///     vec![Vehicle::new("v1", "V1", 10, depot, departure).with_visits(vec![0])],
/// );
/// plan.finalize().unwrap();
///
/// let constraints = Arc::new(define_constraints(&PlanningConfig::default()));
/// let director = ScoreDirector::new(plan, constraints).unwrap();
/// assert!(director.is_feasible()); // Demand 5 <= capacity 10
/// assert!(director.score().soft() < 0); // Driving time is penalized
/// ```
pub fn define_constraints(config: &PlanningConfig) -> ConstraintSet<VehicleRoutePlan> {
    // HARD: Vehicle capacity - penalize excess demand
    let vehicle_capacity = Constraint::penalize_hard(VEHICLE_CAPACITY, |plan: &VehicleRoutePlan, v, sink| {
        let vehicle = &plan.vehicles[v];
        sink.add(i64::from(vehicle.excess_demand()), || {
            (
                vec![EntityRef::new("Vehicle", vehicle.id.as_str())],
                format!(
                    "Vehicle {} demand {} exceeds capacity {}",
                    vehicle.id, vehicle.total_demand, vehicle.capacity
                ),
            )
        });
        Ok(())
    });

    // HARD: Time windows - penalize delay in minutes
    let service_finished_late = Constraint::penalize_hard(
        SERVICE_FINISHED_AFTER_MAX_END_TIME,
        |plan: &VehicleRoutePlan, v, sink| {
            for &idx in &plan.vehicles[v].visits {
                let visit = &plan.visits[idx];
                let departure = visit.require_departure_time()?;
                if departure <= visit.max_end_time {
                    continue;
                }
                let delay = visit.service_finished_delay_minutes();
                sink.add(delay, || {
                    (
                        vec![EntityRef::new("Visit", visit.id.as_str())],
                        format!(
                            "Visit {} finished {} minutes after {}",
                            visit.id, delay, visit.max_end_time
                        ),
                    )
                });
            }
            Ok(())
        },
    );

    // SOFT: Minimize travel time
    let minimize_travel_time = Constraint::penalize_soft(MINIMIZE_TRAVEL_TIME, |plan: &VehicleRoutePlan, v, sink| {
        let vehicle = &plan.vehicles[v];
        sink.add(vehicle.total_travel_time, || {
            (
                vec![EntityRef::new("Vehicle", vehicle.id.as_str())],
                format!(
                    "Vehicle {} drives {} seconds",
                    vehicle.id, vehicle.total_travel_time
                ),
            )
        });
        Ok(())
    });

    ConstraintSet::new(vec![vehicle_capacity, service_finished_late, minimize_travel_time])
        .with_weights(&config.constraint_weights)
}
