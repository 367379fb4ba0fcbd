//! Seeded demo problem generators and random moves.
//!
//! Routing instances are scattered around Philadelphia with weighted
//! customer types:
//! - Residential (50%): 17:00-20:00, demand 1-2
//! - Business (30%): 09:00-17:00, demand 3-6
//! - Restaurant (20%): 06:00-10:00, demand 5-10
//!
//! Scheduling instances follow a hospital roster with eight hour shifts.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use rand::prelude::*;
use rand::rngs::StdRng;

use crate::error::Result;
use crate::routing::{Location, RouteMove, Vehicle, VehicleRoutePlan, Visit};
use crate::scheduling::{Employee, EmployeeSchedule, Shift, ShiftMove};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoData {
    Small,
    Large,
}

impl std::str::FromStr for DemoData {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SMALL" => Ok(DemoData::Small),
            "LARGE" => Ok(DemoData::Large),
            _ => Err(()),
        }
    }
}

impl DemoData {
    pub fn as_str(&self) -> &'static str {
        match self {
            DemoData::Small => "SMALL",
            DemoData::Large => "LARGE",
        }
    }

    fn routing(&self) -> RoutingParameters {
        match self {
            DemoData::Small => RoutingParameters {
                vehicle_count: 3,
                visit_count: 30,
                min_capacity: 15,
                max_capacity: 30,
            },
            DemoData::Large => RoutingParameters {
                vehicle_count: 10,
                visit_count: 200,
                min_capacity: 20,
                max_capacity: 40,
            },
        }
    }

    fn scheduling(&self) -> SchedulingParameters {
        match self {
            DemoData::Small => SchedulingParameters {
                locations: &["Ambulatory care", "Critical care", "Pediatric care"],
                days_in_schedule: 14,
                employee_count: 15,
            },
            DemoData::Large => SchedulingParameters {
                locations: &[
                    "Ambulatory care",
                    "Neurology",
                    "Critical care",
                    "Pediatric care",
                    "Surgery",
                    "Radiology",
                    "Outpatient",
                ],
                days_in_schedule: 28,
                employee_count: 50,
            },
        }
    }
}

struct RoutingParameters {
    vehicle_count: usize,
    visit_count: usize,
    min_capacity: i32,
    max_capacity: i32,
}

struct SchedulingParameters {
    locations: &'static [&'static str],
    days_in_schedule: u64,
    employee_count: usize,
}

/// Share of generated units that start out assigned.
const INITIALLY_ASSIGNED: f64 = 0.7;

const SOUTH_WEST: [f64; 2] = [39.7656, -75.5436];
const NORTH_EAST: [f64; 2] = [40.1182, -74.9876];

const VEHICLE_NAMES: [&str; 10] = [
    "Alpha", "Bravo", "Charlie", "Delta", "Echo", "Foxtrot", "Golf", "Hotel", "India", "Juliet",
];

#[derive(Clone, Copy)]
enum CustomerType {
    Residential,
    Business,
    Restaurant,
}

impl CustomerType {
    /// Weighted random selection: 50% residential, 30% business, 20% restaurant.
    fn random(rng: &mut StdRng) -> Self {
        let r: u32 = rng.gen_range(1..=100);
        if r <= 50 {
            CustomerType::Residential
        } else if r <= 80 {
            CustomerType::Business
        } else {
            CustomerType::Restaurant
        }
    }

    /// Hours of day.
    fn time_window(&self) -> (u32, u32) {
        match self {
            CustomerType::Residential => (17, 20),
            CustomerType::Business => (9, 17),
            CustomerType::Restaurant => (6, 10),
        }
    }

    fn demand_range(&self) -> (i32, i32) {
        match self {
            CustomerType::Residential => (1, 2),
            CustomerType::Business => (3, 6),
            CustomerType::Restaurant => (5, 10),
        }
    }

    /// Minutes.
    fn service_duration_range(&self) -> (i64, i64) {
        match self {
            CustomerType::Residential => (5, 10),
            CustomerType::Business => (15, 30),
            CustomerType::Restaurant => (20, 40),
        }
    }
}

fn schedule_start() -> NaiveDate {
    // A Monday
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

fn at(date: NaiveDate, hour: u32) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN))
}

fn random_location(rng: &mut StdRng, index: usize) -> Location {
    Location::new(
        index,
        rng.gen_range(SOUTH_WEST[0]..NORTH_EAST[0]),
        rng.gen_range(SOUTH_WEST[1]..NORTH_EAST[1]),
    )
}

/// Generates and finalizes a routing problem.
///
/// # Examples
///
/// ```
/// use planning_core::demo_data::{generate_route_plan, DemoData};
///
/// let plan = generate_route_plan(DemoData::Small, 7, 50.0).unwrap();
/// assert_eq!(plan.vehicles().len(), 3);
/// assert_eq!(plan.visits().len(), 30);
/// assert!(plan.verify_shadows().is_ok());
/// ```
pub fn generate_route_plan(demo: DemoData, seed: u64, average_speed_kmph: f64) -> Result<VehicleRoutePlan> {
    let params = demo.routing();
    let mut rng = StdRng::seed_from_u64(seed);
    let date = schedule_start();

    let mut locations = Vec::with_capacity(params.vehicle_count + params.visit_count);
    for i in 0..params.vehicle_count + params.visit_count {
        locations.push(random_location(&mut rng, i));
    }

    let visits: Vec<Visit> = (0..params.visit_count)
        .map(|i| {
            let kind = CustomerType::random(&mut rng);
            let (open, close) = kind.time_window();
            let (min_demand, max_demand) = kind.demand_range();
            let (min_service, max_service) = kind.service_duration_range();
            Visit::new(
                i.to_string(),
                format!("Customer {}", i),
                locations[params.vehicle_count + i].clone(),
            )
            .with_demand(rng.gen_range(min_demand..=max_demand))
            .with_time_window(at(date, open), at(date, close))
            .with_service_duration(rng.gen_range(min_service..=max_service) * 60)
        })
        .collect();

    let mut routes = vec![Vec::new(); params.vehicle_count];
    for visit in 0..params.visit_count {
        if rng.gen_bool(INITIALLY_ASSIGNED) {
            routes[rng.gen_range(0..params.vehicle_count)].push(visit);
        }
    }

    let vehicles = routes
        .into_iter()
        .enumerate()
        .map(|(i, route)| {
            Vehicle::new(
                i.to_string(),
                VEHICLE_NAMES[i % VEHICLE_NAMES.len()],
                rng.gen_range(params.min_capacity..=params.max_capacity),
                locations[i].clone(),
                at(date, 7),
            )
            .with_visits(route)
        })
        .collect();

    let mut plan = VehicleRoutePlan::new("Philadelphia", locations, visits, vehicles)
        .with_average_speed(average_speed_kmph);
    plan.south_west_corner = SOUTH_WEST;
    plan.north_east_corner = NORTH_EAST;
    plan.finalize()?;
    Ok(plan)
}

const REQUIRED_SKILLS: [&str; 2] = ["Doctor", "Nurse"];
const OPTIONAL_SKILLS: [&str; 3] = ["Anaesthetics", "Cardiology", "Radiology"];
const SHIFT_START_HOURS: [&[u32]; 3] = [&[6, 14], &[6, 14, 22], &[6, 9, 14, 22]];

const FIRST_NAMES: &[&str] = &[
    "Amy", "Beth", "Carl", "Dan", "Elsa", "Flo", "Gus", "Hugo", "Ivy", "Jay",
];
const LAST_NAMES: &[&str] = &[
    "Cole", "Fox", "Green", "Jones", "King", "Li", "Poe", "Rye", "Smith", "Watt",
];

fn generate_name_permutations(rng: &mut StdRng) -> Vec<String> {
    let mut names = Vec::with_capacity(FIRST_NAMES.len() * LAST_NAMES.len());
    for first in FIRST_NAMES {
        for last in LAST_NAMES {
            names.push(format!("{} {}", first, last));
        }
    }
    names.shuffle(rng);
    names
}

/// Generates and finalizes a scheduling problem.
///
/// # Examples
///
/// ```
/// use planning_core::demo_data::{generate_schedule, DemoData};
///
/// let schedule = generate_schedule(DemoData::Small, 7).unwrap();
/// assert_eq!(schedule.employees().len(), 15);
/// assert!(schedule.shifts().len() >= 14 * 9);
/// ```
pub fn generate_schedule(demo: DemoData, seed: u64) -> Result<EmployeeSchedule> {
    let params = demo.scheduling();
    let mut rng = StdRng::seed_from_u64(seed);
    let start_date = schedule_start();
    let names = generate_name_permutations(&mut rng);

    let mut employees: Vec<Employee> = (0..params.employee_count)
        .map(|i| {
            let optional_count = rng.gen_range(1..=2);
            let mut skills: Vec<&str> = OPTIONAL_SKILLS
                .choose_multiple(&mut rng, optional_count)
                .copied()
                .collect();
            if let Some(required) = REQUIRED_SKILLS.choose(&mut rng) {
                skills.push(required);
            }
            Employee::new(i, names[i % names.len()].clone()).with_skills(skills)
        })
        .collect();

    let mut shifts = Vec::new();
    for day in 0..params.days_in_schedule {
        let date = start_date + Days::new(day);

        let availability_count = rng.gen_range(1..=params.employee_count / 3 + 1);
        let picked: Vec<usize> = employees
            .choose_multiple(&mut rng, availability_count)
            .map(|e| e.index)
            .collect();
        for employee in picked {
            let dates = match rng.gen_range(0..3) {
                0 => &mut employees[employee].unavailable_dates,
                1 => &mut employees[employee].undesired_dates,
                _ => &mut employees[employee].desired_dates,
            };
            dates.insert(date);
        }

        for (l, location) in params.locations.iter().enumerate() {
            for &hour in SHIFT_START_HOURS[l % SHIFT_START_HOURS.len()] {
                let start = at(date, hour);
                let end = start + TimeDelta::hours(8);
                let required_skill = if rng.gen_bool(0.5) {
                    REQUIRED_SKILLS.choose(&mut rng)
                } else {
                    OPTIONAL_SKILLS.choose(&mut rng)
                }
                .copied()
                .unwrap_or("Doctor");

                let mut shift = Shift::new(shifts.len().to_string(), start, end, *location, required_skill);
                if rng.gen_bool(INITIALLY_ASSIGNED) {
                    shift = shift.with_employee(rng.gen_range(0..params.employee_count));
                }
                shifts.push(shift);
            }
        }
    }

    let mut schedule = EmployeeSchedule::new(employees, shifts);
    schedule.finalize()?;
    Ok(schedule)
}

/// A random valid route edit, or `None` for a plan without visits or vehicles.
pub fn random_route_move(plan: &VehicleRoutePlan, rng: &mut StdRng) -> Option<RouteMove> {
    if plan.visits().is_empty() || plan.vehicles().is_empty() {
        return None;
    }
    let visit = rng.gen_range(0..plan.visits().len());
    let vehicle = rng.gen_range(0..plan.vehicles().len());
    let route_len = plan.vehicles()[vehicle].visits().len();

    let mv = match plan.visits()[visit].vehicle_idx() {
        None => RouteMove::Assign {
            visit,
            vehicle,
            position: rng.gen_range(0..=route_len),
        },
        Some(_) if rng.gen_bool(0.2) => RouteMove::Unassign { visit },
        Some(source) => RouteMove::Change {
            visit,
            vehicle,
            position: rng.gen_range(0..=route_len - usize::from(source == vehicle)),
        },
    };
    Some(mv)
}

/// A random assignment edit, or `None` for a schedule without shifts or employees.
pub fn random_shift_move(schedule: &EmployeeSchedule, rng: &mut StdRng) -> Option<ShiftMove> {
    let shift_count = schedule.shifts().len();
    if shift_count == 0 || schedule.employees().is_empty() {
        return None;
    }
    let shift = rng.gen_range(0..shift_count);
    if rng.gen_bool(0.3) {
        return Some(ShiftMove::Swap {
            left: shift,
            right: rng.gen_range(0..shift_count),
        });
    }
    let employee = if rng.gen_bool(0.1) {
        None
    } else {
        Some(rng.gen_range(0..schedule.employees().len()))
    };
    Some(ShiftMove::Change { shift, employee })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_deterministic() {
        let a = generate_route_plan(DemoData::Small, 42, 50.0).unwrap();
        let b = generate_route_plan(DemoData::Small, 42, 50.0).unwrap();
        assert_eq!(a.total_travel_time(), b.total_travel_time());
        assert_eq!(a.assigned_visit_count(), b.assigned_visit_count());

        let a = generate_schedule(DemoData::Small, 42).unwrap();
        let b = generate_schedule(DemoData::Small, 42).unwrap();
        assert_eq!(a.unassigned_shift_count(), b.unassigned_shift_count());
    }

    #[test]
    fn test_large_sizes() {
        let plan = generate_route_plan(DemoData::Large, 1, 50.0).unwrap();
        assert_eq!(plan.locations().len(), 210);

        let schedule = generate_schedule(DemoData::Large, 1).unwrap();
        assert_eq!(schedule.employees().len(), 50);
        let names: std::collections::HashSet<_> = schedule.employees().iter().map(|e| &e.name).collect();
        assert_eq!(names.len(), 50);
    }

    #[test]
    fn test_random_moves_apply() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut plan = generate_route_plan(DemoData::Small, 3, 50.0).unwrap();
        let mut schedule = generate_schedule(DemoData::Small, 3).unwrap();
        for _ in 0..200 {
            let mv = random_route_move(&plan, &mut rng).unwrap();
            plan.apply_route_move(&mv).unwrap();
            let mv = random_shift_move(&schedule, &mut rng).unwrap();
            schedule.apply_shift_move(&mv).unwrap();
        }
        assert!(plan.verify_shadows().is_ok());
    }

    #[test]
    fn test_demo_data_from_str() {
        assert_eq!("small".parse::<DemoData>(), Ok(DemoData::Small));
        assert_eq!("LARGE".parse::<DemoData>(), Ok(DemoData::Large));
        assert!("huge".parse::<DemoData>().is_err());
        assert_eq!(DemoData::Large.as_str(), "LARGE");
    }
}
