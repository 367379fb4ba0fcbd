//! Serializable views of a route plan.
//!
//! Derived fields of unassigned visits are omitted rather than written as
//! sentinel values.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::domain::{Vehicle, VehicleRoutePlan, Visit};
use super::location::Location;
use crate::error::{PlanningError, Result};
use crate::score::HardSoftScore;

/// `[latitude, longitude]`.
pub type Coord = [f64; 2];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitDto {
    pub id: String,
    pub name: String,
    pub location: Coord,
    pub demand: i32,
    pub min_start_time: NaiveDateTime,
    pub max_end_time: NaiveDateTime,
    /// Seconds.
    pub service_duration: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_time: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_service_time: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_time: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driving_time_seconds_from_previous_standstill: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDto {
    pub id: String,
    pub name: String,
    pub capacity: i32,
    pub home_location: Coord,
    pub departure_time: NaiveDateTime,
    /// Visit ids in route order.
    #[serde(default)]
    pub visits: Vec<String>,
    #[serde(default)]
    pub total_demand: i32,
    #[serde(default)]
    pub total_driving_time_seconds: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_time: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRoutePlanDto {
    pub name: String,
    #[serde(default)]
    pub south_west_corner: Coord,
    #[serde(default)]
    pub north_east_corner: Coord,
    pub vehicles: Vec<VehicleDto>,
    pub visits: Vec<VisitDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<String>,
    #[serde(default)]
    pub total_driving_time_seconds: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date_time: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date_time: Option<NaiveDateTime>,
}

fn coord(location: &Location) -> Coord {
    [location.latitude, location.longitude]
}

impl VisitDto {
    fn from_visit(plan: &VehicleRoutePlan, idx: usize, visit: &Visit) -> Self {
        Self {
            id: visit.id.clone(),
            name: visit.name.clone(),
            location: coord(&visit.location),
            demand: visit.demand,
            min_start_time: visit.min_start_time,
            max_end_time: visit.max_end_time,
            service_duration: visit.service_duration,
            vehicle: visit
                .vehicle_idx()
                .and_then(|v| plan.vehicle(v))
                .map(|v| v.id.clone()),
            arrival_time: visit.arrival_time(),
            start_service_time: visit.start_service_time(),
            departure_time: visit.departure_time(),
            driving_time_seconds_from_previous_standstill: plan.travel_time_from_previous(idx).ok(),
        }
    }
}

impl VehicleDto {
    fn from_vehicle(plan: &VehicleRoutePlan, idx: usize, vehicle: &Vehicle) -> Self {
        Self {
            id: vehicle.id.clone(),
            name: vehicle.name.clone(),
            capacity: vehicle.capacity,
            home_location: coord(&vehicle.home_location),
            departure_time: vehicle.departure_time,
            visits: vehicle
                .visits()
                .iter()
                .map(|&v| plan.visits()[v].id.clone())
                .collect(),
            total_demand: vehicle.total_demand(),
            total_driving_time_seconds: vehicle.total_travel_time(),
            arrival_time: plan.vehicle_arrival_time(idx).ok(),
        }
    }
}

impl VehicleRoutePlanDto {
    pub fn from_plan(plan: &VehicleRoutePlan) -> Self {
        let vehicles: Vec<VehicleDto> = plan
            .vehicles()
            .iter()
            .enumerate()
            .map(|(i, v)| VehicleDto::from_vehicle(plan, i, v))
            .collect();
        let visits = plan
            .visits()
            .iter()
            .enumerate()
            .map(|(i, v)| VisitDto::from_visit(plan, i, v))
            .collect();

        Self {
            name: plan.name.clone(),
            south_west_corner: plan.south_west_corner,
            north_east_corner: plan.north_east_corner,
            start_date_time: plan.vehicles().iter().map(|v| v.departure_time).min(),
            end_date_time: vehicles.iter().filter_map(|v| v.arrival_time).max(),
            vehicles,
            visits,
            score: plan.score().map(|s| s.to_string()),
            total_driving_time_seconds: plan.total_travel_time(),
        }
    }

    /// Builds and finalizes a plan. Locations with identical coordinates
    /// share one location index.
    pub fn to_domain(&self, average_speed_kmph: f64) -> Result<VehicleRoutePlan> {
        let mut locations: Vec<Location> = Vec::new();
        let mut by_coord: HashMap<(u64, u64), usize> = HashMap::new();
        let mut location_of = |c: Coord| -> Location {
            let key = (c[0].to_bits(), c[1].to_bits());
            let index = *by_coord.entry(key).or_insert_with(|| {
                locations.push(Location::new(locations.len(), c[0], c[1]));
                locations.len() - 1
            });
            locations[index].clone()
        };

        let visits: Vec<Visit> = self
            .visits
            .iter()
            .map(|dto| {
                Visit::new(dto.id.clone(), dto.name.clone(), location_of(dto.location))
                    .with_demand(dto.demand)
                    .with_time_window(dto.min_start_time, dto.max_end_time)
                    .with_service_duration(dto.service_duration)
            })
            .collect();
        let visit_ids: HashMap<&str, usize> = self
            .visits
            .iter()
            .enumerate()
            .map(|(i, v)| (v.id.as_str(), i))
            .collect();

        let vehicles = self
            .vehicles
            .iter()
            .map(|dto| -> Result<Vehicle> {
                let route = dto
                    .visits
                    .iter()
                    .map(|id| {
                        visit_ids.get(id.as_str()).copied().ok_or_else(|| {
                            PlanningError::InvalidProblem(format!(
                                "vehicle {} routes unknown visit {}",
                                dto.id, id
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Vehicle::new(
                    dto.id.clone(),
                    dto.name.clone(),
                    dto.capacity,
                    location_of(dto.home_location),
                    dto.departure_time,
                )
                .with_visits(route))
            })
            .collect::<Result<Vec<_>>>()?;

        let score = self.score.as_deref().map(HardSoftScore::parse).transpose()?;

        let mut plan = VehicleRoutePlan::new(self.name.clone(), locations, visits, vehicles)
            .with_average_speed(average_speed_kmph);
        plan.finalize()?;
        plan.score = score;
        Ok(plan)
    }
}
