//! Vehicle routing: visits sequenced on vehicle routes.

pub mod constraints;
pub mod domain;
pub mod dto;
pub mod location;
pub mod moves;
mod shadow;

pub use constraints::define_constraints;
pub use domain::{Vehicle, VehicleRoutePlan, Visit};
pub use dto::{VehicleDto, VehicleRoutePlanDto, VisitDto};
pub use location::{Location, TravelTimeCache};
pub use moves::RouteMove;
