//! Employee scheduling: shifts assigned to employees.

pub mod constraints;
pub mod domain;
pub mod dto;
pub mod moves;
pub mod state;

pub use constraints::define_constraints;
pub use domain::{Availability, AvailabilityType, Employee, EmployeeSchedule, PinningPolicy, Shift};
pub use dto::{EmployeeDto, ScheduleDto, ShiftDto};
pub use moves::ShiftMove;
pub use state::ScheduleState;
