//! Planning Core
//!
//! Incremental scoring core for vehicle routing and employee scheduling.
//! Moves edit the working solution, shadow fields are recomputed around the
//! edit, and the score director rescores only the resources a move touched.
//!
//! # Building Blocks
//!
//! - [`HardSoftScore`](score::HardSoftScore): Lexicographic hard/soft score
//! - [`Constraint`](constraint::Constraint): Named, weighted evaluator per resource group
//! - [`ScoreDirector`](director::ScoreDirector): Cached incremental score with explain
//! - [`SolutionStore`](store::SolutionStore): Working solutions keyed by problem id
//!
//! # Domains
//!
//! - [`routing`]: Visits on vehicle routes with arrival time propagation
//! - [`scheduling`]: Shifts assigned to employees with schedule windows

pub mod analysis;
pub mod config;
pub mod console;
pub mod constraint;
pub mod demo_data;
pub mod director;
pub mod error;
pub mod parallel;
pub mod routing;
pub mod scheduling;
pub mod score;
pub mod store;
