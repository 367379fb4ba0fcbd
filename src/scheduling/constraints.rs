//! Constraint definitions for employee scheduling.
//!
//! Every constraint is grouped by employee and walks the employee's assigned
//! shifts through the inverse index, so a move only rescores the employees
//! it touched.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::analysis::EntityRef;
use crate::config::PlanningConfig;
use crate::constraint::{Constraint, ConstraintSet};

use super::domain::{EmployeeSchedule, Shift};

pub const MISSING_REQUIRED_SKILL: &str = "Missing required skill";
pub const OVERLAPPING_SHIFT: &str = "Overlapping shift";
pub const MIN_REST_BETWEEN_SHIFTS: &str = "At least 10 hours between 2 shifts";
pub const ONE_SHIFT_PER_DAY: &str = "Max one shift per day";
pub const UNAVAILABLE_EMPLOYEE: &str = "Unavailable employee";
pub const UNDESIRED_DAY: &str = "Undesired day for employee";
pub const DESIRED_DAY: &str = "Desired day for employee";

fn shift_ref(shift: &Shift) -> EntityRef {
    EntityRef::new("Shift", shift.id.as_str())
}

/// Calls `f` for every unordered pair of the employee's shifts.
fn for_each_pair<'a>(schedule: &'a EmployeeSchedule, employee: usize, mut f: impl FnMut(&'a Shift, &'a Shift)) {
    let assigned = schedule.shifts_of(employee);
    for (i, &a) in assigned.iter().enumerate() {
        for &b in &assigned[i + 1..] {
            f(&schedule.shifts[a], &schedule.shifts[b]);
        }
    }
}

/// Creates the constraint set for employee scheduling with configured weights.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use chrono::NaiveDate;
/// use planning_core::config::PlanningConfig;
/// use planning_core::director::ScoreDirector;
/// use planning_core::scheduling::{define_constraints, Employee, EmployeeSchedule, Shift};
/// use planning_core::score::HardSoftScore;
///
/// let day = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
/// let employees = vec![Employee::new(0, "Amy").with_skills(["Nurse"])];
/// let shifts = vec![Shift::new(
///     "1",
///     day.and_hms_opt(6, 0, 0).unwrap(),
///     day.and_hms_opt(14, 0, 0).unwrap(),
///     "Ward",
///     "Doctor",
/// )
/// .with_employee(0)];
///
/// let mut schedule = EmployeeSchedule::new(employees, shifts);
/// schedule.finalize().unwrap();
///
/// let constraints = Arc::new(define_constraints(&PlanningConfig::default()));
/// let director = ScoreDirector::new(schedule, constraints).unwrap();
/// assert_eq!(director.score(), HardSoftScore::of_hard(-1)); // Amy is no doctor
/// ```
pub fn define_constraints(config: &PlanningConfig) -> ConstraintSet<EmployeeSchedule> {
    let min_rest_minutes = config.scheduling.min_rest_minutes;

    // =========================================================================
    // HARD: Required Skill
    // =========================================================================
    let required_skill =
        Constraint::penalize_hard(MISSING_REQUIRED_SKILL, |schedule: &EmployeeSchedule, e, sink| {
            let employee = &schedule.employees[e];
            for &s in schedule.shifts_of(e) {
                let shift = &schedule.shifts[s];
                if employee.skills.contains(&shift.required_skill) {
                    continue;
                }
                sink.add(1, || {
                    (
                        vec![shift_ref(shift), EntityRef::new("Employee", employee.name.as_str())],
                        format!(
                            "{} lacks skill {} for shift {}",
                            employee.name, shift.required_skill, shift.id
                        ),
                    )
                });
            }
            Ok(())
        });

    // =========================================================================
    // HARD: No Overlapping Shifts
    // =========================================================================
    let no_overlap = Constraint::penalize_hard(OVERLAPPING_SHIFT, |schedule: &EmployeeSchedule, e, sink| {
        for_each_pair(schedule, e, |a, b| {
            let minutes = overlap_minutes(a, b);
            sink.add(minutes, || {
                (
                    vec![shift_ref(a), shift_ref(b)],
                    format!("Shifts {} and {} overlap by {} minutes", a.id, b.id, minutes),
                )
            });
        });
        Ok(())
    });

    // =========================================================================
    // HARD: Minimum Rest Between Shifts
    // =========================================================================
    let min_rest = Constraint::penalize_hard(
        MIN_REST_BETWEEN_SHIFTS,
        move |schedule: &EmployeeSchedule, e, sink| {
            for_each_pair(schedule, e, |a, b| {
                let shortfall = gap_penalty_minutes(a, b, min_rest_minutes);
                sink.add(shortfall, || {
                    (
                        vec![shift_ref(a), shift_ref(b)],
                        format!(
                            "Shifts {} and {} leave {} minutes less rest than {}",
                            a.id, b.id, shortfall, min_rest_minutes
                        ),
                    )
                });
            });
            Ok(())
        },
    );

    // =========================================================================
    // HARD: One Shift Per Day
    // =========================================================================
    let one_per_day = Constraint::penalize_hard(ONE_SHIFT_PER_DAY, |schedule: &EmployeeSchedule, e, sink| {
        for_each_pair(schedule, e, |a, b| {
            if a.date() != b.date() {
                return;
            }
            sink.add(1, || {
                (
                    vec![shift_ref(a), shift_ref(b)],
                    format!("Shifts {} and {} both start on {}", a.id, b.id, a.date()),
                )
            });
        });
        Ok(())
    });

    // =========================================================================
    // Availability: Unavailable, Undesired, Desired
    // =========================================================================
    let unavailable = Constraint::penalize_hard(UNAVAILABLE_EMPLOYEE, |schedule: &EmployeeSchedule, e, sink| {
        let employee = &schedule.employees[e];
        for &s in schedule.shifts_of(e) {
            let shift = &schedule.shifts[s];
            let minutes = dates_overlap_minutes(shift, &employee.unavailable_dates);
            sink.add(minutes, || {
                (
                    vec![shift_ref(shift), EntityRef::new("Employee", employee.name.as_str())],
                    format!("{} is unavailable for {} minutes of shift {}", employee.name, minutes, shift.id),
                )
            });
        }
        Ok(())
    });

    let undesired = Constraint::penalize_soft(UNDESIRED_DAY, |schedule: &EmployeeSchedule, e, sink| {
        let employee = &schedule.employees[e];
        for &s in schedule.shifts_of(e) {
            let shift = &schedule.shifts[s];
            let minutes = dates_overlap_minutes(shift, &employee.undesired_dates);
            sink.add(minutes, || {
                (
                    vec![shift_ref(shift), EntityRef::new("Employee", employee.name.as_str())],
                    format!("Shift {} falls on an undesired day of {}", shift.id, employee.name),
                )
            });
        }
        Ok(())
    });

    let desired = Constraint::reward_soft(DESIRED_DAY, |schedule: &EmployeeSchedule, e, sink| {
        let employee = &schedule.employees[e];
        for &s in schedule.shifts_of(e) {
            let shift = &schedule.shifts[s];
            let minutes = dates_overlap_minutes(shift, &employee.desired_dates);
            sink.add(minutes, || {
                (
                    vec![shift_ref(shift), EntityRef::new("Employee", employee.name.as_str())],
                    format!("Shift {} falls on a desired day of {}", shift.id, employee.name),
                )
            });
        }
        Ok(())
    });

    ConstraintSet::new(vec![
        required_skill,
        no_overlap,
        min_rest,
        one_per_day,
        unavailable,
        undesired,
        desired,
    ])
    .with_weights(&config.constraint_weights)
}

// ============================================================================
// Helper functions
// ============================================================================

/// Minutes during which both shifts run.
#[inline]
pub fn overlap_minutes(a: &Shift, b: &Shift) -> i64 {
    let start = a.start.max(b.start);
    let end = a.end.min(b.end);
    if start < end {
        (end - start).num_minutes()
    } else {
        0
    }
}

/// Minutes the rest between two non-overlapping shifts falls short of
/// `min_rest_minutes`.
///
/// Shifts have positive length, so at most one ordering of the pair has
/// `end <= start` of the other.
#[inline]
pub fn gap_penalty_minutes(a: &Shift, b: &Shift, min_rest_minutes: i64) -> i64 {
    let (earlier, later) = if a.end <= b.start {
        (a, b)
    } else if b.end <= a.start {
        (b, a)
    } else {
        return 0;
    };

    let gap = (later.start - earlier.end).num_minutes();
    if (0..min_rest_minutes).contains(&gap) {
        min_rest_minutes - gap
    } else {
        0
    }
}

/// Minutes of the shift falling on `date`.
#[inline]
pub fn shift_date_overlap_minutes(shift: &Shift, date: NaiveDate) -> i64 {
    let day_start = date.and_time(NaiveTime::MIN);
    let day_end = date
        .succ_opt()
        .map_or(NaiveDateTime::MAX, |next| next.and_time(NaiveTime::MIN));

    let start = shift.start.max(day_start);
    let end = shift.end.min(day_end);
    if start < end {
        (end - start).num_minutes()
    } else {
        0
    }
}

/// Minutes of the shift falling on any of `dates`.
///
/// Only the start date and the end date are considered, and the end date is
/// skipped when the shift ends exactly at midnight.
pub fn dates_overlap_minutes(shift: &Shift, dates: &HashSet<NaiveDate>) -> i64 {
    if dates.is_empty() {
        return 0;
    }
    let start_date = shift.start.date();
    let end_date = shift.end.date();

    let mut total = 0;
    if dates.contains(&start_date) {
        total += shift_date_overlap_minutes(shift, start_date);
    }
    if end_date != start_date && shift.end.time() != NaiveTime::MIN && dates.contains(&end_date) {
        total += shift_date_overlap_minutes(shift, end_date);
    }
    total
}
