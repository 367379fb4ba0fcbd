//! Domain model for employee scheduling.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::state::ScheduleState;
use crate::error::{PlanningError, Result};
use crate::score::HardSoftScore;

/// An employee who can be assigned to shifts.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use planning_core::scheduling::Employee;
///
/// let day = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
/// let amy = Employee::new(0, "Amy Cole")
///     .with_skills(["Doctor", "Cardiology"])
///     .with_unavailable_dates([day]);
///
/// assert!(amy.skills.contains("Doctor"));
/// assert!(amy.unavailable_dates.contains(&day));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Employee {
    /// Index in `EmployeeSchedule::employees`.
    pub index: usize,
    pub name: String,
    pub skills: HashSet<String>,
    pub unavailable_dates: HashSet<NaiveDate>,
    pub undesired_dates: HashSet<NaiveDate>,
    pub desired_dates: HashSet<NaiveDate>,
}

impl Employee {
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            skills: HashSet::new(),
            unavailable_dates: HashSet::new(),
            undesired_dates: HashSet::new(),
            desired_dates: HashSet::new(),
        }
    }

    pub fn with_skills(mut self, skills: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.skills.extend(skills.into_iter().map(Into::into));
        self
    }

    pub fn with_unavailable_dates(mut self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.unavailable_dates.extend(dates);
        self
    }

    pub fn with_undesired_dates(mut self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.undesired_dates.extend(dates);
        self
    }

    pub fn with_desired_dates(mut self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.desired_dates.extend(dates);
        self
    }

    /// The kind of the date set holding `date`, if any.
    pub fn availability_on(&self, date: NaiveDate) -> Option<AvailabilityType> {
        [
            (AvailabilityType::Unavailable, &self.unavailable_dates),
            (AvailabilityType::Undesired, &self.undesired_dates),
            (AvailabilityType::Desired, &self.desired_dates),
        ]
        .into_iter()
        .find_map(|(kind, dates)| dates.contains(&date).then_some(kind))
    }

    /// A date present in more than one of the three date sets.
    fn conflicting_date(&self) -> Option<NaiveDate> {
        self.unavailable_dates
            .iter()
            .filter(|&d| self.undesired_dates.contains(d) || self.desired_dates.contains(d))
            .chain(self.undesired_dates.iter().filter(|&d| self.desired_dates.contains(d)))
            .min()
            .copied()
    }

    fn dates_mut(&mut self, kind: AvailabilityType) -> &mut HashSet<NaiveDate> {
        match kind {
            AvailabilityType::Desired => &mut self.desired_dates,
            AvailabilityType::Undesired => &mut self.undesired_dates,
            AvailabilityType::Unavailable => &mut self.unavailable_dates,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvailabilityType {
    Desired,
    Undesired,
    Unavailable,
}

/// One employee's stated availability for a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub id: String,
    /// Employee name.
    pub employee: String,
    pub date: NaiveDate,
    pub availability_type: AvailabilityType,
}

/// A shift that needs to be staffed by an employee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shift {
    pub id: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub location: String,
    pub required_skill: String,
    /// Planning variable; written through moves.
    pub(super) employee_idx: Option<usize>,
}

impl Shift {
    pub fn new(
        id: impl Into<String>,
        start: NaiveDateTime,
        end: NaiveDateTime,
        location: impl Into<String>,
        required_skill: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            start,
            end,
            location: location.into(),
            required_skill: required_skill.into(),
            employee_idx: None,
        }
    }

    /// Sets the initial assignment, validated by [`EmployeeSchedule::finalize`].
    pub fn with_employee(mut self, employee_idx: usize) -> Self {
        self.employee_idx = Some(employee_idx);
        self
    }

    #[inline]
    pub fn employee_idx(&self) -> Option<usize> {
        self.employee_idx
    }

    /// Returns the date of the shift start.
    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Which shifts moves may not reassign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PinningPolicy {
    /// Every shift is movable.
    #[default]
    Disabled,
    /// Shifts starting in the historic or published window are pinned.
    PinNonDraft,
}

/// The employee scheduling solution.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use planning_core::scheduling::{Employee, EmployeeSchedule, Shift};
///
/// let day = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
/// let employees = vec![Employee::new(0, "Amy").with_skills(["Nurse"])];
/// let shifts = vec![
///     Shift::new("1", day.and_hms_opt(6, 0, 0).unwrap(), day.and_hms_opt(14, 0, 0).unwrap(), "Ward", "Nurse")
///         .with_employee(0),
///     Shift::new("2", day.and_hms_opt(14, 0, 0).unwrap(), day.and_hms_opt(22, 0, 0).unwrap(), "Ward", "Nurse"),
/// ];
///
/// let mut schedule = EmployeeSchedule::new(employees, shifts);
/// schedule.finalize().unwrap();
///
/// assert_eq!(schedule.shifts_of(0), &[0]);
/// assert_eq!(schedule.unassigned_shift_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct EmployeeSchedule {
    pub(super) employees: Vec<Employee>,
    pub(super) shifts: Vec<Shift>,
    pub(super) schedule_state: Option<ScheduleState>,
    pub(super) pinning: PinningPolicy,
    pub(super) score: Option<HardSoftScore>,

    // =========================================================================
    // Shadow index
    // =========================================================================
    /// Assigned shift indices per employee, ascending.
    pub(super) shifts_by_employee: Vec<Vec<usize>>,
    shift_ids: HashMap<String, usize>,
}

impl EmployeeSchedule {
    pub fn new(employees: Vec<Employee>, shifts: Vec<Shift>) -> Self {
        Self {
            employees,
            shifts,
            schedule_state: None,
            pinning: PinningPolicy::Disabled,
            score: None,
            shifts_by_employee: Vec::new(),
            shift_ids: HashMap::new(),
        }
    }

    pub fn with_schedule_state(mut self, state: ScheduleState) -> Self {
        self.schedule_state = Some(state);
        self
    }

    pub fn with_pinning(mut self, pinning: PinningPolicy) -> Self {
        self.pinning = pinning;
        self
    }

    /// Folds availabilities into the named employees' date sets.
    pub fn apply_availabilities(&mut self, availabilities: &[Availability]) -> Result<()> {
        let by_name: HashMap<&str, usize> = self
            .employees
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.as_str(), i))
            .collect();
        let mut resolved: HashMap<(usize, NaiveDate), AvailabilityType> = HashMap::new();
        for availability in availabilities {
            let idx = by_name.get(availability.employee.as_str()).copied().ok_or_else(|| {
                PlanningError::InvalidProblem(format!(
                    "availability {} names unknown employee {}",
                    availability.id, availability.employee
                ))
            })?;
            let kind = availability.availability_type;
            let existing = resolved
                .get(&(idx, availability.date))
                .copied()
                .or_else(|| self.employees[idx].availability_on(availability.date));
            if let Some(existing) = existing.filter(|&existing| existing != kind) {
                return Err(PlanningError::InvalidProblem(format!(
                    "availability {} marks {} {:?} on {} already marked {:?}",
                    availability.id, availability.employee, kind, availability.date, existing
                )));
            }
            resolved.insert((idx, availability.date), kind);
        }
        for ((idx, date), kind) in resolved {
            self.employees[idx].dates_mut(kind).insert(date);
        }
        Ok(())
    }

    /// Validates the problem and builds the employee to shifts index.
    pub fn finalize(&mut self) -> Result<()> {
        let invalid = |msg: String| Err(PlanningError::InvalidProblem(msg));

        let mut names = HashSet::new();
        for (pos, employee) in self.employees.iter().enumerate() {
            if employee.index != pos {
                return invalid(format!(
                    "employee {} at position {} has index {}",
                    employee.name, pos, employee.index
                ));
            }
            if !names.insert(employee.name.as_str()) {
                return invalid(format!("duplicate employee name {}", employee.name));
            }
            if let Some(date) = employee.conflicting_date() {
                return invalid(format!("employee {} has conflicting availability on {}", employee.name, date));
            }
        }

        let mut shift_ids = HashMap::with_capacity(self.shifts.len());
        for (pos, shift) in self.shifts.iter().enumerate() {
            if shift_ids.insert(shift.id.clone(), pos).is_some() {
                return invalid(format!("duplicate shift id {}", shift.id));
            }
            if shift.end <= shift.start {
                return invalid(format!("shift {} does not end after it starts", shift.id));
            }
            if let Some(e) = shift.employee_idx {
                if e >= self.employees.len() {
                    return invalid(format!("shift {} assigned to unknown employee index {}", shift.id, e));
                }
            }
        }

        let mut shifts_by_employee = vec![Vec::new(); self.employees.len()];
        for (pos, shift) in self.shifts.iter().enumerate() {
            if let Some(e) = shift.employee_idx {
                shifts_by_employee[e].push(pos);
            }
        }
        self.shifts_by_employee = shifts_by_employee;
        self.shift_ids = shift_ids;

        info!(
            employees = self.employees.len(),
            shifts = self.shifts.len(),
            unassigned = self.unassigned_shift_count(),
            pinning = ?self.pinning,
            "Schedule finalized"
        );
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn employees(&self) -> &[Employee] {
        &self.employees
    }

    pub fn shifts(&self) -> &[Shift] {
        &self.shifts
    }

    #[inline]
    pub fn employee(&self, idx: usize) -> Option<&Employee> {
        self.employees.get(idx)
    }

    #[inline]
    pub fn shift(&self, idx: usize) -> Option<&Shift> {
        self.shifts.get(idx)
    }

    /// Index of the shift with the given id. Populated by `finalize`.
    pub fn shift_index(&self, id: &str) -> Option<usize> {
        self.shift_ids.get(id).copied()
    }

    pub fn employee_index(&self, name: &str) -> Option<usize> {
        self.employees.iter().position(|e| e.name == name)
    }

    /// Shifts assigned to an employee, ascending by shift index.
    pub fn shifts_of(&self, employee_idx: usize) -> &[usize] {
        self.shifts_by_employee
            .get(employee_idx)
            .map_or(&[], Vec::as_slice)
    }

    pub fn schedule_state(&self) -> Option<&ScheduleState> {
        self.schedule_state.as_ref()
    }

    pub fn pinning(&self) -> PinningPolicy {
        self.pinning
    }

    pub fn score(&self) -> Option<HardSoftScore> {
        self.score
    }

    pub fn unassigned_shift_count(&self) -> usize {
        self.shifts.iter().filter(|s| s.employee_idx.is_none()).count()
    }

    /// True if the pinning policy forbids reassigning the shift.
    pub fn is_pinned(&self, shift_idx: usize) -> bool {
        match (self.pinning, &self.schedule_state, self.shifts.get(shift_idx)) {
            (PinningPolicy::PinNonDraft, Some(state), Some(shift)) => !state.is_draft(shift.start),
            _ => false,
        }
    }

    /// Moves a shift between employee index entries.
    pub(super) fn reassign(&mut self, shift_idx: usize, employee_idx: Option<usize>) {
        if let Some(old) = self.shifts[shift_idx].employee_idx {
            let list = &mut self.shifts_by_employee[old];
            if let Ok(pos) = list.binary_search(&shift_idx) {
                list.remove(pos);
            }
        }
        if let Some(new) = employee_idx {
            let list = &mut self.shifts_by_employee[new];
            if let Err(pos) = list.binary_search(&shift_idx) {
                list.insert(pos, shift_idx);
            }
        }
        self.shifts[shift_idx].employee_idx = employee_idx;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn schedule() -> EmployeeSchedule {
        let employees = vec![Employee::new(0, "Amy"), Employee::new(1, "Beth")];
        let shifts = vec![
            Shift::new("a", at(6, 6), at(6, 14), "Ward", "Nurse").with_employee(1),
            Shift::new("b", at(7, 6), at(7, 14), "Ward", "Nurse"),
            Shift::new("c", at(8, 6), at(8, 14), "Ward", "Nurse").with_employee(1),
        ];
        EmployeeSchedule::new(employees, shifts)
    }

    #[test]
    fn test_finalize_builds_inverse_index() {
        let mut schedule = schedule();
        schedule.finalize().unwrap();
        assert!(schedule.shifts_of(0).is_empty());
        assert_eq!(schedule.shifts_of(1), &[0, 2]);
        assert_eq!(schedule.shifts_of(9), &[] as &[usize]);
        assert_eq!(schedule.shift_index("c"), Some(2));
    }

    #[test]
    fn test_finalize_rejects_malformed_problems() {
        let mut bad = schedule();
        bad.shifts.push(Shift::new("a", at(9, 6), at(9, 14), "Ward", "Nurse"));
        assert!(matches!(bad.finalize(), Err(PlanningError::InvalidProblem(_))));

        let mut bad = schedule();
        bad.shifts[1].employee_idx = Some(5);
        assert!(bad.finalize().is_err());

        let mut bad = schedule();
        bad.shifts[1].end = at(6, 0);
        assert!(bad.finalize().is_err());
    }

    #[test]
    fn test_finalize_rejects_zero_length_shift() {
        let mut bad = schedule();
        bad.shifts[1].end = bad.shifts[1].start;
        assert!(matches!(bad.finalize(), Err(PlanningError::InvalidProblem(_))));
    }

    #[test]
    fn test_finalize_rejects_overlapping_date_sets() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        let mut bad = schedule();
        bad.employees[1] = Employee::new(1, "Beth")
            .with_desired_dates([day])
            .with_undesired_dates([day]);
        assert!(matches!(bad.finalize(), Err(PlanningError::InvalidProblem(_))));

        let mut fine = schedule();
        fine.employees[1] = Employee::new(1, "Beth")
            .with_desired_dates([day])
            .with_undesired_dates([day.succ_opt().unwrap()]);
        fine.finalize().unwrap();
        assert_eq!(fine.employees()[1].availability_on(day), Some(AvailabilityType::Desired));
    }

    #[test]
    fn test_reassign_keeps_index_sorted() {
        let mut schedule = schedule();
        schedule.finalize().unwrap();
        schedule.reassign(1, Some(1));
        assert_eq!(schedule.shifts_of(1), &[0, 1, 2]);
        schedule.reassign(0, Some(0));
        assert_eq!(schedule.shifts_of(0), &[0]);
        assert_eq!(schedule.shifts_of(1), &[1, 2]);
        schedule.reassign(2, None);
        assert_eq!(schedule.shifts_of(1), &[1]);
        assert_eq!(schedule.unassigned_shift_count(), 1);
    }

    #[test]
    fn test_apply_availabilities() {
        let mut schedule = schedule();
        let day = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        let availabilities = vec![
            Availability {
                id: "1".to_string(),
                employee: "Amy".to_string(),
                date: day,
                availability_type: AvailabilityType::Unavailable,
            },
            Availability {
                id: "2".to_string(),
                employee: "Beth".to_string(),
                date: day,
                availability_type: AvailabilityType::Desired,
            },
        ];
        schedule.apply_availabilities(&availabilities).unwrap();
        assert!(schedule.employees()[0].unavailable_dates.contains(&day));
        assert!(schedule.employees()[1].desired_dates.contains(&day));

        let unknown = vec![Availability {
            employee: "Zed".to_string(),
            ..availabilities[0].clone()
        }];
        assert!(matches!(
            schedule.apply_availabilities(&unknown),
            Err(PlanningError::InvalidProblem(_))
        ));

        // Repeating a marking is harmless
        schedule.apply_availabilities(&availabilities[..1]).unwrap();

        let undesired = vec![Availability {
            id: "3".to_string(),
            availability_type: AvailabilityType::Undesired,
            ..availabilities[0].clone()
        }];
        assert!(matches!(
            schedule.apply_availabilities(&undesired),
            Err(PlanningError::InvalidProblem(_))
        ));
        assert!(schedule.employees()[0].undesired_dates.is_empty());

        let mut fresh = self::schedule();
        let contradictory = vec![
            availabilities[1].clone(),
            Availability {
                id: "4".to_string(),
                availability_type: AvailabilityType::Unavailable,
                ..availabilities[1].clone()
            },
        ];
        assert!(fresh.apply_availabilities(&contradictory).is_err());
        assert!(fresh.employees()[1].desired_dates.is_empty());
    }

    #[test]
    fn test_pinning_policy() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 5, day).unwrap();
        let mut schedule = schedule()
            .with_schedule_state(ScheduleState::new("t", d(6), d(8)))
            .with_pinning(PinningPolicy::PinNonDraft);
        schedule.finalize().unwrap();
        assert!(schedule.is_pinned(0)); // historic
        assert!(schedule.is_pinned(1)); // published
        assert!(!schedule.is_pinned(2)); // draft

        let unpinned = schedule.clone().with_pinning(PinningPolicy::Disabled);
        assert!(!unpinned.is_pinned(0));
    }
}
