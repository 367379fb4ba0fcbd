//! Assignment edits on shifts.

use std::fmt;

use super::domain::EmployeeSchedule;
use crate::director::{AppliedMove, PlanningSolution};
use crate::error::{PlanningError, Result};
use crate::score::HardSoftScore;

/// An edit to shift assignments. Indices refer to `shifts()` and `employees()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShiftMove {
    /// Assigns a shift to an employee, or unassigns it with `None`.
    Change { shift: usize, employee: Option<usize> },
    /// Exchanges the employees of two shifts.
    Swap { left: usize, right: usize },
}

impl fmt::Display for ShiftMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShiftMove::Change {
                shift,
                employee: Some(employee),
            } => write!(f, "assign shift {} to employee {}", shift, employee),
            ShiftMove::Change { shift, employee: None } => write!(f, "unassign shift {}", shift),
            ShiftMove::Swap { left, right } => write!(f, "swap shifts {} and {}", left, right),
        }
    }
}

impl EmployeeSchedule {
    fn check_shift(&self, shift: usize) -> Result<()> {
        let Some(s) = self.shifts.get(shift) else {
            return Err(PlanningError::InvalidMove(format!(
                "no shift at index {} ({} shifts)",
                shift,
                self.shifts.len()
            )));
        };
        if self.is_pinned(shift) {
            return Err(PlanningError::InvalidMove(format!("shift {} is pinned", s.id)));
        }
        Ok(())
    }

    fn check_employee(&self, employee: usize) -> Result<()> {
        if employee >= self.employees.len() {
            return Err(PlanningError::InvalidMove(format!(
                "no employee at index {} ({} employees)",
                employee,
                self.employees.len()
            )));
        }
        Ok(())
    }

    /// Validates and applies an assignment edit, returning its undo.
    ///
    /// Invalid moves fail with [`PlanningError::InvalidMove`] and leave the
    /// schedule untouched.
    pub fn apply_shift_move(&mut self, mv: &ShiftMove) -> Result<AppliedMove<ShiftMove>> {
        match *mv {
            ShiftMove::Change { shift, employee } => {
                self.check_shift(shift)?;
                if let Some(e) = employee {
                    self.check_employee(e)?;
                }
                let old = self.shifts[shift].employee_idx;
                if old == employee {
                    return Ok(AppliedMove::new(Vec::new(), *mv));
                }

                self.reassign(shift, employee);
                let touched = old.into_iter().chain(employee).collect();
                Ok(AppliedMove::new(touched, ShiftMove::Change { shift, employee: old }))
            }
            ShiftMove::Swap { left, right } => {
                self.check_shift(left)?;
                self.check_shift(right)?;
                let left_employee = self.shifts[left].employee_idx;
                let right_employee = self.shifts[right].employee_idx;
                if left_employee == right_employee {
                    return Ok(AppliedMove::new(Vec::new(), *mv));
                }

                self.reassign(left, right_employee);
                self.reassign(right, left_employee);
                let touched = left_employee.into_iter().chain(right_employee).collect();
                Ok(AppliedMove::new(touched, *mv))
            }
        }
    }
}

impl PlanningSolution for EmployeeSchedule {
    type Move = ShiftMove;

    fn group_count(&self) -> usize {
        self.employees.len()
    }

    fn apply_move(&mut self, mv: &ShiftMove) -> Result<AppliedMove<ShiftMove>> {
        self.apply_shift_move(mv)
    }

    fn score(&self) -> Option<HardSoftScore> {
        self.score
    }

    fn set_score(&mut self, score: Option<HardSoftScore>) {
        self.score = score;
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::scheduling::{Employee, PinningPolicy, ScheduleState, Shift};

    fn at(day: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn schedule() -> EmployeeSchedule {
        let employees = vec![Employee::new(0, "Amy"), Employee::new(1, "Beth")];
        let shifts = vec![
            Shift::new("a", at(6, 6), at(6, 14), "Ward", "Nurse").with_employee(0),
            Shift::new("b", at(7, 6), at(7, 14), "Ward", "Nurse"),
            Shift::new("c", at(8, 6), at(8, 14), "Ward", "Nurse").with_employee(1),
        ];
        let mut schedule = EmployeeSchedule::new(employees, shifts);
        schedule.finalize().unwrap();
        schedule
    }

    #[test]
    fn test_change_and_undo() {
        let mut schedule = schedule();
        let applied = schedule
            .apply_shift_move(&ShiftMove::Change { shift: 0, employee: Some(1) })
            .unwrap();
        assert_eq!(applied.touched_groups, vec![0, 1]);
        assert_eq!(schedule.shifts_of(1), &[0, 2]);
        assert!(schedule.shifts_of(0).is_empty());

        schedule.apply_shift_move(&applied.undo).unwrap();
        assert_eq!(schedule.shifts_of(0), &[0]);
        assert_eq!(schedule.shifts_of(1), &[2]);
    }

    #[test]
    fn test_assign_unassigned_touches_one_group() {
        let mut schedule = schedule();
        let applied = schedule
            .apply_shift_move(&ShiftMove::Change { shift: 1, employee: Some(0) })
            .unwrap();
        assert_eq!(applied.touched_groups, vec![0]);
        assert_eq!(applied.undo, ShiftMove::Change { shift: 1, employee: None });
    }

    #[test]
    fn test_identical_change_is_noop() {
        let mut schedule = schedule();
        let mv = ShiftMove::Change { shift: 0, employee: Some(0) };
        let applied = schedule.apply_shift_move(&mv).unwrap();
        assert!(applied.touched_groups.is_empty());
        assert_eq!(applied.undo, mv);
    }

    #[test]
    fn test_swap_is_its_own_undo() {
        let mut schedule = schedule();
        let mv = ShiftMove::Swap { left: 0, right: 2 };
        let applied = schedule.apply_shift_move(&mv).unwrap();
        assert_eq!(schedule.shifts()[0].employee_idx(), Some(1));
        assert_eq!(schedule.shifts()[2].employee_idx(), Some(0));
        schedule.apply_shift_move(&applied.undo).unwrap();
        assert_eq!(schedule.shifts()[0].employee_idx(), Some(0));
        assert_eq!(schedule.shifts()[2].employee_idx(), Some(1));
    }

    #[test]
    fn test_invalid_moves_leave_schedule_untouched() {
        let mut schedule = schedule();
        for mv in [
            ShiftMove::Change { shift: 9, employee: None },
            ShiftMove::Change { shift: 0, employee: Some(9) },
            ShiftMove::Swap { left: 0, right: 9 },
        ] {
            let err = schedule.apply_shift_move(&mv).unwrap_err();
            assert!(matches!(err, PlanningError::InvalidMove(_)), "{}", mv);
        }
        assert_eq!(schedule.shifts_of(0), &[0]);
        assert_eq!(schedule.shifts_of(1), &[2]);
    }

    #[test]
    fn test_pinned_shift_rejects_moves() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 5, day).unwrap();
        let mut schedule = schedule()
            .with_schedule_state(ScheduleState::new("t", d(6), d(8)))
            .with_pinning(PinningPolicy::PinNonDraft);

        let err = schedule
            .apply_shift_move(&ShiftMove::Change { shift: 0, employee: None })
            .unwrap_err();
        assert!(matches!(err, PlanningError::InvalidMove(_)));
        assert!(schedule
            .apply_shift_move(&ShiftMove::Change { shift: 2, employee: None })
            .is_ok());
    }
}
