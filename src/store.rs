//! Keyed store of working solutions.
//!
//! Each entry is a score director behind its own lock, so callers working on
//! different problems never contend beyond the brief map lookup.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::director::{PlanningSolution, ScoreDirector};
use crate::error::{PlanningError, Result};
use crate::score::HardSoftScore;

/// Shared handle to one stored director.
pub type DirectorHandle<S> = Arc<RwLock<ScoreDirector<S>>>;

/// Problems keyed by id, each with its own score director.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use planning_core::config::PlanningConfig;
/// use planning_core::director::ScoreDirector;
/// use planning_core::scheduling::{define_constraints, EmployeeSchedule};
/// use planning_core::store::SolutionStore;
///
/// let mut schedule = EmployeeSchedule::new(Vec::new(), Vec::new());
/// schedule.finalize().unwrap();
/// let constraints = Arc::new(define_constraints(&PlanningConfig::default()));
///
/// let store = SolutionStore::new();
/// let id = store.insert(ScoreDirector::new(schedule, constraints).unwrap());
///
/// assert_eq!(store.ids(), vec![id.clone()]);
/// assert!(store.score(&id).unwrap().is_feasible());
/// assert!(store.remove(&id).is_ok());
/// assert!(store.get(&id).is_err());
/// ```
pub struct SolutionStore<S: PlanningSolution> {
    entries: RwLock<HashMap<String, DirectorHandle<S>>>,
}

impl<S: PlanningSolution> SolutionStore<S> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Stores a director under a generated id and returns the id.
    pub fn insert(&self, director: ScoreDirector<S>) -> String {
        let id = Uuid::new_v4().to_string();
        self.insert_with_id(id.clone(), director);
        id
    }

    /// Stores a director under a caller-chosen id, replacing any previous entry.
    pub fn insert_with_id(&self, id: impl Into<String>, director: ScoreDirector<S>) {
        let id = id.into();
        let score = director.score();
        let replaced = self
            .entries
            .write()
            .insert(id.clone(), Arc::new(RwLock::new(director)))
            .is_some();
        info!(problem = %id, score = %score, replaced, "Problem stored");
    }

    pub fn get(&self, id: &str) -> Result<DirectorHandle<S>> {
        self.entries
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| PlanningError::UnknownProblem(id.to_string()))
    }

    /// Runs `f` with exclusive access to the problem's director.
    pub fn with_director<R>(&self, id: &str, f: impl FnOnce(&mut ScoreDirector<S>) -> R) -> Result<R> {
        let handle = self.get(id)?;
        let mut director = handle.write();
        Ok(f(&mut *director))
    }

    pub fn score(&self, id: &str) -> Result<HardSoftScore> {
        let handle = self.get(id)?;
        let score = handle.read().score();
        Ok(score)
    }

    pub fn remove(&self, id: &str) -> Result<DirectorHandle<S>> {
        let removed = self
            .entries
            .write()
            .remove(id)
            .ok_or_else(|| PlanningError::UnknownProblem(id.to_string()))?;
        info!(problem = %id, "Problem removed");
        Ok(removed)
    }

    /// Stored ids in ascending order.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.read().keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<S: PlanningSolution> Default for SolutionStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::config::PlanningConfig;
    use crate::scheduling::{define_constraints, Employee, EmployeeSchedule, Shift, ShiftMove};

    fn director() -> ScoreDirector<EmployeeSchedule> {
        let day = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        let employees = vec![Employee::new(0, "Amy").with_skills(["Nurse"])];
        let shifts = vec![Shift::new(
            "1",
            day.and_hms_opt(6, 0, 0).unwrap(),
            day.and_hms_opt(14, 0, 0).unwrap(),
            "Ward",
            "Doctor",
        )];
        let mut schedule = EmployeeSchedule::new(employees, shifts);
        schedule.finalize().unwrap();
        ScoreDirector::new(schedule, Arc::new(define_constraints(&PlanningConfig::default()))).unwrap()
    }

    #[test]
    fn test_unknown_id() {
        let store: SolutionStore<EmployeeSchedule> = SolutionStore::new();
        assert!(matches!(store.get("nope"), Err(PlanningError::UnknownProblem(_))));
        assert!(matches!(store.remove("nope"), Err(PlanningError::UnknownProblem(_))));
        assert!(store.with_director("nope", |_| ()).is_err());
    }

    #[test]
    fn test_with_director_mutates_entry() {
        let store = SolutionStore::new();
        store.insert_with_id("clinic", director());
        assert_eq!(store.score("clinic").unwrap(), HardSoftScore::ZERO);

        let score = store
            .with_director("clinic", |director| {
                director.apply_move(&ShiftMove::Change { shift: 0, employee: Some(0) })?;
                Ok::<_, PlanningError>(director.score())
            })
            .unwrap()
            .unwrap();
        assert_eq!(score, HardSoftScore::of_hard(-1));
        assert_eq!(store.score("clinic").unwrap(), score);
    }

    #[test]
    fn test_entries_are_independent() {
        let store = SolutionStore::new();
        let a = store.insert(director());
        let b = store.insert(director());
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);

        store
            .with_director(&a, |d| d.apply_move(&ShiftMove::Change { shift: 0, employee: Some(0) }))
            .unwrap()
            .unwrap();
        assert_eq!(store.score(&a).unwrap(), HardSoftScore::of_hard(-1));
        assert_eq!(store.score(&b).unwrap(), HardSoftScore::ZERO);

        store.remove(&a).unwrap();
        assert_eq!(store.ids(), vec![b]);
    }
}
