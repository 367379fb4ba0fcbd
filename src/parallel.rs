//! Parallel evaluation of candidate moves.
//!
//! Every rayon worker scores candidates on its own clone of the director.
//! Clones share the constraint set and the travel time cache through `Arc`
//! and own everything else, so workers never observe each other's edits.

use rayon::prelude::*;
use tracing::debug;

use crate::director::{PlanningSolution, ScoreDirector};
use crate::error::{PlanningError, Result};
use crate::score::HardSoftScore;

/// Scores every candidate against the director's current state.
///
/// Results are in candidate order. The director itself is not modified.
pub fn evaluate_candidates<S>(director: &ScoreDirector<S>, candidates: &[S::Move]) -> Vec<Result<HardSoftScore>>
where
    S: PlanningSolution,
{
    candidates
        .par_iter()
        .map_init(|| director.clone(), |worker, mv| worker.evaluate_move(mv))
        .collect()
}

/// Index and score of the best candidate, or `None` if no candidate applies.
///
/// Candidates rejected with [`PlanningError::InvalidMove`] are skipped; any
/// other error is returned. Ties go to the lowest index.
pub fn best_candidate<S>(director: &ScoreDirector<S>, candidates: &[S::Move]) -> Result<Option<(usize, HardSoftScore)>>
where
    S: PlanningSolution,
{
    let mut best: Option<(usize, HardSoftScore)> = None;
    for (index, result) in evaluate_candidates(director, candidates).into_iter().enumerate() {
        let score = match result {
            Ok(score) => score,
            Err(PlanningError::InvalidMove(reason)) => {
                debug!(index, %reason, "Candidate skipped");
                continue;
            }
            Err(err) => return Err(err),
        };
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((index, score));
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::config::PlanningConfig;
    use crate::routing::{define_constraints, Location, RouteMove, Vehicle, VehicleRoutePlan, Visit};

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    /// Depot at the origin, a near and a far customer, both unassigned.
    fn director() -> ScoreDirector<VehicleRoutePlan> {
        let locations = vec![
            Location::new(0, 0.0, 0.0),
            Location::new(1, 0.0, 0.01),
            Location::new(2, 0.0, 0.5),
        ];
        let visits = vec![
            Visit::new("near", "Near", locations[1].clone()),
            Visit::new("far", "Far", locations[2].clone()),
        ];
        let vehicles = vec![Vehicle::new("v", "V", 10, locations[0].clone(), at(8))];
        let mut plan = VehicleRoutePlan::new("p", locations, visits, vehicles);
        plan.finalize().unwrap();
        ScoreDirector::new(plan, Arc::new(define_constraints(&PlanningConfig::default()))).unwrap()
    }

    #[test]
    fn test_evaluate_candidates_keeps_director_intact() {
        let director = director();
        let before = director.score();
        let candidates = vec![
            RouteMove::Assign { visit: 0, vehicle: 0, position: 0 },
            RouteMove::Assign { visit: 1, vehicle: 0, position: 0 },
            RouteMove::Unassign { visit: 0 },
        ];
        let results = evaluate_candidates(&director, &candidates);

        assert_eq!(results.len(), 3);
        assert!(results[0].as_ref().unwrap() > results[1].as_ref().unwrap());
        assert!(matches!(results[2], Err(PlanningError::InvalidMove(_))));
        assert_eq!(director.score(), before);
        assert_eq!(director.working_solution().assigned_visit_count(), 0);
    }

    #[test]
    fn test_best_candidate_prefers_shorter_drive() {
        let director = director();
        let candidates = vec![
            RouteMove::Unassign { visit: 1 },
            RouteMove::Assign { visit: 1, vehicle: 0, position: 0 },
            RouteMove::Assign { visit: 0, vehicle: 0, position: 0 },
        ];
        let (index, score) = best_candidate(&director, &candidates).unwrap().unwrap();
        assert_eq!(index, 2);
        assert_eq!(score, director.clone().evaluate_move(&candidates[2]).unwrap());
    }

    #[test]
    fn test_best_candidate_of_nothing() {
        let director = director();
        assert_eq!(best_candidate(&director, &[]).unwrap(), None);
        assert_eq!(
            best_candidate(&director, &[RouteMove::Unassign { visit: 0 }]).unwrap(),
            None
        );
    }
}
