//! Incremental score director.
//!
//! The director owns the working solution and caches the score of every
//! constraint per resource group. Applying a move re-evaluates only the
//! groups the move touched and adjusts the cached total by the difference,
//! so reading the score is O(1).

use std::sync::Arc;

use tracing::{debug, info};

use crate::analysis::ScoreExplanation;
use crate::constraint::ConstraintSet;
use crate::error::{PlanningError, Result};
use crate::score::HardSoftScore;

/// A solution whose structure can be edited through moves.
pub trait PlanningSolution: Clone + Send + Sync + 'static {
    /// Structural edit understood by this solution.
    type Move: Clone + std::fmt::Debug + Send + Sync;

    /// Number of resource groups constraints are evaluated over.
    fn group_count(&self) -> usize;

    /// Validates and applies a move, running shadow propagation.
    ///
    /// On error the solution must be unchanged.
    fn apply_move(&mut self, mv: &Self::Move) -> Result<AppliedMove<Self::Move>>;

    fn score(&self) -> Option<HardSoftScore>;

    fn set_score(&mut self, score: Option<HardSoftScore>);
}

/// Outcome of a successfully applied move.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedMove<M> {
    /// Groups whose constraint scores may have changed.
    pub touched_groups: Vec<usize>,
    /// Move restoring the previous state.
    pub undo: M,
}

impl<M> AppliedMove<M> {
    pub fn new(touched_groups: Vec<usize>, undo: M) -> Self {
        Self {
            touched_groups,
            undo,
        }
    }
}

/// Incremental score director over a [`PlanningSolution`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use planning_core::constraint::{Constraint, ConstraintSet};
/// use planning_core::director::{AppliedMove, PlanningSolution, ScoreDirector};
/// use planning_core::error::Result;
/// use planning_core::score::HardSoftScore;
///
/// // Each group holds a load; loads above 10 are penalized.
/// #[derive(Clone)]
/// struct Loads {
///     loads: Vec<i64>,
///     score: Option<HardSoftScore>,
/// }
///
/// impl PlanningSolution for Loads {
///     type Move = (usize, i64);
///
///     fn group_count(&self) -> usize {
///         self.loads.len()
///     }
///
///     fn apply_move(&mut self, &(group, load): &(usize, i64)) -> Result<AppliedMove<(usize, i64)>> {
///         let old = std::mem::replace(&mut self.loads[group], load);
///         Ok(AppliedMove::new(vec![group], (group, old)))
///     }
///
///     fn score(&self) -> Option<HardSoftScore> {
///         self.score
///     }
///
///     fn set_score(&mut self, score: Option<HardSoftScore>) {
///         self.score = score;
///     }
/// }
///
/// let constraints = ConstraintSet::new(vec![Constraint::penalize_hard(
///     "overload",
///     |s: &Loads, group, sink| {
///         sink.add(s.loads[group] - 10, || (Vec::new(), "overload".to_string()));
///         Ok(())
///     },
/// )]);
///
/// let solution = Loads { loads: vec![4, 12], score: None };
/// let mut director = ScoreDirector::new(solution, Arc::new(constraints)).unwrap();
/// assert_eq!(director.score(), HardSoftScore::of_hard(-2));
///
/// director.apply_move(&(0, 15)).unwrap();
/// assert_eq!(director.score(), HardSoftScore::of_hard(-7));
/// assert_eq!(director.calculate_score_from_scratch().unwrap(), director.score());
/// ```
pub struct ScoreDirector<S: PlanningSolution> {
    working_solution: S,
    constraints: Arc<ConstraintSet<S>>,
    /// Indexed by `[constraint][group]`.
    group_scores: Vec<Vec<HardSoftScore>>,
    constraint_totals: Vec<HardSoftScore>,
    cached_score: HardSoftScore,
    moves_applied: u64,
}

impl<S: PlanningSolution> Clone for ScoreDirector<S> {
    fn clone(&self) -> Self {
        Self {
            working_solution: self.working_solution.clone(),
            constraints: Arc::clone(&self.constraints),
            group_scores: self.group_scores.clone(),
            constraint_totals: self.constraint_totals.clone(),
            cached_score: self.cached_score,
            moves_applied: self.moves_applied,
        }
    }
}

impl<S: PlanningSolution> ScoreDirector<S> {
    /// Creates a director and calculates the initial score from scratch.
    pub fn new(solution: S, constraints: Arc<ConstraintSet<S>>) -> Result<Self> {
        let mut director = Self {
            working_solution: solution,
            constraints,
            group_scores: Vec::new(),
            constraint_totals: Vec::new(),
            cached_score: HardSoftScore::ZERO,
            moves_applied: 0,
        };
        director.initialize()?;
        info!(
            constraints = director.constraints.len(),
            groups = director.working_solution.group_count(),
            score = %director.cached_score,
            "Score director initialized"
        );
        Ok(director)
    }

    fn initialize(&mut self) -> Result<()> {
        let group_count = self.working_solution.group_count();
        let mut group_scores = Vec::with_capacity(self.constraints.len());
        let mut totals = Vec::with_capacity(self.constraints.len());

        for constraint in self.constraints.iter() {
            let scores = (0..group_count)
                .map(|group| constraint.evaluate(&self.working_solution, group))
                .collect::<Result<Vec<_>>>()?;
            totals.push(scores.iter().copied().sum());
            group_scores.push(scores);
        }

        self.cached_score = totals.iter().copied().sum();
        self.group_scores = group_scores;
        self.constraint_totals = totals;
        self.working_solution.set_score(Some(self.cached_score));
        Ok(())
    }

    /// Returns the cached score in O(1).
    pub fn score(&self) -> HardSoftScore {
        self.cached_score
    }

    pub fn is_feasible(&self) -> bool {
        self.cached_score.is_feasible()
    }

    /// Applies a move and incrementally updates the score.
    ///
    /// If the move is rejected, or if a touched group cannot be evaluated,
    /// the solution and the cached score are left as they were.
    pub fn apply_move(&mut self, mv: &S::Move) -> Result<AppliedMove<S::Move>> {
        let mut applied = match self.working_solution.apply_move(mv) {
            Ok(applied) => applied,
            Err(err) => {
                debug!(?mv, error = %err, "Move rejected");
                return Err(err);
            }
        };
        applied.touched_groups.sort_unstable();
        applied.touched_groups.dedup();

        let rescored = match self.rescore(&applied.touched_groups) {
            Ok(rescored) => rescored,
            Err(err) => {
                self.working_solution.apply_move(&applied.undo)?;
                return Err(err);
            }
        };

        for (c, group, score) in rescored {
            let old = std::mem::replace(&mut self.group_scores[c][group], score);
            let delta = score - old;
            self.constraint_totals[c] += delta;
            self.cached_score += delta;
        }

        self.moves_applied += 1;
        self.working_solution.set_score(Some(self.cached_score));
        debug!(?mv, touched = ?applied.touched_groups, score = %self.cached_score, "Move applied");
        Ok(applied)
    }

    /// Evaluates touched groups without committing anything.
    fn rescore(&self, groups: &[usize]) -> Result<Vec<(usize, usize, HardSoftScore)>> {
        let group_count = self.working_solution.group_count();
        let mut rescored = Vec::with_capacity(groups.len() * self.constraints.len());

        for (c, constraint) in self.constraints.iter().enumerate() {
            for &group in groups {
                if group >= group_count {
                    return Err(PlanningError::InvalidState(format!(
                        "move touched group {} but solution has {} groups",
                        group, group_count
                    )));
                }
                rescored.push((c, group, constraint.evaluate(&self.working_solution, group)?));
            }
        }
        Ok(rescored)
    }

    /// Scores a move by applying it, reading the score and undoing it.
    pub fn evaluate_move(&mut self, mv: &S::Move) -> Result<HardSoftScore> {
        let applied = self.apply_move(mv)?;
        let score = self.cached_score;
        self.apply_move(&applied.undo)?;
        self.moves_applied -= 2;
        Ok(score)
    }

    /// Recomputes the score over every group, bypassing the cache.
    pub fn calculate_score_from_scratch(&self) -> Result<HardSoftScore> {
        let group_count = self.working_solution.group_count();
        let mut total = HardSoftScore::ZERO;
        for constraint in self.constraints.iter() {
            for group in 0..group_count {
                total += constraint.evaluate(&self.working_solution, group)?;
            }
        }
        Ok(total)
    }

    /// Full per-constraint, per-match breakdown of the current score.
    pub fn explain(&self) -> Result<ScoreExplanation> {
        let group_count = self.working_solution.group_count();
        let analyses = self
            .constraints
            .iter()
            .map(|constraint| constraint.analyze(&self.working_solution, group_count))
            .collect::<Result<Vec<_>>>()?;
        let score = analyses.iter().map(|a| a.score).sum();
        Ok(ScoreExplanation::new(score, analyses))
    }

    /// Cached totals per constraint, in definition order.
    pub fn constraint_scores(&self) -> Vec<(&str, HardSoftScore)> {
        self.constraints
            .iter()
            .map(|c| c.name())
            .zip(self.constraint_totals.iter().copied())
            .collect()
    }

    pub fn working_solution(&self) -> &S {
        &self.working_solution
    }

    pub fn constraints(&self) -> &Arc<ConstraintSet<S>> {
        &self.constraints
    }

    /// Number of committed moves, excluding those made by [`Self::evaluate_move`].
    pub fn moves_applied(&self) -> u64 {
        self.moves_applied
    }

    pub fn into_solution(self) -> S {
        self.working_solution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::EntityRef;
    use crate::constraint::{Constraint, ImpactType};
    use crate::score::ScoreLevel;

    #[derive(Clone, Debug)]
    struct Bins {
        bins: Vec<Vec<i64>>,
        score: Option<HardSoftScore>,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum BinMove {
        Push { bin: usize, value: i64 },
        Pop { bin: usize },
    }

    impl PlanningSolution for Bins {
        type Move = BinMove;

        fn group_count(&self) -> usize {
            self.bins.len()
        }

        fn apply_move(&mut self, mv: &BinMove) -> Result<AppliedMove<BinMove>> {
            match *mv {
                BinMove::Push { bin, value } => {
                    let target = self
                        .bins
                        .get_mut(bin)
                        .ok_or_else(|| PlanningError::InvalidMove(format!("no bin {}", bin)))?;
                    target.push(value);
                    Ok(AppliedMove::new(vec![bin], BinMove::Pop { bin }))
                }
                BinMove::Pop { bin } => {
                    let value = self
                        .bins
                        .get_mut(bin)
                        .and_then(Vec::pop)
                        .ok_or_else(|| PlanningError::InvalidMove(format!("bin {} empty", bin)))?;
                    Ok(AppliedMove::new(vec![bin, bin], BinMove::Push { bin, value }))
                }
            }
        }

        fn score(&self) -> Option<HardSoftScore> {
            self.score
        }

        fn set_score(&mut self, score: Option<HardSoftScore>) {
            self.score = score;
        }
    }

    fn constraints() -> Arc<ConstraintSet<Bins>> {
        Arc::new(ConstraintSet::new(vec![
            Constraint::penalize_hard("capacity", |s: &Bins, bin, sink| {
                let total: i64 = s.bins[bin].iter().sum();
                sink.add(total - 10, || {
                    (vec![EntityRef::new("Bin", bin.to_string())], format!("bin {} holds {}", bin, total))
                });
                Ok(())
            }),
            Constraint::penalize_soft("itemCount", |s: &Bins, bin, sink| {
                sink.add(s.bins[bin].len() as i64, || (Vec::new(), String::new()));
                Ok(())
            }),
        ]))
    }

    fn director() -> ScoreDirector<Bins> {
        let bins = Bins {
            bins: vec![vec![4, 4], vec![9], Vec::new()],
            score: None,
        };
        ScoreDirector::new(bins, constraints()).unwrap()
    }

    #[test]
    fn test_initial_score() {
        let director = director();
        assert_eq!(director.score(), HardSoftScore::of(0, -3));
        assert_eq!(director.working_solution().score(), Some(director.score()));
    }

    #[test]
    fn test_incremental_matches_from_scratch() {
        let mut director = director();
        director.apply_move(&BinMove::Push { bin: 1, value: 5 }).unwrap();
        assert_eq!(director.score(), HardSoftScore::of(-4, -4));
        director.apply_move(&BinMove::Push { bin: 0, value: 7 }).unwrap();
        assert_eq!(director.score(), HardSoftScore::of(-9, -5));
        assert_eq!(director.calculate_score_from_scratch().unwrap(), director.score());
        assert_eq!(
            director.constraint_scores(),
            vec![("capacity", HardSoftScore::of_hard(-9)), ("itemCount", HardSoftScore::of_soft(-5))]
        );
        assert_eq!(director.moves_applied(), 2);
    }

    #[test]
    fn test_undo_restores_score() {
        let mut director = director();
        let before = director.score();
        let applied = director.apply_move(&BinMove::Push { bin: 2, value: 20 }).unwrap();
        assert_ne!(director.score(), before);
        director.apply_move(&applied.undo).unwrap();
        assert_eq!(director.score(), before);
    }

    #[test]
    fn test_evaluate_move_leaves_state_untouched() {
        let mut director = director();
        let before = director.score();
        let score = director.evaluate_move(&BinMove::Push { bin: 0, value: 5 }).unwrap();
        assert_eq!(score, HardSoftScore::of(-3, -4));
        assert_eq!(director.score(), before);
        assert_eq!(director.working_solution().bins[0], vec![4, 4]);
        assert_eq!(director.moves_applied(), 0);
    }

    #[test]
    fn test_rejected_move_keeps_score() {
        let mut director = director();
        let err = director.apply_move(&BinMove::Pop { bin: 2 }).unwrap_err();
        assert!(matches!(err, PlanningError::InvalidMove(_)));
        assert_eq!(director.score(), HardSoftScore::of(0, -3));
    }

    #[test]
    fn test_explain_matches_cached_score() {
        let mut director = director();
        director.apply_move(&BinMove::Push { bin: 1, value: 3 }).unwrap();
        let explanation = director.explain().unwrap();
        assert_eq!(explanation.score, director.score());
        let capacity = explanation.constraint("capacity").unwrap();
        assert_eq!(capacity.match_count(), 1);
        assert_eq!(capacity.matches[0].justification, "bin 1 holds 12");
    }

    #[test]
    fn test_hard_reward_is_not_feasible() {
        let bonus = Constraint::new("bonus", ScoreLevel::Hard, ImpactType::Reward, |s: &Bins, bin, sink| {
            sink.add(s.bins[bin].len() as i64, || (Vec::new(), String::new()));
            Ok(())
        });
        let bins = Bins {
            bins: vec![vec![1]],
            score: None,
        };
        let director = ScoreDirector::new(bins, Arc::new(ConstraintSet::new(vec![bonus]))).unwrap();
        assert_eq!(director.score(), HardSoftScore::of_hard(1));
        assert!(!director.is_feasible());
    }

    #[test]
    fn test_clones_are_independent() {
        let mut original = director();
        let clone = original.clone();
        original.apply_move(&BinMove::Push { bin: 0, value: 10 }).unwrap();
        assert_eq!(clone.score(), HardSoftScore::of(0, -3));
        assert_ne!(original.score(), clone.score());
    }
}
