//! Constraint definitions evaluated per resource group.
//!
//! A constraint is a pure function of `(solution, group)` that reports
//! matches into a [`MatchSink`]. Groups are the resources (vehicles or
//! employees) that own the movable units, which lets the score director
//! re-evaluate only the groups an edit touched.

use std::collections::HashMap;
use std::fmt;

use tracing::warn;

use crate::analysis::{ConstraintAnalysis, ConstraintMatch, EntityRef};
use crate::error::Result;
use crate::score::{HardSoftScore, ScoreLevel};

/// Whether a match lowers or raises the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImpactType {
    Penalty,
    Reward,
}

/// A match recorded in explain mode.
#[derive(Debug, Clone)]
pub struct RawMatch {
    pub magnitude: i64,
    pub entities: Vec<EntityRef>,
    pub justification: String,
}

/// Collects the matches of one constraint over one group.
///
/// In scoring mode only the summed magnitude is kept and justification
/// closures never run.
#[derive(Debug, Default)]
pub struct MatchSink {
    total: i64,
    count: usize,
    details: Option<Vec<RawMatch>>,
}

impl MatchSink {
    pub fn scoring() -> Self {
        Self::default()
    }

    pub fn explaining() -> Self {
        Self {
            details: Some(Vec::new()),
            ..Self::default()
        }
    }

    /// Records a match. Non-positive magnitudes are not matches.
    pub fn add<F>(&mut self, magnitude: i64, describe: F)
    where
        F: FnOnce() -> (Vec<EntityRef>, String),
    {
        if magnitude <= 0 {
            return;
        }
        self.total += magnitude;
        self.count += 1;
        if let Some(details) = self.details.as_mut() {
            let (entities, justification) = describe();
            details.push(RawMatch {
                magnitude,
                entities,
                justification,
            });
        }
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn into_matches(self) -> Vec<RawMatch> {
        self.details.unwrap_or_default()
    }
}

type Evaluator<S> = Box<dyn Fn(&S, usize, &mut MatchSink) -> Result<()> + Send + Sync>;

/// A named, weighted constraint.
pub struct Constraint<S> {
    name: String,
    level: ScoreLevel,
    impact: ImpactType,
    weight: i64,
    evaluator: Evaluator<S>,
}

impl<S> Constraint<S> {
    pub fn new<F>(name: impl Into<String>, level: ScoreLevel, impact: ImpactType, evaluator: F) -> Self
    where
        F: Fn(&S, usize, &mut MatchSink) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            level,
            impact,
            weight: 1,
            evaluator: Box::new(evaluator),
        }
    }

    pub fn penalize_hard<F>(name: impl Into<String>, evaluator: F) -> Self
    where
        F: Fn(&S, usize, &mut MatchSink) -> Result<()> + Send + Sync + 'static,
    {
        Self::new(name, ScoreLevel::Hard, ImpactType::Penalty, evaluator)
    }

    pub fn penalize_soft<F>(name: impl Into<String>, evaluator: F) -> Self
    where
        F: Fn(&S, usize, &mut MatchSink) -> Result<()> + Send + Sync + 'static,
    {
        Self::new(name, ScoreLevel::Soft, ImpactType::Penalty, evaluator)
    }

    pub fn reward_soft<F>(name: impl Into<String>, evaluator: F) -> Self
    where
        F: Fn(&S, usize, &mut MatchSink) -> Result<()> + Send + Sync + 'static,
    {
        Self::new(name, ScoreLevel::Soft, ImpactType::Reward, evaluator)
    }

    /// Sets the score units per magnitude unit. Zero disables the constraint.
    pub fn with_weight(mut self, weight: i64) -> Self {
        self.weight = weight;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> ScoreLevel {
        self.level
    }

    pub fn impact(&self) -> ImpactType {
        self.impact
    }

    pub fn weight(&self) -> i64 {
        self.weight
    }

    pub fn is_enabled(&self) -> bool {
        self.weight != 0
    }

    /// Signed score of a single magnitude unit.
    pub fn unit_score(&self) -> HardSoftScore {
        let signed = match self.impact {
            ImpactType::Penalty => -self.weight,
            ImpactType::Reward => self.weight,
        };
        HardSoftScore::of_level(self.level, signed)
    }

    /// Score of a summed magnitude.
    pub fn score_of(&self, magnitude: i64) -> HardSoftScore {
        self.unit_score().multiply(magnitude)
    }

    /// Evaluates one group in scoring mode.
    pub fn evaluate(&self, solution: &S, group: usize) -> Result<HardSoftScore> {
        if !self.is_enabled() {
            return Ok(HardSoftScore::ZERO);
        }
        let mut sink = MatchSink::scoring();
        (self.evaluator)(solution, group, &mut sink)?;
        Ok(self.score_of(sink.total()))
    }

    /// Evaluates every group in explain mode.
    pub fn analyze(&self, solution: &S, group_count: usize) -> Result<ConstraintAnalysis> {
        let mut matches = Vec::new();
        let mut score = HardSoftScore::ZERO;

        if self.is_enabled() {
            for group in 0..group_count {
                let mut sink = MatchSink::explaining();
                (self.evaluator)(solution, group, &mut sink)?;
                for raw in sink.into_matches() {
                    let match_score = self.score_of(raw.magnitude);
                    score += match_score;
                    matches.push(ConstraintMatch {
                        score: match_score,
                        entities: raw.entities,
                        justification: raw.justification,
                    });
                }
            }
        }

        Ok(ConstraintAnalysis {
            name: self.name.clone(),
            level: self.level,
            weight: self.unit_score(),
            score,
            matches,
        })
    }
}

impl<S> fmt::Debug for Constraint<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("impact", &self.impact)
            .field("weight", &self.weight)
            .finish()
    }
}

/// The ordered set of constraints scoring one kind of solution.
#[derive(Debug)]
pub struct ConstraintSet<S> {
    constraints: Vec<Constraint<S>>,
}

impl<S> ConstraintSet<S> {
    pub fn new(constraints: Vec<Constraint<S>>) -> Self {
        Self { constraints }
    }

    /// Applies weight overrides by constraint name.
    pub fn with_weights(mut self, overrides: &HashMap<String, i64>) -> Self {
        for (name, &weight) in overrides {
            match self.constraints.iter_mut().find(|c| &c.name == name) {
                Some(constraint) => constraint.weight = weight,
                None => warn!(constraint = %name, "Weight override for unknown constraint ignored"),
            }
        }
        self
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Constraint<S>> {
        self.constraints.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint<S>> {
        self.constraints.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.constraints.iter().map(Constraint::name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Groups are the inner vectors; every value above the limit is a match.
    fn over_limit(limit: i64) -> Constraint<Vec<Vec<i64>>> {
        Constraint::penalize_hard("overLimit", move |s: &Vec<Vec<i64>>, group, sink| {
            for (i, &value) in s[group].iter().enumerate() {
                sink.add(value - limit, || {
                    (vec![EntityRef::new("Value", format!("{}-{}", group, i))], format!("{} > {}", value, limit))
                });
            }
            Ok(())
        })
    }

    #[test]
    fn test_sink_ignores_non_positive_magnitudes() {
        let mut sink = MatchSink::scoring();
        sink.add(0, || unreachable!());
        sink.add(-3, || unreachable!());
        sink.add(2, || unreachable!());
        assert_eq!(sink.total(), 2);
        assert_eq!(sink.count(), 1);
        assert!(sink.into_matches().is_empty());
    }

    #[test]
    fn test_evaluate_and_analyze_agree() {
        let solution = vec![vec![1, 7, 12], vec![3]];
        let constraint = over_limit(5);

        assert_eq!(constraint.evaluate(&solution, 0).unwrap(), HardSoftScore::of_hard(-9));
        assert_eq!(constraint.evaluate(&solution, 1).unwrap(), HardSoftScore::ZERO);

        let analysis = constraint.analyze(&solution, 2).unwrap();
        assert_eq!(analysis.score, HardSoftScore::of_hard(-9));
        assert_eq!(analysis.match_count(), 2);
        assert_eq!(analysis.matches[1].justification, "12 > 5");
    }

    #[test]
    fn test_reward_and_weights() {
        let reward: Constraint<Vec<Vec<i64>>> =
            Constraint::reward_soft("bonus", |s: &Vec<Vec<i64>>, group, sink| {
                sink.add(s[group].len() as i64, || (Vec::new(), String::new()));
                Ok(())
            })
            .with_weight(3);
        assert_eq!(reward.unit_score(), HardSoftScore::of_soft(3));
        assert_eq!(reward.evaluate(&vec![vec![0, 0]], 0).unwrap(), HardSoftScore::of_soft(6));

        let mut overrides = HashMap::new();
        overrides.insert("overLimit".to_string(), 0);
        overrides.insert("missing".to_string(), 4);
        let set = ConstraintSet::new(vec![over_limit(0), reward]).with_weights(&overrides);
        assert!(!set.get(0).unwrap().is_enabled());
        assert_eq!(set.get(0).unwrap().evaluate(&vec![vec![9]], 0).unwrap(), HardSoftScore::ZERO);
        assert_eq!(set.names(), vec!["overLimit", "bonus"]);
    }
}
