//! Score explanation types.
//!
//! A [`ScoreExplanation`] breaks the total score down per constraint and per
//! match, and can be folded into per-entity [`Indictment`]s.

use std::collections::HashMap;
use std::fmt::{self, Write};

use serde::Serialize;

use crate::score::{HardSoftScore, ScoreLevel};

/// Reference to an entity involved in a constraint match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    /// Entity kind, e.g. `"Visit"` or `"Shift"`.
    pub kind: &'static str,
    /// Stable id of the entity.
    pub id: String,
}

impl EntityRef {
    pub fn new(kind: &'static str, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.id)
    }
}

/// One match of one constraint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintMatch {
    /// Weighted score impact of this match.
    pub score: HardSoftScore,
    pub entities: Vec<EntityRef>,
    pub justification: String,
}

/// Per-constraint breakdown in a score explanation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintAnalysis {
    pub name: String,
    pub level: ScoreLevel,
    /// Score impact of a single magnitude unit.
    pub weight: HardSoftScore,
    /// Total score from this constraint.
    pub score: HardSoftScore,
    pub matches: Vec<ConstraintMatch>,
}

impl ConstraintAnalysis {
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }
}

/// Complete score explanation with per-constraint breakdown.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreExplanation {
    pub score: HardSoftScore,
    pub constraints: Vec<ConstraintAnalysis>,
}

impl ScoreExplanation {
    pub fn new(score: HardSoftScore, constraints: Vec<ConstraintAnalysis>) -> Self {
        Self { score, constraints }
    }

    /// Looks up the analysis for a constraint by name.
    pub fn constraint(&self, name: &str) -> Option<&ConstraintAnalysis> {
        self.constraints.iter().find(|c| c.name == name)
    }

    pub fn total_match_count(&self) -> usize {
        self.constraints.iter().map(ConstraintAnalysis::match_count).sum()
    }

    /// Returns constraints with non-zero scores.
    pub fn non_zero_constraints(&self) -> Vec<&ConstraintAnalysis> {
        self.constraints.iter().filter(|c| !c.score.is_zero()).collect()
    }

    /// Folds all matches into per-entity indictments, worst first.
    pub fn indictments(&self) -> Vec<Indictment> {
        let mut by_entity: HashMap<&EntityRef, Indictment> = HashMap::new();

        for analysis in &self.constraints {
            for m in &analysis.matches {
                for entity in &m.entities {
                    let indictment = by_entity.entry(entity).or_insert_with(|| Indictment {
                        entity: entity.clone(),
                        score: HardSoftScore::ZERO,
                        match_count: 0,
                        constraints: Vec::new(),
                    });
                    indictment.score += m.score;
                    indictment.match_count += 1;
                    if !indictment.constraints.contains(&analysis.name) {
                        indictment.constraints.push(analysis.name.clone());
                    }
                }
            }
        }

        let mut indictments: Vec<Indictment> = by_entity.into_values().collect();
        indictments.sort_by(|a, b| {
            a.score
                .cmp(&b.score)
                .then_with(|| a.entity.id.cmp(&b.entity.id))
        });
        indictments
    }

    /// Multi-line human readable summary.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Explanation of score ({}):", self.score);
        let _ = writeln!(out, "    Constraint matches:");
        for analysis in &self.constraints {
            if analysis.matches.is_empty() {
                continue;
            }
            let _ = writeln!(
                out,
                "        {} ({} matches): {}",
                analysis.name,
                analysis.match_count(),
                analysis.score
            );
            for m in &analysis.matches {
                let _ = writeln!(out, "            {}: {}", m.score, m.justification);
            }
        }
        out
    }
}

/// How a single entity impacts the score.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Indictment {
    pub entity: EntityRef,
    pub score: HardSoftScore,
    pub match_count: usize,
    /// Names of the constraints the entity is involved in.
    pub constraints: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explanation() -> ScoreExplanation {
        let a = EntityRef::new("Shift", "1");
        let b = EntityRef::new("Shift", "2");
        ScoreExplanation::new(
            HardSoftScore::of(-3, -5),
            vec![
                ConstraintAnalysis {
                    name: "Overlapping shift".to_string(),
                    level: ScoreLevel::Hard,
                    weight: HardSoftScore::of_hard(-1),
                    score: HardSoftScore::of_hard(-3),
                    matches: vec![ConstraintMatch {
                        score: HardSoftScore::of_hard(-3),
                        entities: vec![a.clone(), b.clone()],
                        justification: "Shift(1) overlaps Shift(2)".to_string(),
                    }],
                },
                ConstraintAnalysis {
                    name: "Undesired day for employee".to_string(),
                    level: ScoreLevel::Soft,
                    weight: HardSoftScore::of_soft(-1),
                    score: HardSoftScore::of_soft(-5),
                    matches: vec![ConstraintMatch {
                        score: HardSoftScore::of_soft(-5),
                        entities: vec![b],
                        justification: "Shift(2) on undesired day".to_string(),
                    }],
                },
                ConstraintAnalysis {
                    name: "Desired day for employee".to_string(),
                    level: ScoreLevel::Soft,
                    weight: HardSoftScore::of_soft(1),
                    score: HardSoftScore::ZERO,
                    matches: Vec::new(),
                },
            ],
        )
    }

    #[test]
    fn test_counts_and_lookup() {
        let explanation = explanation();
        assert_eq!(explanation.total_match_count(), 2);
        assert_eq!(explanation.non_zero_constraints().len(), 2);
        assert!(explanation.constraint("Desired day for employee").is_some());
        assert!(explanation.constraint("nope").is_none());
    }

    #[test]
    fn test_indictments_worst_first() {
        let indictments = explanation().indictments();
        assert_eq!(indictments.len(), 2);
        assert_eq!(indictments[0].entity.id, "2");
        assert_eq!(indictments[0].score, HardSoftScore::of(-3, -5));
        assert_eq!(indictments[0].constraints.len(), 2);
        assert_eq!(indictments[1].score, HardSoftScore::of_hard(-3));
    }

    #[test]
    fn test_summary_skips_empty_constraints() {
        let summary = explanation().summary();
        assert!(summary.contains("Overlapping shift (1 matches): -3hard/0soft"));
        assert!(!summary.contains("Desired day"));
    }
}
