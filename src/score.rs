//! Two-level hard/soft score.
//!
//! Hard constraints must hold for a plan to be feasible; soft constraints are
//! the optimization objective. Scores compare lexicographically, hard first.

use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Error returned when score text is not of the form `{hard}hard/{soft}soft`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Score parse error: {message}")]
pub struct ScoreParseError {
    pub message: String,
}

/// The level a constraint contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreLevel {
    Hard,
    Soft,
}

impl fmt::Display for ScoreLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreLevel::Hard => write!(f, "hard"),
            ScoreLevel::Soft => write!(f, "soft"),
        }
    }
}

/// A score with separate hard and soft levels.
///
/// # Examples
///
/// ```
/// use planning_core::score::HardSoftScore;
///
/// let broken = HardSoftScore::of(-1, -100);
/// let feasible = HardSoftScore::of(0, -200);
///
/// // Feasible solutions always beat infeasible ones
/// assert!(feasible > broken);
/// assert!(HardSoftScore::of(0, -50) > feasible);
///
/// assert_eq!(feasible.to_string(), "0hard/-200soft");
/// assert_eq!("0hard/-200soft".parse::<HardSoftScore>().unwrap(), feasible);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HardSoftScore {
    hard: i64,
    soft: i64,
}

impl HardSoftScore {
    /// The zero score.
    pub const ZERO: HardSoftScore = HardSoftScore { hard: 0, soft: 0 };

    /// One hard unit.
    pub const ONE_HARD: HardSoftScore = HardSoftScore { hard: 1, soft: 0 };

    /// One soft unit.
    pub const ONE_SOFT: HardSoftScore = HardSoftScore { hard: 0, soft: 1 };

    #[inline]
    pub const fn of(hard: i64, soft: i64) -> Self {
        HardSoftScore { hard, soft }
    }

    #[inline]
    pub const fn of_hard(hard: i64) -> Self {
        HardSoftScore { hard, soft: 0 }
    }

    #[inline]
    pub const fn of_soft(soft: i64) -> Self {
        HardSoftScore { hard: 0, soft }
    }

    /// Creates a score with `amount` on the given level.
    #[inline]
    pub const fn of_level(level: ScoreLevel, amount: i64) -> Self {
        match level {
            ScoreLevel::Hard => Self::of_hard(amount),
            ScoreLevel::Soft => Self::of_soft(amount),
        }
    }

    #[inline]
    pub const fn hard(&self) -> i64 {
        self.hard
    }

    #[inline]
    pub const fn soft(&self) -> i64 {
        self.soft
    }

    /// True when the hard level is exactly zero.
    #[inline]
    pub const fn is_feasible(&self) -> bool {
        self.hard == 0
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.hard == 0 && self.soft == 0
    }

    /// Multiplies both levels by `factor`.
    #[inline]
    pub const fn multiply(&self, factor: i64) -> Self {
        HardSoftScore::of(self.hard * factor, self.soft * factor)
    }

    /// Parses `{hard}hard/{soft}soft`, surrounding whitespace allowed.
    pub fn parse(s: &str) -> Result<Self, ScoreParseError> {
        let s = s.trim();
        let (hard_part, soft_part) = match s.split('/').collect::<Vec<_>>()[..] {
            [hard, soft] => (hard.trim(), soft.trim()),
            _ => {
                return Err(ScoreParseError {
                    message: format!(
                        "Invalid HardSoftScore format '{}': expected 2 parts separated by '/'",
                        s
                    ),
                })
            }
        };

        Ok(HardSoftScore::of(
            parse_level(hard_part, "hard")?,
            parse_level(soft_part, "soft")?,
        ))
    }
}

fn parse_level(part: &str, suffix: &str) -> Result<i64, ScoreParseError> {
    let num_str = part.strip_suffix(suffix).ok_or_else(|| ScoreParseError {
        message: format!("{} part '{}' must end with '{}'", suffix, part, suffix),
    })?;
    num_str.parse::<i64>().map_err(|e| ScoreParseError {
        message: format!("Invalid {} score '{}': {}", suffix, num_str, e),
    })
}

impl Ord for HardSoftScore {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.hard.cmp(&other.hard) {
            Ordering::Equal => self.soft.cmp(&other.soft),
            other => other,
        }
    }
}

impl PartialOrd for HardSoftScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for HardSoftScore {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        HardSoftScore::of(self.hard + rhs.hard, self.soft + rhs.soft)
    }
}

impl AddAssign for HardSoftScore {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for HardSoftScore {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        HardSoftScore::of(self.hard - rhs.hard, self.soft - rhs.soft)
    }
}

impl SubAssign for HardSoftScore {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for HardSoftScore {
    type Output = Self;

    fn neg(self) -> Self {
        HardSoftScore::of(-self.hard, -self.soft)
    }
}

impl Sum for HardSoftScore {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(HardSoftScore::ZERO, Add::add)
    }
}

impl fmt::Debug for HardSoftScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HardSoftScore({}, {})", self.hard, self.soft)
    }
}

impl fmt::Display for HardSoftScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}hard/{}soft", self.hard, self.soft)
    }
}

impl FromStr for HardSoftScore {
    type Err = ScoreParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HardSoftScore::parse(s)
    }
}

impl Serialize for HardSoftScore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HardSoftScore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        HardSoftScore::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation() {
        let score = HardSoftScore::of(-2, -100);
        assert_eq!(score.hard(), -2);
        assert_eq!(score.soft(), -100);

        assert_eq!(HardSoftScore::of_hard(-5), HardSoftScore::of(-5, 0));
        assert_eq!(HardSoftScore::of_soft(-10), HardSoftScore::of(0, -10));
        assert_eq!(HardSoftScore::of_level(ScoreLevel::Hard, 3), HardSoftScore::of_hard(3));
    }

    #[test]
    fn test_feasibility() {
        assert!(HardSoftScore::of(0, -1000).is_feasible());
        assert!(!HardSoftScore::of(-1, 0).is_feasible());
        assert!(!HardSoftScore::of(1, 0).is_feasible());
    }

    #[test]
    fn test_comparison_is_hard_first() {
        assert!(HardSoftScore::of(0, -1_000_000) > HardSoftScore::of(-1, 0));
        assert!(HardSoftScore::of(-1, 5) > HardSoftScore::of(-1, 4));
        assert_eq!(HardSoftScore::of(3, 3).cmp(&HardSoftScore::of(3, 3)), Ordering::Equal);
    }

    #[test]
    fn test_arithmetic() {
        let a = HardSoftScore::of(-2, -100);
        let b = HardSoftScore::of(-1, -50);

        assert_eq!(a + b, HardSoftScore::of(-3, -150));
        assert_eq!(a - b, HardSoftScore::of(-1, -50));
        assert_eq!(-a, HardSoftScore::of(2, 100));
        assert_eq!(a.multiply(3), HardSoftScore::of(-6, -300));
        assert_eq!([a, b].into_iter().sum::<HardSoftScore>(), HardSoftScore::of(-3, -150));
    }

    #[test]
    fn test_display_and_parse() {
        let score = HardSoftScore::of(-5, 12);
        assert_eq!(score.to_string(), "-5hard/12soft");
        assert_eq!(HardSoftScore::parse(" -5hard/12soft ").unwrap(), score);
    }

    #[test]
    fn test_parse_rejects_malformed_text() {
        for text in ["", "5hard", "5hard/3", "5/3soft", "xhard/0soft", "1hard/2soft/3soft"] {
            assert!(HardSoftScore::parse(text).is_err(), "accepted {:?}", text);
        }

        let err = HardSoftScore::parse("1hard/2points").unwrap_err();
        assert!(err.to_string().contains("must end with 'soft'"));
    }

    #[test]
    fn test_serde_uses_text_form() {
        let score = HardSoftScore::of(-1, -30);
        let json = serde_json::to_string(&score).unwrap();
        assert_eq!(json, "\"-1hard/-30soft\"");

        let back: HardSoftScore = serde_json::from_str(&json).unwrap();
        assert_eq!(back, score);
        assert!(serde_json::from_str::<HardSoftScore>("\"oops\"").is_err());
    }
}
