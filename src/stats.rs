//! Per-rule move counts for the most recent run.

use crate::executor::ExecutedMove;
use crate::planner::PlannedMove;
use std::collections::BTreeMap;

/// Counts of moves grouped by rule name.
///
/// A snapshot is a pure function of the moves it was derived from and is
/// recomputed for every run or preview; sorted iteration keeps display
/// output stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatSnapshot {
    counts: BTreeMap<String, usize>,
}

impl StatSnapshot {
    /// Tallies the moves of an executed (or dry) run.
    pub fn from_executed(moves: &[ExecutedMove]) -> Self {
        Self::tally(moves.iter().map(|m| m.rule_name.as_str()))
    }

    /// Tallies a plan, for previews.
    pub fn from_plan(moves: &[PlannedMove]) -> Self {
        Self::tally(moves.iter().map(|m| m.rule_name.as_str()))
    }

    fn tally<'a, I: Iterator<Item = &'a str>>(names: I) -> Self {
        let mut counts = BTreeMap::new();
        for name in names {
            *counts.entry(name.to_string()).or_insert(0) += 1;
        }
        Self { counts }
    }

    /// Count for one rule; zero when the rule moved nothing.
    pub fn count(&self, rule_name: &str) -> usize {
        self.counts.get(rule_name).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Iterates rule names and counts in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(name, count)| (name.as_str(), *count))
    }
}
