//! Per-phase statistics arithmetic.
//!
//! The backend only reports raw aggregates (min/max timestamps, bucket
//! counts, wrong-answer hits); the rules that turn those into phase
//! statistics live here.

use indexmap::IndexMap;
use serde::Serialize;

/// Sentinel for a phase with a start event but no completion event.
pub const OPEN_PHASE: i64 = i64::MAX;

/// Observed time boundaries of a single phase.
///
/// When the backend's max timestamp equals its min, only one event was
/// observed and the phase is treated as still open: `max` becomes the
/// [`OPEN_PHASE`] sentinel and the elapsed time is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseBoundary {
    pub min: i64,
    pub max: i64,
}

impl PhaseBoundary {
    pub fn from_min_max(min: i64, max: i64) -> Self {
        let max = if max == min { OPEN_PHASE } else { max };
        Self { min, max }
    }

    pub fn is_open(&self) -> bool {
        self.max == OPEN_PHASE
    }

    /// Time spent in the phase; [`OPEN_PHASE`] when the phase never
    /// completed.
    pub fn elapsed(&self) -> i64 {
        if self.is_open() {
            OPEN_PHASE
        } else {
            self.max - self.min
        }
    }
}

/// A solution was taken exactly when one `SolutionDisplayed` event was
/// recorded. Zero means it never happened; more than one means replayed
/// or duplicated telemetry, which does not count as a clean reveal.
pub fn solution_displayed(count: u64) -> bool {
    count == 1
}

/// Per-keyword occurrence counts with every requested keyword present,
/// zero included.
pub fn keyword_counts(
    requested: &[String],
    observed: &IndexMap<String, u64>,
) -> IndexMap<String, u64> {
    requested
        .iter()
        .map(|k| (k.clone(), observed.get(k).copied().unwrap_or(0)))
        .collect()
}

/// Ensure every requested phase id has an entry, defaulting to `T::default()`.
pub fn fill_missing_phases<T: Default>(map: &mut IndexMap<i64, T>, phase_ids: &[i64]) {
    for id in phase_ids {
        map.entry(*id).or_default();
    }
}

/// Command statistics of one phase.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommandsStatistics {
    pub phase_id: i64,
    pub task_id: Option<i64>,
    pub number_of_commands: u64,
    pub keywords_in_commands: IndexMap<String, u64>,
}

/// Combined per-phase statistics of an adaptive run.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OverallPhaseStatistics {
    pub phase_id: i64,
    pub task_id: Option<i64>,
    pub phase_time: i64,
    pub wrong_answers: Vec<String>,
    pub solution_displayed: bool,
    pub number_of_commands: u64,
    pub keywords_in_commands: IndexMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_phase() {
        let b = PhaseBoundary::from_min_max(100, 450);
        assert!(!b.is_open());
        assert_eq!(b.elapsed(), 350);
    }

    #[test]
    fn test_single_event_phase_is_open() {
        let b = PhaseBoundary::from_min_max(100, 100);
        assert!(b.is_open());
        assert_eq!(b.max, OPEN_PHASE);
        assert_eq!(b.elapsed(), OPEN_PHASE);
    }

    #[test]
    fn test_solution_displayed_rule() {
        assert!(!solution_displayed(0));
        assert!(solution_displayed(1));
        assert!(!solution_displayed(2));
        assert!(!solution_displayed(17));
    }

    #[test]
    fn test_keyword_counts_preserve_zeros() {
        let requested = vec!["ls".to_string(), "cat".to_string()];
        let mut observed = IndexMap::new();
        observed.insert("ls".to_string(), 5u64);
        let counts = keyword_counts(&requested, &observed);
        assert_eq!(counts["ls"], 5);
        assert_eq!(counts["cat"], 0);
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn test_fill_missing_phases() {
        let mut map: IndexMap<i64, Vec<String>> = IndexMap::new();
        map.insert(1, vec!["flag{x}".into()]);
        fill_missing_phases(&mut map, &[1, 2, 3]);
        assert_eq!(map[&1], vec!["flag{x}".to_string()]);
        assert!(map[&2].is_empty());
        assert!(map[&3].is_empty());
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_fill_does_not_clobber_existing() {
        let mut map: IndexMap<i64, u64> = IndexMap::new();
        map.insert(2, 9);
        fill_missing_phases(&mut map, &[2]);
        assert_eq!(map[&2], 9);
    }
}
