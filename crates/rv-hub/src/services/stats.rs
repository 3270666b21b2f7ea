//! Adaptive run statistics service.
//!
//! Combines the aggregation DAO's raw answers into the per-phase
//! statistics DTOs. Command queries need a command index first: the
//! run's `sandbox_id` wins, the access-token/user scope is the fallback.

use indexmap::IndexMap;
use serde_json::Value;

use rv_core::stats::{solution_displayed, CommandsStatistics, OverallPhaseStatistics};
use rv_core::{FieldNames, IndexRoots};
use rv_search::StatisticsDao;

use crate::error::ServiceError;

const SOLUTION_DISPLAYED_EVENT: &str = "SolutionDisplayed";

pub type KeywordsMapping = IndexMap<i64, Vec<String>>;

pub struct StatisticsService {
    dao: StatisticsDao,
    roots: IndexRoots,
    fields: FieldNames,
}

impl StatisticsService {
    pub fn new(dao: StatisticsDao, roots: IndexRoots, fields: FieldNames) -> Self {
        Self { dao, roots, fields }
    }

    /// Command index for a run: sandbox scope when the run's events carry
    /// a sandbox ID, otherwise access token + user ID (both mandatory).
    async fn resolve_commands_index(
        &self,
        run_id: i64,
        access_token: Option<&str>,
        user_id: Option<i64>,
    ) -> Result<String, ServiceError> {
        let sandbox = self
            .dao
            .unique_field_value(run_id, &self.fields.sandbox_id)
            .await?;
        commands_index_for_scope(&self.roots, sandbox.as_ref(), access_token, user_id)
    }

    pub async fn commands_statistics(
        &self,
        run_id: i64,
        phase_ids: &[i64],
        access_token: Option<&str>,
        user_id: Option<i64>,
        keywords: Option<&KeywordsMapping>,
    ) -> Result<Vec<CommandsStatistics>, ServiceError> {
        let boundaries = self.dao.time_boundaries(run_id, phase_ids).await?;
        let tasks = self.dao.task_ids(run_id, phase_ids).await?;
        let index = self
            .resolve_commands_index(run_id, access_token, user_id)
            .await?;

        let mut statistics = Vec::with_capacity(boundaries.len());
        for (phase_id, boundary) in &boundaries {
            let phase_keywords = keywords.and_then(|m| m.get(phase_id)).map(Vec::as_slice);
            let (total, counts) = self
                .dao
                .commands_in_range(&index, boundary.min, boundary.max, phase_keywords)
                .await?;
            statistics.push(CommandsStatistics {
                phase_id: *phase_id,
                task_id: tasks.get(phase_id).copied(),
                number_of_commands: total,
                keywords_in_commands: counts,
            });
        }
        Ok(statistics)
    }

    /// Time spent per phase; the open-phase sentinel passes through.
    pub async fn phase_time_statistics(
        &self,
        run_id: i64,
        phase_ids: &[i64],
    ) -> Result<IndexMap<i64, i64>, ServiceError> {
        let boundaries = self.dao.time_boundaries(run_id, phase_ids).await?;
        Ok(boundaries
            .iter()
            .map(|(phase_id, boundary)| (*phase_id, boundary.elapsed()))
            .collect())
    }

    /// Solution flag per phase. Every requested phase gets an entry:
    /// phases with no events at all report `false`, the same as a zero
    /// count. (Upstream consumers used to receive only aggregated
    /// phases; the fill-in makes the map total over the request.)
    pub async fn phase_solution_statistics(
        &self,
        run_id: i64,
        phase_ids: &[i64],
    ) -> Result<IndexMap<i64, bool>, ServiceError> {
        let types = vec![SOLUTION_DISPLAYED_EVENT.to_string()];
        let counts = self
            .dao
            .count_events_in_phases(run_id, phase_ids, &types)
            .await?;
        Ok(solution_flags(phase_ids, &counts))
    }

    pub async fn phase_wrong_answer_statistics(
        &self,
        run_id: i64,
        phase_ids: &[i64],
    ) -> Result<IndexMap<i64, Vec<String>>, ServiceError> {
        Ok(self.dao.wrong_answers(run_id, phase_ids).await?)
    }

    pub async fn overall_statistics(
        &self,
        run_id: i64,
        phase_ids: &[i64],
        access_token: Option<&str>,
        user_id: Option<i64>,
        keywords: Option<&KeywordsMapping>,
    ) -> Result<Vec<OverallPhaseStatistics>, ServiceError> {
        let boundaries = self.dao.time_boundaries(run_id, phase_ids).await?;
        let tasks = self.dao.task_ids(run_id, phase_ids).await?;
        let solutions = self.phase_solution_statistics(run_id, phase_ids).await?;
        let mut wrong_answers = self.dao.wrong_answers(run_id, phase_ids).await?;
        let index = self
            .resolve_commands_index(run_id, access_token, user_id)
            .await?;

        let mut statistics = Vec::with_capacity(boundaries.len());
        for (phase_id, boundary) in &boundaries {
            let phase_keywords = keywords.and_then(|m| m.get(phase_id)).map(Vec::as_slice);
            let (total, counts) = self
                .dao
                .commands_in_range(&index, boundary.min, boundary.max, phase_keywords)
                .await?;
            statistics.push(OverallPhaseStatistics {
                phase_id: *phase_id,
                task_id: tasks.get(phase_id).copied(),
                phase_time: boundary.elapsed(),
                wrong_answers: wrong_answers.shift_remove(phase_id).unwrap_or_default(),
                solution_displayed: solutions.get(phase_id).copied().unwrap_or(false),
                number_of_commands: total,
                keywords_in_commands: counts,
            });
        }
        Ok(statistics)
    }
}

fn solution_flags(
    phase_ids: &[i64],
    counts: &IndexMap<i64, IndexMap<String, u64>>,
) -> IndexMap<i64, bool> {
    phase_ids
        .iter()
        .map(|phase_id| {
            let count = counts
                .get(phase_id)
                .and_then(|c| c.get(SOLUTION_DISPLAYED_EVENT))
                .copied()
                .unwrap_or(0);
            (*phase_id, solution_displayed(count))
        })
        .collect()
}

fn commands_index_for_scope(
    roots: &IndexRoots,
    sandbox: Option<&Value>,
    access_token: Option<&str>,
    user_id: Option<i64>,
) -> Result<String, ServiceError> {
    if let Some(value) = sandbox {
        return Ok(roots.commands_by_sandbox(&scalar_to_string(value)));
    }
    match (access_token, user_id) {
        (Some(token), Some(user)) => Ok(roots.commands_by_access_token_and_user(token, user)),
        _ => Err(ServiceError::MissingScope(
            "sandbox ID of the training run is null; accessToken and userId must both be provided"
                .into(),
        )),
    }
}

/// Sandbox IDs appear as numbers in older indices and as strings (UUIDs)
/// in newer ones.
fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sandbox_scope_wins() {
        let roots = IndexRoots::default();
        let index = commands_index_for_scope(
            &roots,
            Some(&json!("sb-11")),
            Some("token"),
            Some(7),
        )
        .unwrap();
        assert_eq!(index, "crczp.logs.console*.sandbox=sb-11");
    }

    #[test]
    fn test_numeric_sandbox_id() {
        let roots = IndexRoots::default();
        let index = commands_index_for_scope(&roots, Some(&json!(42)), None, None).unwrap();
        assert_eq!(index, "crczp.logs.console*.sandbox=42");
    }

    #[test]
    fn test_token_and_user_fallback() {
        let roots = IndexRoots::default();
        let index = commands_index_for_scope(&roots, None, Some("tok-x"), Some(9)).unwrap();
        assert_eq!(index, "crczp.logs.console*.access-token=tok-x.user=9");
    }

    #[test]
    fn test_solution_flags_cover_every_requested_phase() {
        let mut counts: IndexMap<i64, IndexMap<String, u64>> = IndexMap::new();
        counts.insert(1, IndexMap::from([("SolutionDisplayed".to_string(), 1u64)]));
        counts.insert(2, IndexMap::from([("SolutionDisplayed".to_string(), 0u64)]));
        counts.insert(3, IndexMap::from([("SolutionDisplayed".to_string(), 2u64)]));

        // Phase 4 never produced an event; it still shows up, as false.
        let flags = solution_flags(&[1, 2, 3, 4], &counts);
        assert_eq!(flags[&1], true);
        assert_eq!(flags[&2], false);
        assert_eq!(flags[&3], false);
        assert_eq!(flags[&4], false);
        assert_eq!(flags.len(), 4);
    }

    #[test]
    fn test_missing_scope_is_rejected() {
        let roots = IndexRoots::default();
        assert!(matches!(
            commands_index_for_scope(&roots, None, Some("tok-x"), None),
            Err(ServiceError::MissingScope(_))
        ));
        assert!(matches!(
            commands_index_for_scope(&roots, None, None, Some(9)),
            Err(ServiceError::MissingScope(_))
        ));
    }
}
