//! Adaptive statistics DAO.
//!
//! Aggregation queries over one adaptive run's event index: phase time
//! boundaries, per-phase event-type counts, wrong answers, task ids, and
//! keyword counts over a command index. Aggregation-only queries go out
//! with `size: 0`.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use rv_core::stats::{fill_missing_phases, keyword_counts, PhaseBoundary};
use rv_core::{FieldNames, IndexRoots};

use crate::client::EsClient;
use crate::error::SearchError;
use crate::query::{
    collapse, keyed_wildcard_filters, match_query, max_agg, min_agg, must_all, must_with_filter,
    range, should_any, sort_asc, terms_agg, wildcard, SearchBody,
};
use crate::response::{
    bucket_key_i64, keyed_filter_counts, sub_agg_value_i64, terms_buckets, SearchResponse,
};

const PHASES_AGGREGATION: &str = "phases_aggregation";
const MIN_TIMESTAMP: &str = "min_timestamp";
const MAX_TIMESTAMP: &str = "max_timestamp";
const TYPE_FILTER: &str = "type_filter";
const KEYWORD_FILTER: &str = "keyword_filter";
const PHASES_COLLAPSE: &str = "phases_collapse";

pub struct StatisticsDao {
    client: Arc<EsClient>,
    fields: FieldNames,
    roots: IndexRoots,
    max_results: usize,
}

impl StatisticsDao {
    pub fn new(client: Arc<EsClient>, fields: FieldNames, roots: IndexRoots, max_results: usize) -> Self {
        Self {
            client,
            fields,
            roots,
            max_results,
        }
    }

    fn phases_query(&self, phase_ids: &[i64]) -> Value {
        should_any(
            phase_ids
                .iter()
                .map(|id| match_query(&self.fields.phase_id, *id))
                .collect(),
        )
    }

    /// Min/max timestamps of phase start/completion events, per phase.
    /// Phases without any such event are absent from the result.
    pub async fn time_boundaries(
        &self,
        run_id: i64,
        phase_ids: &[i64],
    ) -> Result<IndexMap<i64, PhaseBoundary>, SearchError> {
        let started_or_completed = should_any(vec![
            wildcard(&self.fields.event_type, "*PhaseStarted"),
            wildcard(&self.fields.event_type, "*PhaseCompleted"),
        ]);
        let body = SearchBody::new(0)
            .query(must_all(vec![self.phases_query(phase_ids), started_or_completed]))
            .agg(
                PHASES_AGGREGATION,
                terms_agg(&self.fields.phase_id),
                vec![
                    (MAX_TIMESTAMP, max_agg(&self.fields.timestamp)),
                    (MIN_TIMESTAMP, min_agg(&self.fields.timestamp)),
                ],
            )
            .build();
        let index = self.roots.adaptive_events_by_run(run_id);
        let response = self.client.search(&index, body).await?;
        boundaries_from_response(&response)
    }

    /// Occurrences of each event type per phase, every requested type
    /// present with zeros preserved. Rejects an empty type list.
    pub async fn count_events_in_phases(
        &self,
        run_id: i64,
        phase_ids: &[i64],
        event_types: &[String],
    ) -> Result<IndexMap<i64, IndexMap<String, u64>>, SearchError> {
        if event_types.is_empty() {
            return Err(SearchError::InvalidQuery(
                "event type list cannot be empty".into(),
            ));
        }
        let body = SearchBody::new(0)
            .query(self.phases_query(phase_ids))
            .agg(
                PHASES_AGGREGATION,
                terms_agg(&self.fields.phase_id),
                vec![(
                    TYPE_FILTER,
                    keyed_wildcard_filters(&self.fields.event_type, event_types),
                )],
            )
            .build();
        let index = self.roots.adaptive_events_by_run(run_id);
        let response = self.client.search(&index, body).await?;
        event_counts_from_response(&response, event_types)
    }

    /// Wrong answers submitted per phase; every requested phase present,
    /// empty when none were submitted.
    pub async fn wrong_answers(
        &self,
        run_id: i64,
        phase_ids: &[i64],
    ) -> Result<IndexMap<i64, Vec<String>>, SearchError> {
        let wrong_answer_events =
            should_any(vec![wildcard(&self.fields.event_type, "*WrongAnswerSubmitted")]);
        let body = SearchBody::new(self.max_results)
            .query(must_all(vec![self.phases_query(phase_ids), wrong_answer_events]))
            .collapse(collapse(
                &self.fields.phase_id,
                PHASES_COLLAPSE,
                self.max_results,
                Vec::new(),
            ))
            .build();
        let index = self.roots.adaptive_events_by_run(run_id);
        let response = self.client.search(&index, body).await?;
        let mut answers = wrong_answers_from_response(&response, &self.fields)?;
        fill_missing_phases(&mut answers, phase_ids);
        Ok(answers)
    }

    /// Task id chosen in each phase, read from the phase-start events.
    /// Phases whose start event carries no task id are absent.
    pub async fn task_ids(
        &self,
        run_id: i64,
        phase_ids: &[i64],
    ) -> Result<IndexMap<i64, i64>, SearchError> {
        let body = SearchBody::new(self.max_results)
            .query(must_with_filter(
                vec![self.phases_query(phase_ids)],
                vec![wildcard(&self.fields.event_type, "*PhaseStarted")],
            ))
            .build();
        let index = self.roots.adaptive_events_by_run(run_id);
        let response = self.client.search(&index, body).await?;
        task_ids_from_response(&response, &self.fields)
    }

    /// Value of a run-constant field (`sandbox_id`, `pool_id`, ...) read
    /// from an arbitrary event of the run. `NotFound` when the run has no
    /// events at all; `None` when the field is absent or null.
    pub async fn unique_field_value(
        &self,
        run_id: i64,
        field: &str,
    ) -> Result<Option<Value>, SearchError> {
        let body = SearchBody::new(1).build();
        let index = self.roots.adaptive_events_by_run(run_id);
        let response = self.client.search(&index, body).await?;
        let hit = response.hits.hits.first().ok_or_else(|| {
            SearchError::NotFound(format!("no event found for training run {}", run_id))
        })?;
        Ok(hit.source.get(field).filter(|v| !v.is_null()).cloned())
    }

    /// Total command count and per-keyword occurrence counts within the
    /// time range. `keywords: None` skips the aggregation entirely.
    pub async fn commands_in_range(
        &self,
        index_pattern: &str,
        from: i64,
        to: i64,
        keywords: Option<&[String]>,
    ) -> Result<(u64, IndexMap<String, u64>), SearchError> {
        let mut body = SearchBody::new(self.max_results)
            .query(range(&self.fields.timestamp_str, from, to))
            .sort(sort_asc(&self.fields.timestamp_str));
        if let Some(keywords) = keywords {
            body = body.agg(
                KEYWORD_FILTER,
                keyed_wildcard_filters(&self.fields.cmd, keywords),
                Vec::new(),
            );
        }
        let response = self.client.search(index_pattern, body.build()).await?;
        commands_stats_from_response(&response, keywords)
    }
}

fn boundaries_from_response(
    response: &SearchResponse,
) -> Result<IndexMap<i64, PhaseBoundary>, SearchError> {
    let mut boundaries = IndexMap::new();
    for bucket in terms_buckets(&response.aggregations, PHASES_AGGREGATION)? {
        let phase_id = bucket_key_i64(bucket)?;
        let min = sub_agg_value_i64(bucket, MIN_TIMESTAMP)?;
        let max = sub_agg_value_i64(bucket, MAX_TIMESTAMP)?;
        boundaries.insert(phase_id, PhaseBoundary::from_min_max(min, max));
    }
    Ok(boundaries)
}

fn event_counts_from_response(
    response: &SearchResponse,
    event_types: &[String],
) -> Result<IndexMap<i64, IndexMap<String, u64>>, SearchError> {
    let mut counts = IndexMap::new();
    for bucket in terms_buckets(&response.aggregations, PHASES_AGGREGATION)? {
        let phase_id = bucket_key_i64(bucket)?;
        let observed = keyed_filter_counts(bucket, TYPE_FILTER)?;
        counts.insert(phase_id, keyword_counts(event_types, &observed));
    }
    Ok(counts)
}

fn wrong_answers_from_response(
    response: &SearchResponse,
    fields: &FieldNames,
) -> Result<IndexMap<i64, Vec<String>>, SearchError> {
    let mut answers = IndexMap::new();
    for hit in &response.hits.hits {
        let phase_id = hit.source_i64(&fields.phase_id)?;
        let submitted = hit
            .inner_records(PHASES_COLLAPSE)?
            .into_iter()
            .filter_map(|record| {
                record.get(&fields.answer_content).map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
            })
            .collect();
        answers.insert(phase_id, submitted);
    }
    Ok(answers)
}

fn task_ids_from_response(
    response: &SearchResponse,
    fields: &FieldNames,
) -> Result<IndexMap<i64, i64>, SearchError> {
    let mut tasks = IndexMap::new();
    for hit in &response.hits.hits {
        let phase_id = hit.source_i64(&fields.phase_id)?;
        if let Some(task_id) = hit.source.get(&fields.task_id).and_then(Value::as_i64) {
            tasks.insert(phase_id, task_id);
        }
    }
    Ok(tasks)
}

fn commands_stats_from_response(
    response: &SearchResponse,
    keywords: Option<&[String]>,
) -> Result<(u64, IndexMap<String, u64>), SearchError> {
    let total = response.hits.total.value;
    let counts = match keywords {
        Some(keywords) => {
            let aggregations = response
                .aggregations
                .as_ref()
                .ok_or_else(|| SearchError::Malformed("response has no aggregations".into()))?;
            let observed = keyed_filter_counts(aggregations, KEYWORD_FILTER)?;
            keyword_counts(keywords, &observed)
        }
        None => IndexMap::new(),
    };
    Ok((total, counts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rv_core::stats::OPEN_PHASE;
    use serde_json::json;

    fn decode(value: Value) -> SearchResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_boundaries_with_open_phase() {
        let response = decode(json!({
            "hits": {"total": {"value": 3}, "hits": []},
            "aggregations": {"phases_aggregation": {"buckets": [
                {"key": 1, "min_timestamp": {"value": 100.0}, "max_timestamp": {"value": 450.0}},
                {"key": 2, "min_timestamp": {"value": 500.0}, "max_timestamp": {"value": 500.0}}
            ]}}
        }));
        let boundaries = boundaries_from_response(&response).unwrap();
        assert_eq!(boundaries[&1].elapsed(), 350);
        assert!(boundaries[&2].is_open());
        assert_eq!(boundaries[&2].max, OPEN_PHASE);
    }

    #[test]
    fn test_event_counts_preserve_zeros() {
        let response = decode(json!({
            "hits": {"total": {"value": 0}, "hits": []},
            "aggregations": {"phases_aggregation": {"buckets": [
                {"key": 1, "type_filter": {"buckets": {
                    "SolutionDisplayed": {"doc_count": 1}
                }}},
                {"key": 2, "type_filter": {"buckets": {
                    "SolutionDisplayed": {"doc_count": 0}
                }}}
            ]}}
        }));
        let counts =
            event_counts_from_response(&response, &["SolutionDisplayed".to_string()]).unwrap();
        assert_eq!(counts[&1]["SolutionDisplayed"], 1);
        assert_eq!(counts[&2]["SolutionDisplayed"], 0);
    }

    #[test]
    fn test_wrong_answers_fill_in_missing_phases() {
        let response = decode(json!({
            "hits": {"hits": [{
                "_source": {"phase_id": 1},
                "fields": {"phase_id": [1]},
                "inner_hits": {"phases_collapse": {"hits": {"hits": [
                    {"_source": {"answer_content": "flag{x}"}}
                ]}}}
            }]}
        }));
        let mut answers = wrong_answers_from_response(&response, &FieldNames::default()).unwrap();
        fill_missing_phases(&mut answers, &[1, 2, 3]);
        assert_eq!(answers[&1], vec!["flag{x}".to_string()]);
        assert!(answers[&2].is_empty());
        assert!(answers[&3].is_empty());
    }

    #[test]
    fn test_task_ids_skip_hits_without_task() {
        let response = decode(json!({
            "hits": {"hits": [
                {"_source": {"phase_id": 1, "task_id": 11}},
                {"_source": {"phase_id": 2}}
            ]}
        }));
        let tasks = task_ids_from_response(&response, &FieldNames::default()).unwrap();
        assert_eq!(tasks.get(&1), Some(&11));
        assert_eq!(tasks.get(&2), None);
    }

    #[test]
    fn test_commands_stats_with_keywords() {
        let response = decode(json!({
            "hits": {"total": {"value": 12}, "hits": []},
            "aggregations": {"keyword_filter": {"buckets": {
                "ls": {"doc_count": 5},
                "cat": {"doc_count": 0}
            }}}
        }));
        let keywords = vec!["ls".to_string(), "cat".to_string()];
        let (total, counts) =
            commands_stats_from_response(&response, Some(&keywords)).unwrap();
        assert_eq!(total, 12);
        assert_eq!(counts["ls"], 5);
        assert_eq!(counts["cat"], 0);
    }

    #[test]
    fn test_commands_stats_without_keywords() {
        let response = decode(json!({"hits": {"total": {"value": 4}, "hits": []}}));
        let (total, counts) = commands_stats_from_response(&response, None).unwrap();
        assert_eq!(total, 4);
        assert!(counts.is_empty());
    }
}
