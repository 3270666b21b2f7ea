//! Training events DAO.
//!
//! Flat listings, collapse-based aggregations, and delete-by-scope over
//! the training event indices. Every aggregation is pushed to the
//! backend as a field collapse with sorted inner hits; the run-length
//! regrouping of the inner hits happens in `rv_core::reshape`.

use std::sync::Arc;

use indexmap::IndexMap;

use rv_core::{regroup, CollapsedGroup, FieldNames, GroupKey, GroupedMap, IndexRoots, Record, TrainingType};

use crate::client::EsClient;
use crate::error::SearchError;
use crate::query::{collapse, match_all, match_query, sort_asc, term, SearchBody};
use crate::response::SearchResponse;

pub struct EventsDao {
    client: Arc<EsClient>,
    fields: FieldNames,
    roots: IndexRoots,
    max_results: usize,
}

impl EventsDao {
    pub fn new(client: Arc<EsClient>, fields: FieldNames, roots: IndexRoots, max_results: usize) -> Self {
        Self {
            client,
            fields,
            roots,
            max_results,
        }
    }

    /// All events of a training definition, ascending by timestamp.
    pub async fn find_all_by_definition(
        &self,
        definition_id: i64,
        training_type: TrainingType,
    ) -> Result<Vec<Record>, SearchError> {
        let body = SearchBody::new(self.max_results)
            .query(match_all())
            .sort(sort_asc(&self.fields.timestamp))
            .build();
        let index = self.roots.events_by_definition(training_type, definition_id);
        let response = self.client.search(&index, body).await?;
        Ok(collect_sources(response))
    }

    pub async fn find_all_by_definition_and_instance(
        &self,
        definition_id: i64,
        instance_id: i64,
        training_type: TrainingType,
    ) -> Result<Vec<Record>, SearchError> {
        let body = SearchBody::new(self.max_results)
            .query(match_all())
            .sort(sort_asc(&self.fields.timestamp))
            .build();
        let index = self
            .roots
            .events_by_definition_and_instance(training_type, definition_id, instance_id);
        let response = self.client.search(&index, body).await?;
        Ok(collect_sources(response))
    }

    /// Events of one training run, selected by a term query within the
    /// definition/instance scope.
    pub async fn find_all_by_run(
        &self,
        definition_id: i64,
        instance_id: i64,
        run_id: i64,
        training_type: TrainingType,
    ) -> Result<Vec<Record>, SearchError> {
        let body = SearchBody::new(self.max_results)
            .query(term(&self.fields.training_run_id, run_id))
            .sort(sort_asc(&self.fields.timestamp))
            .build();
        let index = self
            .roots
            .events_by_definition_and_instance(training_type, definition_id, instance_id);
        let response = self.client.search(&index, body).await?;
        Ok(collect_sources(response))
    }

    /// Events of one level of an instance, collapsed on an arbitrary
    /// scalar field (typically `user_ref_id`).
    pub async fn find_by_instance_and_level(
        &self,
        instance_id: i64,
        level_id: i64,
        collapse_field: &str,
        training_type: TrainingType,
    ) -> Result<IndexMap<GroupKey, Vec<Record>>, SearchError> {
        let inner_name = format!("by_{}", collapse_field);
        let body = SearchBody::new(self.max_results)
            .query(match_query(&self.fields.level, level_id))
            .collapse(collapse(
                collapse_field,
                &inner_name,
                self.max_results,
                vec![sort_asc(&self.fields.timestamp)],
            ))
            .build();
        let index = self.roots.events_by_instance(training_type, instance_id);
        let response = self.client.search(&index, body).await?;
        single_level_groups(response, collapse_field, &inner_name)
    }

    /// Events of an instance grouped run → level → records.
    pub async fn aggregate_by_runs_then_levels(
        &self,
        instance_id: i64,
    ) -> Result<GroupedMap<GroupKey, GroupKey, Record>, SearchError> {
        let run_field = &self.fields.training_run_id;
        let inner_name = format!("by_{}", run_field);
        let body = SearchBody::new(self.max_results)
            .query(match_all())
            .sort(sort_asc(run_field))
            .collapse(collapse(
                run_field,
                &inner_name,
                self.max_results,
                vec![sort_asc(&self.fields.timestamp)],
            ))
            .build();
        let index = self.roots.events_by_instance(TrainingType::Linear, instance_id);
        let response = self.client.search(&index, body).await?;
        let groups = collapsed_groups(response, run_field, &inner_name)?;
        Ok(regroup(groups, &self.fields.level)?)
    }

    /// Events of an instance grouped level → run → records.
    pub async fn aggregate_by_levels_then_runs(
        &self,
        instance_id: i64,
    ) -> Result<GroupedMap<GroupKey, GroupKey, Record>, SearchError> {
        let level_field = &self.fields.level;
        let inner_name = format!("by_{}", level_field);
        let body = SearchBody::new(self.max_results)
            .query(match_all())
            .sort(sort_asc(level_field))
            .collapse(collapse(
                level_field,
                &inner_name,
                self.max_results,
                vec![
                    sort_asc(&self.fields.training_run_id),
                    sort_asc(&self.fields.timestamp),
                ],
            ))
            .build();
        let index = self.roots.events_by_instance(TrainingType::Linear, instance_id);
        let response = self.client.search(&index, body).await?;
        let groups = collapsed_groups(response, level_field, &inner_name)?;
        Ok(regroup(groups, &self.fields.training_run_id)?)
    }

    /// Events of a definition+instance grouped user → level → records.
    pub async fn aggregate_by_users_then_levels(
        &self,
        definition_id: i64,
        instance_id: i64,
    ) -> Result<GroupedMap<GroupKey, GroupKey, Record>, SearchError> {
        let user_field = &self.fields.user_ref_id;
        let body = SearchBody::new(self.max_results)
            .query(match_all())
            .sort(sort_asc(user_field))
            .collapse(collapse(
                user_field,
                "by_user",
                self.max_results,
                vec![sort_asc(&self.fields.timestamp)],
            ))
            .build();
        let index = self.roots.events_by_definition_and_instance_open(
            TrainingType::Linear,
            definition_id,
            instance_id,
        );
        let response = self.client.search(&index, body).await?;
        let groups = collapsed_groups(response, user_field, "by_user")?;
        Ok(regroup(groups, &self.fields.level)?)
    }

    pub async fn delete_by_instance(
        &self,
        instance_id: i64,
        training_type: TrainingType,
    ) -> Result<(), SearchError> {
        let index = self.roots.events_delete_by_instance(training_type, instance_id);
        self.client.delete_index(&index).await
    }

    pub async fn delete_by_run(
        &self,
        instance_id: i64,
        run_id: i64,
        training_type: TrainingType,
    ) -> Result<(), SearchError> {
        let index = self
            .roots
            .events_delete_by_run(training_type, instance_id, run_id);
        self.client.delete_index(&index).await
    }
}

fn collect_sources(response: SearchResponse) -> Vec<Record> {
    response.hits.hits.into_iter().map(|hit| hit.source).collect()
}

fn single_level_groups(
    response: SearchResponse,
    collapse_field: &str,
    inner_name: &str,
) -> Result<IndexMap<GroupKey, Vec<Record>>, SearchError> {
    let mut groups = IndexMap::new();
    for hit in &response.hits.hits {
        let key = hit.collapse_key(collapse_field)?;
        let records = hit.inner_records(inner_name)?;
        groups.insert(key, records);
    }
    Ok(groups)
}

fn collapsed_groups(
    response: SearchResponse,
    collapse_field: &str,
    inner_name: &str,
) -> Result<Vec<CollapsedGroup>, SearchError> {
    response
        .hits
        .hits
        .iter()
        .map(|hit| {
            Ok(CollapsedGroup {
                key: hit.collapse_key(collapse_field)?,
                records: hit.inner_records(inner_name)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collapsed_response() -> SearchResponse {
        serde_json::from_value(json!({
            "hits": {"hits": [
                {
                    "_source": {"training_run_id": 1},
                    "fields": {"training_run_id": [1]},
                    "inner_hits": {"by_training_run_id": {"hits": {"hits": [
                        {"_source": {"level": 1, "timestamp": 10}},
                        {"_source": {"level": 1, "timestamp": 20}},
                        {"_source": {"level": 2, "timestamp": 30}}
                    ]}}}
                },
                {
                    "_source": {"training_run_id": 2},
                    "fields": {"training_run_id": [2]},
                    "inner_hits": {"by_training_run_id": {"hits": {"hits": [
                        {"_source": {"level": 1, "timestamp": 15}}
                    ]}}}
                }
            ]}
        }))
        .unwrap()
    }

    #[test]
    fn test_collapsed_groups_preserve_order() {
        let groups =
            collapsed_groups(collapsed_response(), "training_run_id", "by_training_run_id")
                .unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, GroupKey::Int(1));
        assert_eq!(groups[0].records.len(), 3);
        assert_eq!(groups[1].key, GroupKey::Int(2));
    }

    #[test]
    fn test_regrouped_runs_and_levels() {
        let groups =
            collapsed_groups(collapsed_response(), "training_run_id", "by_training_run_id")
                .unwrap();
        let out = regroup(groups, "level").unwrap();
        let run_one = out.get(&GroupKey::Int(1)).unwrap();
        assert_eq!(run_one[&GroupKey::Int(1)].len(), 2);
        assert_eq!(run_one[&GroupKey::Int(2)].len(), 1);
        assert_eq!(out.total_records(), 4);
    }

    #[test]
    fn test_single_level_groups() {
        let response: SearchResponse = serde_json::from_value(json!({
            "hits": {"hits": [{
                "_source": {"user_ref_id": 7},
                "fields": {"user_ref_id": [7]},
                "inner_hits": {"by_user_ref_id": {"hits": {"hits": [
                    {"_source": {"timestamp": 1}},
                    {"_source": {"timestamp": 2}}
                ]}}}
            }]}
        }))
        .unwrap();
        let groups = single_level_groups(response, "user_ref_id", "by_user_ref_id").unwrap();
        assert_eq!(groups[&GroupKey::Int(7)].len(), 2);
    }

    #[test]
    fn test_empty_response_yields_no_groups() {
        let response: SearchResponse = serde_json::from_value(json!({})).unwrap();
        let groups = collapsed_groups(response, "level", "by_level").unwrap();
        assert!(groups.is_empty());
    }
}
