//! Training events service.

use indexmap::IndexMap;
use serde_json::Value;

use rv_core::{FieldNames, GroupKey, GroupedMap, Record, TrainingType};
use rv_search::EventsDao;

use crate::error::ServiceError;

pub struct EventsService {
    dao: EventsDao,
    fields: FieldNames,
}

impl EventsService {
    pub fn new(dao: EventsDao, fields: FieldNames) -> Self {
        Self { dao, fields }
    }

    pub async fn by_definition(
        &self,
        definition_id: i64,
        training_type: TrainingType,
    ) -> Result<Vec<Record>, ServiceError> {
        let mut records = self
            .dao
            .find_all_by_definition(definition_id, training_type)
            .await?;
        sort_by_timestamp(&mut records, &self.fields.timestamp);
        Ok(records)
    }

    pub async fn by_definition_and_instance(
        &self,
        definition_id: i64,
        instance_id: i64,
        training_type: TrainingType,
    ) -> Result<Vec<Record>, ServiceError> {
        let mut records = self
            .dao
            .find_all_by_definition_and_instance(definition_id, instance_id, training_type)
            .await?;
        sort_by_timestamp(&mut records, &self.fields.timestamp);
        Ok(records)
    }

    pub async fn by_run(
        &self,
        definition_id: i64,
        instance_id: i64,
        run_id: i64,
        training_type: TrainingType,
    ) -> Result<Vec<Record>, ServiceError> {
        let mut records = self
            .dao
            .find_all_by_run(definition_id, instance_id, run_id, training_type)
            .await?;
        sort_by_timestamp(&mut records, &self.fields.timestamp);
        Ok(records)
    }

    pub async fn by_instance_and_level(
        &self,
        instance_id: i64,
        level_id: i64,
        group_by: Option<&str>,
        training_type: TrainingType,
    ) -> Result<IndexMap<GroupKey, Vec<Record>>, ServiceError> {
        let field = group_by.unwrap_or(&self.fields.user_ref_id);
        Ok(self
            .dao
            .find_by_instance_and_level(instance_id, level_id, field, training_type)
            .await?)
    }

    pub async fn aggregated_by_runs_then_levels(
        &self,
        instance_id: i64,
    ) -> Result<GroupedMap<GroupKey, GroupKey, Record>, ServiceError> {
        Ok(self.dao.aggregate_by_runs_then_levels(instance_id).await?)
    }

    pub async fn aggregated_by_levels_then_runs(
        &self,
        instance_id: i64,
    ) -> Result<GroupedMap<GroupKey, GroupKey, Record>, ServiceError> {
        Ok(self.dao.aggregate_by_levels_then_runs(instance_id).await?)
    }

    pub async fn aggregated_by_users_then_levels(
        &self,
        definition_id: i64,
        instance_id: i64,
    ) -> Result<GroupedMap<GroupKey, GroupKey, Record>, ServiceError> {
        Ok(self
            .dao
            .aggregate_by_users_then_levels(definition_id, instance_id)
            .await?)
    }

    pub async fn delete_by_instance(
        &self,
        instance_id: i64,
        training_type: TrainingType,
    ) -> Result<(), ServiceError> {
        Ok(self.dao.delete_by_instance(instance_id, training_type).await?)
    }

    pub async fn delete_by_run(
        &self,
        instance_id: i64,
        run_id: i64,
        training_type: TrainingType,
    ) -> Result<(), ServiceError> {
        Ok(self
            .dao
            .delete_by_run(instance_id, run_id, training_type)
            .await?)
    }
}

/// Indices can be shipped out of order; flat listings are re-sorted on
/// the numeric timestamp before leaving the service. Records without one
/// sort last.
fn sort_by_timestamp(records: &mut [Record], field: &str) {
    records.sort_by_key(|r| r.get(field).and_then(Value::as_i64).unwrap_or(i64::MAX));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_sorts_on_numeric_timestamp() {
        let mut records = vec![
            record(json!({"timestamp": 30})),
            record(json!({"timestamp": 10})),
            record(json!({"timestamp": 20})),
        ];
        sort_by_timestamp(&mut records, "timestamp");
        assert_eq!(records[0]["timestamp"], json!(10));
        assert_eq!(records[2]["timestamp"], json!(30));
    }

    #[test]
    fn test_records_without_timestamp_sort_last() {
        let mut records = vec![
            record(json!({"level": 1})),
            record(json!({"timestamp": 5})),
        ];
        sort_by_timestamp(&mut records, "timestamp");
        assert_eq!(records[0]["timestamp"], json!(5));
        assert!(records[1].get("timestamp").is_none());
    }
}
