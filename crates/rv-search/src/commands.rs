//! Console commands DAO.
//!
//! Sandbox console commands live under their own index family, scoped by
//! pool, sandbox, or access-token/user in the index name. Filtering on
//! command text is pushed down as a regexp (the alternation of the
//! requested commands), so matching happens in the backend.

use std::sync::Arc;

use rv_core::{CommandType, FieldNames, Record};

use crate::client::EsClient;
use crate::error::SearchError;
use crate::query::{match_all, must_all, range, regexp, sort_asc, SearchBody};
use crate::response::SearchResponse;

/// Optional pushdown filters for command listings.
#[derive(Debug, Default, Clone)]
pub struct CommandFilter {
    /// Commands to match; joined with `|` into one regexp on `cmd`.
    pub commands: Option<Vec<String>>,
    pub command_type: Option<CommandType>,
}

impl CommandFilter {
    fn clauses(&self, fields: &FieldNames) -> Vec<serde_json::Value> {
        let mut clauses = Vec::new();
        if let Some(commands) = &self.commands {
            if !commands.is_empty() {
                clauses.push(regexp(&fields.cmd, &commands.join("|")));
            }
        }
        if let Some(command_type) = self.command_type {
            clauses.push(regexp(&fields.command_type, command_type.as_field_value()));
        }
        clauses
    }
}

pub struct CommandsDao {
    client: Arc<EsClient>,
    fields: FieldNames,
    max_results: usize,
}

impl CommandsDao {
    pub fn new(client: Arc<EsClient>, fields: FieldNames, max_results: usize) -> Self {
        Self {
            client,
            fields,
            max_results,
        }
    }

    /// All commands under the given index scope, ascending by timestamp.
    pub async fn find_all(
        &self,
        index_pattern: &str,
        filter: &CommandFilter,
    ) -> Result<Vec<Record>, SearchError> {
        let clauses = filter.clauses(&self.fields);
        let query = if clauses.is_empty() {
            match_all()
        } else {
            must_all(clauses)
        };
        let body = SearchBody::new(self.max_results)
            .query(query)
            .sort(sort_asc(&self.fields.timestamp_str))
            .build();
        let response = self.client.search(index_pattern, body).await?;
        Ok(collect_sources(response))
    }

    /// Commands within `[from, to]` (epoch millis on `timestamp_str`).
    pub async fn find_in_time_range(
        &self,
        index_pattern: &str,
        from: i64,
        to: i64,
        filter: &CommandFilter,
    ) -> Result<Vec<Record>, SearchError> {
        let mut clauses = vec![range(&self.fields.timestamp_str, from, to)];
        clauses.extend(filter.clauses(&self.fields));
        let body = SearchBody::new(self.max_results)
            .query(must_all(clauses))
            .sort(sort_asc(&self.fields.timestamp_str))
            .build();
        let response = self.client.search(index_pattern, body).await?;
        Ok(collect_sources(response))
    }

    pub async fn delete(&self, index_pattern: &str) -> Result<(), SearchError> {
        self.client.delete_index(index_pattern).await
    }
}

fn collect_sources(response: SearchResponse) -> Vec<Record> {
    response.hits.hits.into_iter().map(|hit| hit.source).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_joins_commands_into_alternation() {
        let filter = CommandFilter {
            commands: Some(vec!["ls".into(), "cat".into(), "nmap".into()]),
            command_type: None,
        };
        let clauses = filter.clauses(&FieldNames::default());
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0]["regexp"]["cmd"]["value"], "ls|cat|nmap");
    }

    #[test]
    fn test_filter_combines_commands_and_type() {
        let filter = CommandFilter {
            commands: Some(vec!["ssh".into()]),
            command_type: Some(CommandType::Msf),
        };
        let clauses = filter.clauses(&FieldNames::default());
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[1]["regexp"]["command_type"]["value"], "msf-command");
    }

    #[test]
    fn test_empty_filter_has_no_clauses() {
        let filter = CommandFilter::default();
        assert!(filter.clauses(&FieldNames::default()).is_empty());
        let filter = CommandFilter {
            commands: Some(Vec::new()),
            command_type: None,
        };
        assert!(filter.clauses(&FieldNames::default()).is_empty());
    }

    #[test]
    fn test_collect_sources_in_response_order() {
        let response: SearchResponse = serde_json::from_value(json!({
            "hits": {"hits": [
                {"_source": {"cmd": "ls -la", "timestamp_str": "1"}},
                {"_source": {"cmd": "cat /etc/passwd", "timestamp_str": "2"}}
            ]}
        }))
        .unwrap();
        let records = collect_sources(response);
        assert_eq!(records[0]["cmd"], json!("ls -la"));
        assert_eq!(records[1]["cmd"], json!("cat /etc/passwd"));
    }
}
