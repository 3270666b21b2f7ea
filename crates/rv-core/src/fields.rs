//! Registry of document field names.
//!
//! Queries reference telemetry fields through this struct instead of
//! scattered string literals. Built once at startup (optionally
//! overridden from configuration) and shared immutably; nothing mutates
//! it after boot.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    /// Numeric epoch-millis timestamp on training events.
    pub timestamp: String,
    /// String timestamp on console command documents.
    pub timestamp_str: String,
    pub training_run_id: String,
    pub level: String,
    pub phase_id: String,
    pub task_id: String,
    /// Fully qualified event type, e.g. `...training.events.PhaseStarted`.
    pub event_type: String,
    pub cmd: String,
    pub command_type: String,
    pub answer_content: String,
    pub sandbox_id: String,
    pub pool_id: String,
    pub user_ref_id: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            timestamp: "timestamp".into(),
            timestamp_str: "timestamp_str".into(),
            training_run_id: "training_run_id".into(),
            level: "level".into(),
            phase_id: "phase_id".into(),
            task_id: "task_id".into(),
            event_type: "type".into(),
            cmd: "cmd".into(),
            command_type: "command_type".into(),
            answer_content: "answer_content".into(),
            sandbox_id: "sandbox_id".into(),
            pool_id: "pool_id".into(),
            user_ref_id: "user_ref_id".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_document_schema() {
        let f = FieldNames::default();
        assert_eq!(f.timestamp, "timestamp");
        assert_eq!(f.event_type, "type");
        assert_eq!(f.training_run_id, "training_run_id");
    }

    #[test]
    fn test_partial_override_from_toml() {
        let f: FieldNames = toml::from_str("timestamp = \"@timestamp\"").unwrap();
        assert_eq!(f.timestamp, "@timestamp");
        assert_eq!(f.level, "level");
    }
}
