//! Index roots and scope patterns.
//!
//! Telemetry indices encode their scope in the index name
//! (`crczp.events.trainings*.definition=1.instance=2.run=3`). The builders
//! here produce the wildcard patterns used both for searching and for
//! delete-by-pattern, so a query and the delete that follows it always
//! agree on scope.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Base index names, overridable from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexRoots {
    pub events: String,
    pub adaptive_events: String,
    pub console_commands: String,
}

impl Default for IndexRoots {
    fn default() -> Self {
        Self {
            events: "crczp.events.trainings".into(),
            adaptive_events: "crczp.events.adaptive.trainings".into(),
            console_commands: "crczp.logs.console".into(),
        }
    }
}

/// Which event index family a training run writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrainingType {
    #[default]
    Linear,
    Adaptive,
}

/// Console command flavor; matches the `command_type` document field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommandType {
    Bash,
    Msf,
}

impl CommandType {
    pub fn as_field_value(&self) -> &'static str {
        match self {
            CommandType::Bash => "bash-command",
            CommandType::Msf => "msf-command",
        }
    }
}

impl IndexRoots {
    fn events_root(&self, training_type: TrainingType) -> &str {
        match training_type {
            TrainingType::Linear => &self.events,
            TrainingType::Adaptive => &self.adaptive_events,
        }
    }

    pub fn events_by_definition(&self, training_type: TrainingType, definition_id: i64) -> String {
        format!("{}*.definition={}.*", self.events_root(training_type), definition_id)
    }

    pub fn events_by_definition_and_instance(
        &self,
        training_type: TrainingType,
        definition_id: i64,
        instance_id: i64,
    ) -> String {
        format!(
            "{}*.definition={}.instance={}.*",
            self.events_root(training_type),
            definition_id,
            instance_id
        )
    }

    pub fn events_by_instance(&self, training_type: TrainingType, instance_id: i64) -> String {
        format!("{}*.instance={}*", self.events_root(training_type), instance_id)
    }

    /// Scope for the users-then-levels aggregation; keeps the definition
    /// component so runs of the same instance under another definition
    /// never leak in.
    pub fn events_by_definition_and_instance_open(
        &self,
        training_type: TrainingType,
        definition_id: i64,
        instance_id: i64,
    ) -> String {
        format!(
            "{}*.definition={}.instance={}*",
            self.events_root(training_type),
            definition_id,
            instance_id
        )
    }

    pub fn events_delete_by_instance(&self, training_type: TrainingType, instance_id: i64) -> String {
        format!("{}*.instance={}.*", self.events_root(training_type), instance_id)
    }

    pub fn events_delete_by_run(
        &self,
        training_type: TrainingType,
        instance_id: i64,
        run_id: i64,
    ) -> String {
        format!(
            "{}*.instance={}.run={}",
            self.events_root(training_type),
            instance_id,
            run_id
        )
    }

    /// Adaptive-run scope used by every statistics query.
    pub fn adaptive_events_by_run(&self, run_id: i64) -> String {
        format!("{}*.run={}", self.adaptive_events, run_id)
    }

    pub fn commands_by_pool(&self, pool_id: i64) -> String {
        format!("{}*.pool={}.*", self.console_commands, pool_id)
    }

    pub fn commands_by_sandbox(&self, sandbox_id: &str) -> String {
        format!("{}*.sandbox={}", self.console_commands, sandbox_id)
    }

    pub fn commands_by_access_token(&self, access_token: &str) -> String {
        format!("{}*.access-token={}.*", self.console_commands, access_token)
    }

    pub fn commands_by_access_token_and_user(
        &self,
        access_token: &str,
        user_id: impl Display,
    ) -> String {
        format!(
            "{}*.access-token={}.user={}",
            self.console_commands, access_token, user_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_and_adaptive_roots() {
        let roots = IndexRoots::default();
        assert_eq!(
            roots.events_by_definition(TrainingType::Linear, 5),
            "crczp.events.trainings*.definition=5.*"
        );
        assert_eq!(
            roots.events_by_definition(TrainingType::Adaptive, 5),
            "crczp.events.adaptive.trainings*.definition=5.*"
        );
    }

    #[test]
    fn test_run_scopes() {
        let roots = IndexRoots::default();
        assert_eq!(
            roots.events_by_definition_and_instance(TrainingType::Linear, 1, 2),
            "crczp.events.trainings*.definition=1.instance=2.*"
        );
        assert_eq!(
            roots.events_delete_by_run(TrainingType::Linear, 2, 3),
            "crczp.events.trainings*.instance=2.run=3"
        );
        assert_eq!(
            roots.adaptive_events_by_run(9),
            "crczp.events.adaptive.trainings*.run=9"
        );
    }

    #[test]
    fn test_command_scopes() {
        let roots = IndexRoots::default();
        assert_eq!(roots.commands_by_pool(4), "crczp.logs.console*.pool=4.*");
        assert_eq!(
            roots.commands_by_sandbox("sb-11"),
            "crczp.logs.console*.sandbox=sb-11"
        );
        assert_eq!(
            roots.commands_by_access_token_and_user("token-x", 7),
            "crczp.logs.console*.access-token=token-x.user=7"
        );
    }

    #[test]
    fn test_command_type_field_values() {
        assert_eq!(CommandType::Bash.as_field_value(), "bash-command");
        assert_eq!(CommandType::Msf.as_field_value(), "msf-command");
    }
}
