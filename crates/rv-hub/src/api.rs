//! REST handlers.
//!
//! Thin translation between HTTP and the service layer: path/query
//! parsing here, semantics in `services`, HTTP status mapping in
//! `error`.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use rv_core::{CommandType, GroupKey, GroupedMap, Record, TrainingType};
use rv_search::CommandFilter;

use crate::error::ServiceError;
use crate::services::KeywordsMapping;
use crate::AppState;

type ApiResult<T> = Result<Json<T>, ServiceError>;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingTypeParams {
    #[serde(default)]
    training_type: TrainingType,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelParams {
    #[serde(default)]
    training_type: TrainingType,
    group_by: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandParams {
    /// Comma-separated command list.
    commands: Option<String>,
    command_type: Option<CommandType>,
}

impl CommandParams {
    fn filter(&self) -> CommandFilter {
        CommandFilter {
            commands: self.commands.as_deref().map(split_comma_list),
            command_type: self.command_type,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeParams {
    from: i64,
    to: i64,
    commands: Option<String>,
    command_type: Option<CommandType>,
}

impl RangeParams {
    fn filter(&self) -> CommandFilter {
        CommandFilter {
            commands: self.commands.as_deref().map(split_comma_list),
            command_type: self.command_type,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseParams {
    /// Comma-separated phase id list.
    phase_ids: String,
    access_token: Option<String>,
    user_id: Option<i64>,
}

fn split_comma_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_phase_ids(raw: &str) -> Result<Vec<i64>, ServiceError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| ServiceError::BadRequest(format!("invalid phase id `{}`", s)))
        })
        .collect()
}

// ===== Events =====

pub async fn events_by_definition(
    State(state): State<Arc<AppState>>,
    Path(definition_id): Path<i64>,
    Query(params): Query<TrainingTypeParams>,
) -> ApiResult<Vec<Record>> {
    Ok(Json(
        state
            .events
            .by_definition(definition_id, params.training_type)
            .await?,
    ))
}

pub async fn events_by_definition_and_instance(
    State(state): State<Arc<AppState>>,
    Path((definition_id, instance_id)): Path<(i64, i64)>,
    Query(params): Query<TrainingTypeParams>,
) -> ApiResult<Vec<Record>> {
    Ok(Json(
        state
            .events
            .by_definition_and_instance(definition_id, instance_id, params.training_type)
            .await?,
    ))
}

pub async fn events_by_run(
    State(state): State<Arc<AppState>>,
    Path((definition_id, instance_id, run_id)): Path<(i64, i64, i64)>,
    Query(params): Query<TrainingTypeParams>,
) -> ApiResult<Vec<Record>> {
    Ok(Json(
        state
            .events
            .by_run(definition_id, instance_id, run_id, params.training_type)
            .await?,
    ))
}

pub async fn events_by_instance_and_level(
    State(state): State<Arc<AppState>>,
    Path((instance_id, level_id)): Path<(i64, i64)>,
    Query(params): Query<LevelParams>,
) -> ApiResult<IndexMap<GroupKey, Vec<Record>>> {
    Ok(Json(
        state
            .events
            .by_instance_and_level(
                instance_id,
                level_id,
                params.group_by.as_deref(),
                params.training_type,
            )
            .await?,
    ))
}

pub async fn events_aggregated_runs_levels(
    State(state): State<Arc<AppState>>,
    Path(instance_id): Path<i64>,
) -> ApiResult<GroupedMap<GroupKey, GroupKey, Record>> {
    Ok(Json(
        state.events.aggregated_by_runs_then_levels(instance_id).await?,
    ))
}

pub async fn events_aggregated_levels_runs(
    State(state): State<Arc<AppState>>,
    Path(instance_id): Path<i64>,
) -> ApiResult<GroupedMap<GroupKey, GroupKey, Record>> {
    Ok(Json(
        state.events.aggregated_by_levels_then_runs(instance_id).await?,
    ))
}

pub async fn events_aggregated_users_levels(
    State(state): State<Arc<AppState>>,
    Path((definition_id, instance_id)): Path<(i64, i64)>,
) -> ApiResult<GroupedMap<GroupKey, GroupKey, Record>> {
    Ok(Json(
        state
            .events
            .aggregated_by_users_then_levels(definition_id, instance_id)
            .await?,
    ))
}

pub async fn delete_events_by_instance(
    State(state): State<Arc<AppState>>,
    Path(instance_id): Path<i64>,
    Query(params): Query<TrainingTypeParams>,
) -> Result<StatusCode, ServiceError> {
    state
        .events
        .delete_by_instance(instance_id, params.training_type)
        .await?;
    Ok(StatusCode::OK)
}

pub async fn delete_events_by_run(
    State(state): State<Arc<AppState>>,
    Path((instance_id, run_id)): Path<(i64, i64)>,
    Query(params): Query<TrainingTypeParams>,
) -> Result<StatusCode, ServiceError> {
    state
        .events
        .delete_by_run(instance_id, run_id, params.training_type)
        .await?;
    Ok(StatusCode::OK)
}

// ===== Console commands =====

pub async fn commands_by_pool(
    State(state): State<Arc<AppState>>,
    Path(pool_id): Path<i64>,
    Query(params): Query<CommandParams>,
) -> ApiResult<Vec<Record>> {
    Ok(Json(state.commands.by_pool(pool_id, &params.filter()).await?))
}

pub async fn commands_by_sandbox(
    State(state): State<Arc<AppState>>,
    Path(sandbox_id): Path<String>,
    Query(params): Query<CommandParams>,
) -> ApiResult<Vec<Record>> {
    Ok(Json(
        state.commands.by_sandbox(&sandbox_id, &params.filter()).await?,
    ))
}

pub async fn commands_by_access_token(
    State(state): State<Arc<AppState>>,
    Path(access_token): Path<String>,
    Query(params): Query<CommandParams>,
) -> ApiResult<Vec<Record>> {
    Ok(Json(
        state
            .commands
            .by_access_token(&access_token, &params.filter())
            .await?,
    ))
}

pub async fn commands_by_access_token_and_user(
    State(state): State<Arc<AppState>>,
    Path((access_token, user_id)): Path<(String, i64)>,
    Query(params): Query<CommandParams>,
) -> ApiResult<Vec<Record>> {
    Ok(Json(
        state
            .commands
            .by_access_token_and_user(&access_token, user_id, &params.filter())
            .await?,
    ))
}

pub async fn commands_by_sandbox_in_range(
    State(state): State<Arc<AppState>>,
    Path(sandbox_id): Path<String>,
    Query(params): Query<RangeParams>,
) -> ApiResult<Vec<Record>> {
    Ok(Json(
        state
            .commands
            .by_sandbox_in_range(&sandbox_id, params.from, params.to, &params.filter())
            .await?,
    ))
}

pub async fn commands_by_user_in_range(
    State(state): State<Arc<AppState>>,
    Path((access_token, user_id)): Path<(String, i64)>,
    Query(params): Query<RangeParams>,
) -> ApiResult<Vec<Record>> {
    Ok(Json(
        state
            .commands
            .by_user_in_range(&access_token, user_id, params.from, params.to, &params.filter())
            .await?,
    ))
}

pub async fn delete_commands_by_pool(
    State(state): State<Arc<AppState>>,
    Path(pool_id): Path<i64>,
) -> Result<StatusCode, ServiceError> {
    state.commands.delete_by_pool(pool_id).await?;
    Ok(StatusCode::OK)
}

pub async fn delete_commands_by_sandbox(
    State(state): State<Arc<AppState>>,
    Path(sandbox_id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    state.commands.delete_by_sandbox(&sandbox_id).await?;
    Ok(StatusCode::OK)
}

pub async fn delete_commands_by_access_token(
    State(state): State<Arc<AppState>>,
    Path(access_token): Path<String>,
) -> Result<StatusCode, ServiceError> {
    state.commands.delete_by_access_token(&access_token).await?;
    Ok(StatusCode::OK)
}

pub async fn delete_commands_by_access_token_and_user(
    State(state): State<Arc<AppState>>,
    Path((access_token, user_id)): Path<(String, i64)>,
) -> Result<StatusCode, ServiceError> {
    state
        .commands
        .delete_by_access_token_and_user(&access_token, user_id)
        .await?;
    Ok(StatusCode::OK)
}

// ===== Adaptive run statistics =====

pub async fn stats_commands(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<i64>,
    Query(params): Query<PhaseParams>,
    body: Option<Json<KeywordsMapping>>,
) -> ApiResult<Vec<rv_core::stats::CommandsStatistics>> {
    let phase_ids = parse_phase_ids(&params.phase_ids)?;
    let keywords = body.map(|Json(mapping)| mapping);
    Ok(Json(
        state
            .statistics
            .commands_statistics(
                run_id,
                &phase_ids,
                params.access_token.as_deref(),
                params.user_id,
                keywords.as_ref(),
            )
            .await?,
    ))
}

pub async fn stats_phase_time(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<i64>,
    Query(params): Query<PhaseParams>,
) -> ApiResult<IndexMap<i64, i64>> {
    let phase_ids = parse_phase_ids(&params.phase_ids)?;
    Ok(Json(
        state.statistics.phase_time_statistics(run_id, &phase_ids).await?,
    ))
}

pub async fn stats_solutions(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<i64>,
    Query(params): Query<PhaseParams>,
) -> ApiResult<IndexMap<i64, bool>> {
    let phase_ids = parse_phase_ids(&params.phase_ids)?;
    Ok(Json(
        state
            .statistics
            .phase_solution_statistics(run_id, &phase_ids)
            .await?,
    ))
}

pub async fn stats_wrong_answers(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<i64>,
    Query(params): Query<PhaseParams>,
) -> ApiResult<IndexMap<i64, Vec<String>>> {
    let phase_ids = parse_phase_ids(&params.phase_ids)?;
    Ok(Json(
        state
            .statistics
            .phase_wrong_answer_statistics(run_id, &phase_ids)
            .await?,
    ))
}

pub async fn stats_overall(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<i64>,
    Query(params): Query<PhaseParams>,
    body: Option<Json<KeywordsMapping>>,
) -> ApiResult<Vec<rv_core::stats::OverallPhaseStatistics>> {
    let phase_ids = parse_phase_ids(&params.phase_ids)?;
    let keywords = body.map(|Json(mapping)| mapping);
    Ok(Json(
        state
            .statistics
            .overall_statistics(
                run_id,
                &phase_ids,
                params.access_token.as_deref(),
                params.user_id,
                keywords.as_ref(),
            )
            .await?,
    ))
}

// ===== Health =====

pub async fn health() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
