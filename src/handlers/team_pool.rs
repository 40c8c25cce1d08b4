// src/handlers/team_pool.rs

use crate::{
    auth::AuthUser,
    engine::period,
    errors::{AppError, AppResult},
    models::{CreateTeamPoolRequest, PoolStatus, TeamPoolDistribution},
    services::{incentive::fetch_config, team_pool},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal_macros::dec;
use serde::Deserialize;
use uuid::Uuid;

/// Compute the team pool distribution for a month: rank the reps, slice the
/// pool across the six configured buckets, persist as `pending_approval`.
/// Re-running returns the existing record when it was already distributed.
#[utoipa::path(
    post,
    path = "/api/v1/team-pool",
    request_body = CreateTeamPoolRequest,
    responses(
        (status = 201, description = "Distribution computed", body = TeamPoolDistribution),
        (status = 403, description = "Manager role required"),
        (status = 422, description = "Distribution already approved"),
    ),
    security(("bearer_auth" = [])),
    tag = "Team Pool"
)]
pub async fn create_team_pool(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateTeamPoolRequest>,
) -> AppResult<(StatusCode, Json<TeamPoolDistribution>)> {
    auth.require_manager()?;
    period::parse_month(&body.month)?;

    if body.total_pool_amount <= dec!(0) {
        return Err(AppError::Validation(
            "Pool amount must be greater than zero".to_string(),
        ));
    }

    let config = fetch_config(&state.db, auth.organization_id).await?;
    let distribution = team_pool::create_distribution(
        &state.db,
        &config,
        auth.organization_id,
        &body.month,
        body.total_pool_amount,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(distribution)))
}

#[derive(Debug, Deserialize)]
pub struct GetTeamPoolQuery {
    pub month: String,
}

/// Get the distribution for a month.
#[utoipa::path(
    get,
    path = "/api/v1/team-pool",
    params(("month" = String, Query, description = "Month (YYYY-MM)")),
    responses(
        (status = 200, description = "Distribution detail", body = TeamPoolDistribution),
        (status = 404, description = "No distribution for this month"),
    ),
    security(("bearer_auth" = [])),
    tag = "Team Pool"
)]
pub async fn get_team_pool(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<GetTeamPoolQuery>,
) -> AppResult<Json<TeamPoolDistribution>> {
    period::parse_month(&query.month)?;

    let distribution = team_pool::fetch_by_month(&state.db, auth.organization_id, &query.month)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("No team pool distribution for {}", query.month))
        })?;

    Ok(Json(distribution))
}

/// Approve a pending distribution.
#[utoipa::path(
    post,
    path = "/api/v1/team-pool/{distribution_id}/approve",
    params(("distribution_id" = Uuid, Path, description = "Distribution ID")),
    responses(
        (status = 200, description = "Distribution approved", body = TeamPoolDistribution),
        (status = 403, description = "Manager role required"),
        (status = 422, description = "Distribution is not pending approval"),
    ),
    security(("bearer_auth" = [])),
    tag = "Team Pool"
)]
pub async fn approve_team_pool(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(distribution_id): Path<Uuid>,
) -> AppResult<Json<TeamPoolDistribution>> {
    auth.require_manager()?;
    let updated = team_pool::advance(
        &state.db,
        auth.organization_id,
        distribution_id,
        PoolStatus::Approved,
    )
    .await?;
    Ok(Json(updated))
}

/// Mark an approved distribution as distributed. Terminal; re-triggering
/// returns the same record.
#[utoipa::path(
    post,
    path = "/api/v1/team-pool/{distribution_id}/distribute",
    params(("distribution_id" = Uuid, Path, description = "Distribution ID")),
    responses(
        (status = 200, description = "Distribution marked distributed", body = TeamPoolDistribution),
        (status = 403, description = "Manager role required"),
        (status = 422, description = "Distribution is not approved"),
    ),
    security(("bearer_auth" = [])),
    tag = "Team Pool"
)]
pub async fn distribute_team_pool(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(distribution_id): Path<Uuid>,
) -> AppResult<Json<TeamPoolDistribution>> {
    auth.require_manager()?;
    let updated = team_pool::advance(
        &state.db,
        auth.organization_id,
        distribution_id,
        PoolStatus::Distributed,
    )
    .await?;
    Ok(Json(updated))
}
