// src/handlers/penalty.rs

use crate::{
    auth::AuthUser,
    engine::{
        penalty::{self, PenaltyAction},
        period,
    },
    errors::{AppError, AppResult},
    models::{
        CreatePenaltyRequest, DisputePenaltyRequest, PenaltyRecord, PenaltyResolution,
        ResolvePenaltyRequest,
    },
    services::incentive::{fetch_config, fetch_user},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

/// Record a penalty against a user. The deduction percentage is resolved
/// from the current config and frozen onto the record.
#[utoipa::path(
    post,
    path = "/api/v1/penalties",
    request_body = CreatePenaltyRequest,
    responses(
        (status = 201, description = "Penalty created", body = PenaltyRecord),
        (status = 400, description = "Invalid month or severity"),
        (status = 403, description = "Manager role required"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Penalties"
)]
pub async fn create_penalty(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreatePenaltyRequest>,
) -> AppResult<(StatusCode, Json<PenaltyRecord>)> {
    auth.require_manager()?;
    period::parse_month(&body.month)?;

    let _ = fetch_user(&state.db, auth.organization_id, body.user_id).await?;
    let config = fetch_config(&state.db, auth.organization_id).await?;
    let percentage = penalty::resolve_percentage(body.penalty_type, body.severity, &config)?;

    let record = sqlx::query_as::<_, PenaltyRecord>(
        r#"INSERT INTO penalty_records (
            id, organization_id, user_id, month, penalty_type,
            penalty_percentage, severity, description, status
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'active')
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.organization_id)
    .bind(body.user_id)
    .bind(&body.month)
    .bind(body.penalty_type)
    .bind(percentage)
    .bind(body.severity)
    .bind(&body.description)
    .fetch_one(&state.db)
    .await?;

    info!(
        penalty_id = %record.id,
        user_id = %record.user_id,
        month = %record.month,
        percentage = %record.penalty_percentage,
        "penalty created"
    );

    Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Debug, Deserialize)]
pub struct ListPenaltiesQuery {
    pub user_id: Option<Uuid>,
    pub month: Option<String>,
}

/// List penalties, optionally filtered by user and month. Non-managers only
/// see their own.
#[utoipa::path(
    get,
    path = "/api/v1/penalties",
    params(
        ("user_id" = Option<Uuid>, Query, description = "Filter by user"),
        ("month" = Option<String>, Query, description = "Filter by month (YYYY-MM)"),
    ),
    responses((status = 200, description = "List of penalties", body = Vec<PenaltyRecord>)),
    security(("bearer_auth" = [])),
    tag = "Penalties"
)]
pub async fn list_penalties(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListPenaltiesQuery>,
) -> AppResult<Json<Vec<PenaltyRecord>>> {
    let user_filter = if auth.require_manager().is_ok() {
        query.user_id
    } else {
        Some(auth.id)
    };

    let records = sqlx::query_as::<_, PenaltyRecord>(
        r#"SELECT * FROM penalty_records
           WHERE organization_id = $1
             AND ($2::uuid IS NULL OR user_id = $2)
             AND ($3::text IS NULL OR month = $3)
           ORDER BY created_at DESC"#,
    )
    .bind(auth.organization_id)
    .bind(user_filter)
    .bind(&query.month)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(records))
}

/// Contest a penalty. Only the penalised user may do this, only while the
/// penalty is active; a disputed penalty stops counting until resolved.
#[utoipa::path(
    post,
    path = "/api/v1/penalties/{penalty_id}/dispute",
    request_body = DisputePenaltyRequest,
    params(("penalty_id" = Uuid, Path, description = "Penalty ID")),
    responses(
        (status = 200, description = "Penalty disputed", body = PenaltyRecord),
        (status = 403, description = "Not the penalised user"),
        (status = 422, description = "Penalty is not active"),
    ),
    security(("bearer_auth" = [])),
    tag = "Penalties"
)]
pub async fn dispute_penalty(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(penalty_id): Path<Uuid>,
    Json(body): Json<DisputePenaltyRequest>,
) -> AppResult<Json<PenaltyRecord>> {
    if body.reason.trim().is_empty() {
        return Err(AppError::Validation("A dispute reason is required".to_string()));
    }

    let record = fetch_penalty(&state, auth.organization_id, penalty_id).await?;
    let next = penalty::transition(&record, PenaltyAction::Dispute, auth.id, auth.role)?;

    let updated = sqlx::query_as::<_, PenaltyRecord>(
        r#"UPDATE penalty_records
           SET status = $1, dispute_reason = $2, updated_at = NOW()
           WHERE id = $3 AND status = 'active'
           RETURNING *"#,
    )
    .bind(next)
    .bind(body.reason.trim())
    .bind(penalty_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| {
        AppError::Precondition(format!(
            "Penalty {} changed state while being disputed",
            penalty_id
        ))
    })?;

    Ok(Json(updated))
}

/// Resolve a disputed penalty: waive it (dispute upheld, stops counting) or
/// resolve it (dispute rejected, counts again). If the month was already
/// finalized, a waiver takes effect only after an explicit incentive re-open
/// and recompute.
#[utoipa::path(
    post,
    path = "/api/v1/penalties/{penalty_id}/resolve",
    request_body = ResolvePenaltyRequest,
    params(("penalty_id" = Uuid, Path, description = "Penalty ID")),
    responses(
        (status = 200, description = "Penalty resolved", body = PenaltyRecord),
        (status = 403, description = "Manager role required"),
        (status = 422, description = "Penalty is not disputed"),
    ),
    security(("bearer_auth" = [])),
    tag = "Penalties"
)]
pub async fn resolve_penalty(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(penalty_id): Path<Uuid>,
    Json(body): Json<ResolvePenaltyRequest>,
) -> AppResult<Json<PenaltyRecord>> {
    if body.notes.trim().is_empty() {
        return Err(AppError::Validation("Resolution notes are required".to_string()));
    }

    let record = fetch_penalty(&state, auth.organization_id, penalty_id).await?;
    let action = match body.resolution {
        PenaltyResolution::Waived => PenaltyAction::Waive,
        PenaltyResolution::Resolved => PenaltyAction::Resolve,
    };
    let next = penalty::transition(&record, action, auth.id, auth.role)?;

    let updated = sqlx::query_as::<_, PenaltyRecord>(
        r#"UPDATE penalty_records
           SET status = $1, resolution_notes = $2, updated_at = NOW()
           WHERE id = $3 AND status = 'disputed'
           RETURNING *"#,
    )
    .bind(next)
    .bind(body.notes.trim())
    .bind(penalty_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| {
        AppError::Precondition(format!(
            "Penalty {} changed state while being resolved",
            penalty_id
        ))
    })?;

    info!(
        penalty_id = %penalty_id,
        resolution = ?body.resolution,
        "penalty dispute resolved"
    );

    Ok(Json(updated))
}

async fn fetch_penalty(
    state: &AppState,
    organization_id: Uuid,
    penalty_id: Uuid,
) -> AppResult<PenaltyRecord> {
    sqlx::query_as::<_, PenaltyRecord>(
        "SELECT * FROM penalty_records WHERE id = $1 AND organization_id = $2",
    )
    .bind(penalty_id)
    .bind(organization_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Penalty {} not found", penalty_id)))
}
