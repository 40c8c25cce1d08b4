// src/handlers/incentive.rs

use crate::{
    auth::AuthUser,
    engine::{incentive::IncentiveBreakdown, period},
    errors::{AppError, AppResult},
    models::{
        ApproveIncentiveRequest, BulkApproveOutcome, BulkApproveRequest, BulkApproveResponse,
        FinalizeMonthRequest, FinalizeMonthResponse, IncentiveStatus, MarkPaidRequest,
        MonthlyIncentive,
    },
    services::incentive::{calculate, fetch_config, fetch_user, finalize_month},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

/// Compute a user's incentive breakdown for a month without persisting
/// anything. Managers may preview anyone; other users only themselves.
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/incentives/{month}",
    params(
        ("user_id" = Uuid, Path, description = "User ID"),
        ("month" = String, Path, description = "Month (YYYY-MM)"),
    ),
    responses(
        (status = 200, description = "Computed breakdown", body = IncentiveBreakdown),
        (status = 404, description = "User or config not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Incentives"
)]
pub async fn preview_incentive(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((user_id, month)): Path<(Uuid, String)>,
) -> AppResult<Json<IncentiveBreakdown>> {
    if auth.require_manager().is_err() && auth.id != user_id {
        return Err(AppError::Forbidden(
            "You may only view your own incentive".to_string(),
        ));
    }
    period::parse_month(&month)?;

    let config = fetch_config(&state.db, auth.organization_id).await?;
    let user = fetch_user(&state.db, auth.organization_id, user_id).await?;
    let breakdown = calculate(&state.db, &config, &user, &month).await?;

    Ok(Json(breakdown))
}

/// Finalize the month for the whole organization: compute and persist every
/// active sales rep's incentive as `pending_review`. Per-user failures are
/// reported individually and never block the rest of the batch.
#[utoipa::path(
    post,
    path = "/api/v1/incentives/finalize",
    request_body = FinalizeMonthRequest,
    responses(
        (status = 200, description = "Per-user finalization results", body = FinalizeMonthResponse),
        (status = 403, description = "Manager role required"),
        (status = 404, description = "Incentive config not set"),
    ),
    security(("bearer_auth" = [])),
    tag = "Incentives"
)]
pub async fn finalize_organization_month(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<FinalizeMonthRequest>,
) -> AppResult<Json<FinalizeMonthResponse>> {
    auth.require_manager()?;
    period::parse_month(&body.month)?;

    let config = fetch_config(&state.db, auth.organization_id).await?;
    let response = finalize_month(&state.db, &config, auth.organization_id, &body.month).await?;

    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct ListIncentivesQuery {
    pub month: Option<String>,
    pub status: Option<IncentiveStatus>,
}

/// List the organization's monthly incentive records.
#[utoipa::path(
    get,
    path = "/api/v1/incentives",
    params(
        ("month" = Option<String>, Query, description = "Filter by month (YYYY-MM)"),
        ("status" = Option<IncentiveStatus>, Query, description = "Filter by status"),
    ),
    responses((status = 200, description = "List of incentives", body = Vec<MonthlyIncentive>)),
    security(("bearer_auth" = [])),
    tag = "Incentives"
)]
pub async fn list_incentives(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListIncentivesQuery>,
) -> AppResult<Json<Vec<MonthlyIncentive>>> {
    let user_filter = if auth.require_manager().is_ok() {
        None
    } else {
        Some(auth.id)
    };

    let incentives = sqlx::query_as::<_, MonthlyIncentive>(
        r#"SELECT * FROM monthly_incentives
           WHERE organization_id = $1
             AND ($2::text IS NULL OR month = $2)
             AND ($3::incentive_status IS NULL OR status = $3)
             AND ($4::uuid IS NULL OR user_id = $4)
           ORDER BY month DESC, net_incentive DESC"#,
    )
    .bind(auth.organization_id)
    .bind(&query.month)
    .bind(query.status)
    .bind(user_filter)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(incentives))
}

/// Approve or reject a pending incentive. On approval a manager may override
/// the payable amount; the override and notes are recorded on the row.
#[utoipa::path(
    post,
    path = "/api/v1/incentives/{incentive_id}/approve",
    request_body = ApproveIncentiveRequest,
    params(("incentive_id" = Uuid, Path, description = "Incentive ID")),
    responses(
        (status = 200, description = "Incentive approved or rejected", body = MonthlyIncentive),
        (status = 403, description = "Manager role required"),
        (status = 422, description = "Incentive is not pending review"),
    ),
    security(("bearer_auth" = [])),
    tag = "Incentives"
)]
pub async fn approve_incentive(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(incentive_id): Path<Uuid>,
    Json(body): Json<ApproveIncentiveRequest>,
) -> AppResult<Json<MonthlyIncentive>> {
    auth.require_manager()?;

    let updated = if body.approved {
        approve_one(
            &state.db,
            auth.organization_id,
            incentive_id,
            body.final_amount,
            body.notes.as_deref(),
        )
        .await?
    } else {
        let notes = body
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                AppError::Validation("Rejection requires notes".to_string())
            })?;
        reject_one(&state.db, auth.organization_id, incentive_id, notes).await?
    };

    Ok(Json(updated))
}

/// Approve many pending incentives at their computed amounts. Each record
/// succeeds or fails on its own; there is no cross-record rollback.
#[utoipa::path(
    post,
    path = "/api/v1/incentives/bulk-approve",
    request_body = BulkApproveRequest,
    responses(
        (status = 200, description = "Per-id approval results", body = BulkApproveResponse),
        (status = 403, description = "Manager role required"),
    ),
    security(("bearer_auth" = [])),
    tag = "Incentives"
)]
pub async fn bulk_approve(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<BulkApproveRequest>,
) -> AppResult<Json<BulkApproveResponse>> {
    auth.require_manager()?;

    let mut results = Vec::with_capacity(body.incentive_ids.len());
    for incentive_id in &body.incentive_ids {
        let outcome = match approve_one(
            &state.db,
            auth.organization_id,
            *incentive_id,
            None,
            body.notes.as_deref(),
        )
        .await
        {
            Ok(incentive) => BulkApproveOutcome {
                incentive_id: *incentive_id,
                ok: true,
                detail: format!("approved at {}", incentive.final_approved_amount.unwrap_or(dec!(0))),
            },
            Err(e) => BulkApproveOutcome {
                incentive_id: *incentive_id,
                ok: false,
                detail: e.to_string(),
            },
        };
        results.push(outcome);
    }

    let success_count = results.iter().filter(|r| r.ok).count();
    let error_count = results.len() - success_count;

    Ok(Json(BulkApproveResponse {
        success_count,
        error_count,
        results,
    }))
}

/// Mark an approved incentive as paid, optionally recording a payment
/// reference. Paying a record in any other state is a precondition failure.
#[utoipa::path(
    post,
    path = "/api/v1/incentives/{incentive_id}/pay",
    request_body = MarkPaidRequest,
    params(("incentive_id" = Uuid, Path, description = "Incentive ID")),
    responses(
        (status = 200, description = "Incentive marked paid", body = MonthlyIncentive),
        (status = 403, description = "Manager role required"),
        (status = 422, description = "Incentive is not approved"),
    ),
    security(("bearer_auth" = [])),
    tag = "Incentives"
)]
pub async fn mark_paid(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(incentive_id): Path<Uuid>,
    Json(body): Json<MarkPaidRequest>,
) -> AppResult<Json<MonthlyIncentive>> {
    auth.require_manager()?;

    let existing = fetch_incentive(&state.db, auth.organization_id, incentive_id).await?;
    if !existing.status.can_advance_to(IncentiveStatus::Paid) {
        return Err(AppError::Precondition(format!(
            "Only approved incentives can be paid (current status: {})",
            existing.status.as_str()
        )));
    }

    // The status predicate re-checks the precondition inside the UPDATE so a
    // concurrent transition between the fetch and this write cannot slip an
    // illegal edge through.
    let updated = sqlx::query_as::<_, MonthlyIncentive>(
        r#"UPDATE monthly_incentives
           SET status = 'paid', payment_reference = $1, updated_at = NOW()
           WHERE id = $2 AND status = 'approved'
           RETURNING *"#,
    )
    .bind(&body.payment_reference)
    .bind(incentive_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| {
        AppError::Precondition(format!(
            "Incentive {} changed state while being marked paid",
            incentive_id
        ))
    })?;

    info!(
        incentive_id = %incentive_id,
        amount = %updated.final_approved_amount.unwrap_or(dec!(0)),
        "incentive paid"
    );

    Ok(Json(updated))
}

/// Re-open a finalized incentive so it can be recomputed, e.g. after a
/// penalty was waived post-finalization. Deliberately manual; paid records
/// are terminal.
#[utoipa::path(
    post,
    path = "/api/v1/incentives/{incentive_id}/reopen",
    params(("incentive_id" = Uuid, Path, description = "Incentive ID")),
    responses(
        (status = 200, description = "Incentive re-opened", body = MonthlyIncentive),
        (status = 403, description = "Manager role required"),
        (status = 422, description = "Incentive cannot be re-opened"),
    ),
    security(("bearer_auth" = [])),
    tag = "Incentives"
)]
pub async fn reopen_incentive(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(incentive_id): Path<Uuid>,
) -> AppResult<Json<MonthlyIncentive>> {
    auth.require_manager()?;

    let existing = fetch_incentive(&state.db, auth.organization_id, incentive_id).await?;
    if !existing.status.can_reopen() {
        return Err(AppError::Precondition(format!(
            "Incentive with status {} cannot be re-opened",
            existing.status.as_str()
        )));
    }

    let updated = sqlx::query_as::<_, MonthlyIncentive>(
        r#"UPDATE monthly_incentives
           SET status = 'calculating',
               final_approved_amount = NULL,
               payment_reference = NULL,
               updated_at = NOW()
           WHERE id = $1 AND status IN ('pending_review', 'rejected', 'approved')
           RETURNING *"#,
    )
    .bind(incentive_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| {
        AppError::Precondition(format!(
            "Incentive {} changed state while being re-opened",
            incentive_id
        ))
    })?;

    info!(incentive_id = %incentive_id, "incentive re-opened for recomputation");

    Ok(Json(updated))
}

// ─── Shared transition helpers ────────────────────────────────────────────────

async fn fetch_incentive(
    db: &PgPool,
    organization_id: Uuid,
    incentive_id: Uuid,
) -> AppResult<MonthlyIncentive> {
    sqlx::query_as::<_, MonthlyIncentive>(
        "SELECT * FROM monthly_incentives WHERE id = $1 AND organization_id = $2",
    )
    .bind(incentive_id)
    .bind(organization_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Incentive {} not found", incentive_id)))
}

async fn approve_one(
    db: &PgPool,
    organization_id: Uuid,
    incentive_id: Uuid,
    final_amount: Option<Decimal>,
    notes: Option<&str>,
) -> AppResult<MonthlyIncentive> {
    let existing = fetch_incentive(db, organization_id, incentive_id).await?;
    if !existing.status.can_advance_to(IncentiveStatus::Approved) {
        return Err(AppError::Precondition(format!(
            "Only pending_review incentives can be approved (current status: {})",
            existing.status.as_str()
        )));
    }

    let computed = existing.capped_amount.unwrap_or(existing.net_incentive);
    let amount = final_amount.unwrap_or(computed);
    if amount < dec!(0) {
        return Err(AppError::Validation(
            "Approved amount must not be negative".to_string(),
        ));
    }
    if amount != computed {
        info!(
            incentive_id = %incentive_id,
            computed = %computed,
            approved = %amount,
            "manager adjusted payout before approval"
        );
    }

    let updated = sqlx::query_as::<_, MonthlyIncentive>(
        r#"UPDATE monthly_incentives
           SET status = 'approved',
               final_approved_amount = $1,
               review_notes = $2,
               updated_at = NOW()
           WHERE id = $3 AND status = 'pending_review'
           RETURNING *"#,
    )
    .bind(amount)
    .bind(notes)
    .bind(incentive_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| {
        AppError::Precondition(format!(
            "Incentive {} changed state while being approved",
            incentive_id
        ))
    })?;

    Ok(updated)
}

async fn reject_one(
    db: &PgPool,
    organization_id: Uuid,
    incentive_id: Uuid,
    notes: &str,
) -> AppResult<MonthlyIncentive> {
    let existing = fetch_incentive(db, organization_id, incentive_id).await?;
    if !existing.status.can_advance_to(IncentiveStatus::Rejected) {
        return Err(AppError::Precondition(format!(
            "Only pending_review incentives can be rejected (current status: {})",
            existing.status.as_str()
        )));
    }

    let updated = sqlx::query_as::<_, MonthlyIncentive>(
        r#"UPDATE monthly_incentives
           SET status = 'rejected', review_notes = $1, updated_at = NOW()
           WHERE id = $2 AND status = 'pending_review'
           RETURNING *"#,
    )
    .bind(notes)
    .bind(incentive_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| {
        AppError::Precondition(format!(
            "Incentive {} changed state while being rejected",
            incentive_id
        ))
    })?;

    Ok(updated)
}
