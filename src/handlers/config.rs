// src/handlers/config.rs

use crate::{
    auth::AuthUser,
    engine::period,
    errors::{AppError, AppResult},
    models::{
        CommissionRate, IncentiveConfig, MonthlyTarget, SetCommissionRateRequest,
        SetIncentiveConfigRequest, SetTargetRequest,
    },
    services::incentive::fetch_user,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal_macros::dec;
use uuid::Uuid;

// ─── Commission Rates ─────────────────────────────────────────────────────────

/// Create or update the commission rate for a category.
/// All range validation happens here, at write time; computations trust
/// stored rates.
#[utoipa::path(
    put,
    path = "/api/v1/commission-rates",
    request_body = SetCommissionRateRequest,
    responses(
        (status = 200, description = "Commission rate saved", body = CommissionRate),
        (status = 400, description = "Out-of-range percentage or multiplier"),
        (status = 403, description = "Manager role required"),
    ),
    security(("bearer_auth" = [])),
    tag = "Configuration"
)]
pub async fn set_commission_rate(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<SetCommissionRateRequest>,
) -> AppResult<Json<CommissionRate>> {
    auth.require_manager()?;

    if body.category.trim().is_empty() {
        return Err(AppError::Validation("Category must not be empty".to_string()));
    }
    if body.commission_percentage < dec!(0) || body.commission_percentage > dec!(100) {
        return Err(AppError::Validation(
            "Commission percentage must be between 0 and 100".to_string(),
        ));
    }
    if body.multiplier < dec!(1) || body.multiplier > dec!(10) {
        return Err(AppError::Validation(
            "Multiplier must be between 1 and 10".to_string(),
        ));
    }
    if body.min_sale_price < dec!(0) || body.premium_threshold < dec!(0) {
        return Err(AppError::Validation(
            "Price thresholds must not be negative".to_string(),
        ));
    }

    let rate = sqlx::query_as::<_, CommissionRate>(
        r#"INSERT INTO commission_rates (
            id, organization_id, category, commission_percentage, multiplier,
            min_sale_price, premium_threshold, is_active
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE)
        ON CONFLICT (organization_id, category) DO UPDATE SET
            commission_percentage = EXCLUDED.commission_percentage,
            multiplier = EXCLUDED.multiplier,
            min_sale_price = EXCLUDED.min_sale_price,
            premium_threshold = EXCLUDED.premium_threshold,
            is_active = TRUE,
            updated_at = NOW()
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.organization_id)
    .bind(body.category.trim())
    .bind(body.commission_percentage)
    .bind(body.multiplier)
    .bind(body.min_sale_price)
    .bind(body.premium_threshold)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(rate))
}

/// List the organization's commission rates, active ones first.
#[utoipa::path(
    get,
    path = "/api/v1/commission-rates",
    responses((status = 200, description = "List of commission rates", body = Vec<CommissionRate>)),
    security(("bearer_auth" = [])),
    tag = "Configuration"
)]
pub async fn list_commission_rates(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<CommissionRate>>> {
    let rates = sqlx::query_as::<_, CommissionRate>(
        "SELECT * FROM commission_rates WHERE organization_id = $1 ORDER BY is_active DESC, category",
    )
    .bind(auth.organization_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rates))
}

/// Deactivate a commission rate. Rates referenced by historical sales are
/// never hard-deleted.
#[utoipa::path(
    delete,
    path = "/api/v1/commission-rates/{rate_id}",
    params(("rate_id" = Uuid, Path, description = "Commission rate ID")),
    responses(
        (status = 200, description = "Rate deactivated"),
        (status = 404, description = "Rate not found"),
        (status = 403, description = "Manager role required"),
    ),
    security(("bearer_auth" = [])),
    tag = "Configuration"
)]
pub async fn deactivate_commission_rate(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(rate_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    auth.require_manager()?;

    let result = sqlx::query(
        "UPDATE commission_rates SET is_active = FALSE, updated_at = NOW() WHERE id = $1 AND organization_id = $2",
    )
    .bind(rate_id)
    .bind(auth.organization_id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Commission rate {} not found", rate_id)));
    }

    Ok(Json(serde_json::json!({ "message": "Commission rate deactivated" })))
}

// ─── Incentive Config ─────────────────────────────────────────────────────────

/// Set the organization's incentive tunables. Pool shares must sum to
/// exactly 100; the distributor trusts this invariant later.
#[utoipa::path(
    put,
    path = "/api/v1/incentive-config",
    request_body = SetIncentiveConfigRequest,
    responses(
        (status = 200, description = "Incentive config saved", body = IncentiveConfig),
        (status = 400, description = "Pool shares do not sum to 100 or a percentage is out of range"),
        (status = 403, description = "Manager role required"),
    ),
    security(("bearer_auth" = [])),
    tag = "Configuration"
)]
pub async fn set_incentive_config(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<SetIncentiveConfigRequest>,
) -> AppResult<Json<IncentiveConfig>> {
    auth.require_manager()?;

    let percentages = [
        body.penalty_ceiling_percentage,
        body.late_arrival_percentage,
        body.missed_follow_up_percentage,
        body.unapproved_absence_percentage,
        body.compliance_shortfall_base_percentage,
    ];
    for pct in &percentages {
        if *pct < dec!(0) || *pct > dec!(100) {
            return Err(AppError::Validation(
                "Penalty percentages must be between 0 and 100".to_string(),
            ));
        }
    }

    let amounts = [
        body.review_bonus_per_review,
        body.streak_bonus_7,
        body.streak_bonus_14,
        body.streak_bonus_30,
        body.default_monthly_target,
    ];
    for amount in &amounts {
        if *amount < dec!(0) {
            return Err(AppError::Validation(
                "Bonus amounts and targets must not be negative".to_string(),
            ));
        }
    }

    let shares = [
        body.pool_top_share,
        body.pool_second_share,
        body.pool_third_share,
        body.pool_manager_share,
        body.pool_support_staff_share,
        body.pool_others_share,
    ];
    if shares.iter().any(|s| *s < dec!(0)) {
        return Err(AppError::Validation(
            "Pool shares must not be negative".to_string(),
        ));
    }
    let share_sum: rust_decimal::Decimal = shares.iter().copied().sum();
    if share_sum != dec!(100) {
        return Err(AppError::Validation(format!(
            "Pool shares must sum to exactly 100, got {share_sum}"
        )));
    }

    let config = sqlx::query_as::<_, IncentiveConfig>(
        r#"INSERT INTO incentive_configs (
            id, organization_id, review_bonus_per_review,
            streak_bonus_7, streak_bonus_14, streak_bonus_30,
            penalty_ceiling_percentage, late_arrival_percentage,
            missed_follow_up_percentage, unapproved_absence_percentage,
            compliance_shortfall_base_percentage, default_monthly_target,
            salary_cap_enabled, pool_top_share, pool_second_share,
            pool_third_share, pool_manager_share, pool_support_staff_share,
            pool_others_share
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19)
        ON CONFLICT (organization_id) DO UPDATE SET
            review_bonus_per_review = EXCLUDED.review_bonus_per_review,
            streak_bonus_7 = EXCLUDED.streak_bonus_7,
            streak_bonus_14 = EXCLUDED.streak_bonus_14,
            streak_bonus_30 = EXCLUDED.streak_bonus_30,
            penalty_ceiling_percentage = EXCLUDED.penalty_ceiling_percentage,
            late_arrival_percentage = EXCLUDED.late_arrival_percentage,
            missed_follow_up_percentage = EXCLUDED.missed_follow_up_percentage,
            unapproved_absence_percentage = EXCLUDED.unapproved_absence_percentage,
            compliance_shortfall_base_percentage = EXCLUDED.compliance_shortfall_base_percentage,
            default_monthly_target = EXCLUDED.default_monthly_target,
            salary_cap_enabled = EXCLUDED.salary_cap_enabled,
            pool_top_share = EXCLUDED.pool_top_share,
            pool_second_share = EXCLUDED.pool_second_share,
            pool_third_share = EXCLUDED.pool_third_share,
            pool_manager_share = EXCLUDED.pool_manager_share,
            pool_support_staff_share = EXCLUDED.pool_support_staff_share,
            pool_others_share = EXCLUDED.pool_others_share,
            updated_at = NOW()
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.organization_id)
    .bind(body.review_bonus_per_review)
    .bind(body.streak_bonus_7)
    .bind(body.streak_bonus_14)
    .bind(body.streak_bonus_30)
    .bind(body.penalty_ceiling_percentage)
    .bind(body.late_arrival_percentage)
    .bind(body.missed_follow_up_percentage)
    .bind(body.unapproved_absence_percentage)
    .bind(body.compliance_shortfall_base_percentage)
    .bind(body.default_monthly_target)
    .bind(body.salary_cap_enabled)
    .bind(body.pool_top_share)
    .bind(body.pool_second_share)
    .bind(body.pool_third_share)
    .bind(body.pool_manager_share)
    .bind(body.pool_support_staff_share)
    .bind(body.pool_others_share)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(config))
}

/// Get the organization's current incentive config.
#[utoipa::path(
    get,
    path = "/api/v1/incentive-config",
    responses(
        (status = 200, description = "Current incentive config", body = IncentiveConfig),
        (status = 404, description = "Incentive config not set"),
    ),
    security(("bearer_auth" = [])),
    tag = "Configuration"
)]
pub async fn get_incentive_config(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<IncentiveConfig>> {
    let config = crate::services::incentive::fetch_config(&state.db, auth.organization_id).await?;
    Ok(Json(config))
}

// ─── Monthly Targets ──────────────────────────────────────────────────────────

/// Set a user's sales target for a month.
#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}/target",
    request_body = SetTargetRequest,
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Target saved", body = MonthlyTarget),
        (status = 404, description = "User not found"),
        (status = 403, description = "Manager role required"),
    ),
    security(("bearer_auth" = [])),
    tag = "Configuration"
)]
pub async fn set_monthly_target(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<SetTargetRequest>,
) -> AppResult<(StatusCode, Json<MonthlyTarget>)> {
    auth.require_manager()?;
    period::parse_month(&body.month)?;

    if body.target_amount < dec!(0) {
        return Err(AppError::Validation(
            "Target amount must not be negative".to_string(),
        ));
    }

    // Verify the user belongs to this organization.
    let _ = fetch_user(&state.db, auth.organization_id, user_id).await?;

    let target = sqlx::query_as::<_, MonthlyTarget>(
        r#"INSERT INTO monthly_targets (id, user_id, month, target_amount, achieved_amount)
           VALUES ($1, $2, $3, $4, 0)
           ON CONFLICT (user_id, month) DO UPDATE SET
               target_amount = EXCLUDED.target_amount,
               updated_at = NOW()
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&body.month)
    .bind(body.target_amount)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::OK, Json(target)))
}
