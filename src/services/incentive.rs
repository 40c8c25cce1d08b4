// src/services/incentive.rs

use crate::{
    engine::{
        incentive::{self, IncentiveBreakdown, IncentiveInputs},
        period,
    },
    errors::{AppError, AppResult},
    models::{
        DailyActivity, FinalizeMonthResponse, IncentiveConfig, IncentiveStatus, MonthlyIncentive,
        MonthlyTarget, PenaltyRecord, Sale, User, UserFinalizeOutcome, UserRole,
    },
};
use chrono::NaiveDate;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Upper bound on parallel per-user calculations during month finalization.
/// Organization-scoped user sets are moderate; this keeps the pool from being
/// saturated by one batch.
const MAX_CONCURRENT_CALCULATIONS: usize = 8;

pub async fn fetch_config(db: &PgPool, organization_id: Uuid) -> AppResult<IncentiveConfig> {
    sqlx::query_as::<_, IncentiveConfig>(
        "SELECT * FROM incentive_configs WHERE organization_id = $1",
    )
    .bind(organization_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound("Incentive configuration not set".to_string()))
}

pub async fn fetch_user(db: &PgPool, organization_id: Uuid, user_id: Uuid) -> AppResult<User> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND organization_id = $2")
        .bind(user_id)
        .bind(organization_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
}

/// Fetch all inputs for one (user, month) and run the pure aggregator.
pub async fn calculate(
    db: &PgPool,
    config: &IncentiveConfig,
    user: &User,
    month: &str,
) -> AppResult<IncentiveBreakdown> {
    let (month_start, month_end) = period::month_range(month)?;
    let as_of = period::last_day(month)?;

    let sales = sqlx::query_as::<_, Sale>(
        "SELECT * FROM sales WHERE user_id = $1 AND created_at >= $2 AND created_at < $3",
    )
    .bind(user.id)
    .bind(month_start)
    .bind(month_end)
    .fetch_all(db)
    .await?;

    let activity_days: Vec<NaiveDate> = sqlx::query_as::<_, DailyActivity>(
        "SELECT * FROM daily_activities WHERE user_id = $1 AND activity_date <= $2",
    )
    .bind(user.id)
    .bind(as_of)
    .fetch_all(db)
    .await?
    .into_iter()
    .map(|a| a.activity_date)
    .collect();

    let penalties = sqlx::query_as::<_, PenaltyRecord>(
        "SELECT * FROM penalty_records WHERE user_id = $1 AND month = $2",
    )
    .bind(user.id)
    .bind(month)
    .fetch_all(db)
    .await?;

    let rates = sqlx::query_as::<_, crate::models::CommissionRate>(
        "SELECT * FROM commission_rates WHERE organization_id = $1 AND is_active = TRUE",
    )
    .bind(user.organization_id)
    .fetch_all(db)
    .await?;

    let target_amount = sqlx::query_as::<_, MonthlyTarget>(
        "SELECT * FROM monthly_targets WHERE user_id = $1 AND month = $2",
    )
    .bind(user.id)
    .bind(month)
    .fetch_optional(db)
    .await?
    .map(|t| t.target_amount)
    .unwrap_or(config.default_monthly_target);

    let breakdown = incentive::calculate(&IncentiveInputs {
        sales: &sales,
        activity_days: &activity_days,
        penalties: &penalties,
        rates: &rates,
        target_amount,
        monthly_salary: user.monthly_salary,
        as_of,
        config,
    });

    for category in &breakdown.unrated_categories {
        warn!(
            user_id = %user.id,
            month,
            category,
            "sale category has no commission rate and no Default fallback; contributed zero"
        );
    }
    if breakdown.salary_cap_applied {
        warn!(
            user_id = %user.id,
            month,
            net = %breakdown.net_incentive,
            cap = %user.monthly_salary,
            "salary cap applied; flagged for manager review"
        );
    }

    Ok(breakdown)
}

/// Upsert the breakdown for (user, month). The unique constraint serializes
/// concurrent writers; the update arm only fires while the existing row is
/// still `calculating`, so finalized records are never clobbered without an
/// explicit re-open.
pub async fn save(
    db: &PgPool,
    organization_id: Uuid,
    user_id: Uuid,
    month: &str,
    breakdown: &IncentiveBreakdown,
    status: IncentiveStatus,
) -> AppResult<MonthlyIncentive> {
    // Keep the achieved-amount rollup current alongside the incentive row.
    sqlx::query(
        r#"INSERT INTO monthly_targets (id, user_id, month, target_amount, achieved_amount)
           VALUES ($1, $2, $3, $4, $5)
           ON CONFLICT (user_id, month) DO UPDATE
           SET achieved_amount = EXCLUDED.achieved_amount, updated_at = NOW()"#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(month)
    .bind(breakdown.target_amount)
    .bind(breakdown.achieved_amount)
    .execute(db)
    .await?;

    let incentive = sqlx::query_as::<_, MonthlyIncentive>(
        r#"INSERT INTO monthly_incentives (
            id, organization_id, user_id, month,
            gross_commission, streak_bonus, review_bonus, total_bonuses,
            penalty_count, penalty_percentage, penalty_amount, net_incentive,
            target_amount, achieved_amount, target_met,
            salary_cap_applied, capped_amount, status
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18)
        ON CONFLICT (user_id, month) DO UPDATE SET
            gross_commission = EXCLUDED.gross_commission,
            streak_bonus = EXCLUDED.streak_bonus,
            review_bonus = EXCLUDED.review_bonus,
            total_bonuses = EXCLUDED.total_bonuses,
            penalty_count = EXCLUDED.penalty_count,
            penalty_percentage = EXCLUDED.penalty_percentage,
            penalty_amount = EXCLUDED.penalty_amount,
            net_incentive = EXCLUDED.net_incentive,
            target_amount = EXCLUDED.target_amount,
            achieved_amount = EXCLUDED.achieved_amount,
            target_met = EXCLUDED.target_met,
            salary_cap_applied = EXCLUDED.salary_cap_applied,
            capped_amount = EXCLUDED.capped_amount,
            status = EXCLUDED.status,
            final_approved_amount = NULL,
            review_notes = NULL,
            payment_reference = NULL,
            updated_at = NOW()
        WHERE monthly_incentives.status = 'calculating'
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(organization_id)
    .bind(user_id)
    .bind(month)
    .bind(breakdown.gross_commission)
    .bind(breakdown.streak_bonus)
    .bind(breakdown.review_bonus)
    .bind(breakdown.total_bonuses)
    .bind(breakdown.penalty_count)
    .bind(breakdown.penalty_percentage)
    .bind(breakdown.penalty_amount)
    .bind(breakdown.net_incentive)
    .bind(breakdown.target_amount)
    .bind(breakdown.achieved_amount)
    .bind(breakdown.target_met)
    .bind(breakdown.salary_cap_applied)
    .bind(breakdown.capped_amount)
    .bind(status)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| {
        AppError::Precondition(format!(
            "Incentive for user {} month {} has advanced past calculating; re-open it before recomputing",
            user_id, month
        ))
    })?;

    Ok(incentive)
}

pub async fn calculate_and_save(
    db: &PgPool,
    config: &IncentiveConfig,
    user: &User,
    month: &str,
    status: IncentiveStatus,
) -> AppResult<MonthlyIncentive> {
    let breakdown = calculate(db, config, user, month).await?;
    save(db, user.organization_id, user.id, month, &breakdown, status).await
}

/// Compute and persist the month for every active sales rep. Per-user
/// computations fan out over a bounded worker set; one user's failure is
/// recorded and never aborts the others.
pub async fn finalize_month(
    db: &PgPool,
    config: &IncentiveConfig,
    organization_id: Uuid,
    month: &str,
) -> AppResult<FinalizeMonthResponse> {
    let users = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE organization_id = $1 AND is_active = TRUE AND role = $2",
    )
    .bind(organization_id)
    .bind(UserRole::SalesRep)
    .fetch_all(db)
    .await?;

    info!(
        %organization_id,
        month,
        user_count = users.len(),
        "starting month finalization"
    );

    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_CALCULATIONS));
    let mut tasks: JoinSet<UserFinalizeOutcome> = JoinSet::new();

    for user in users {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let db = db.clone();
        let config = config.clone();
        let month = month.to_string();

        tasks.spawn(async move {
            let _permit = permit;
            match calculate_and_save(&db, &config, &user, &month, IncentiveStatus::PendingReview)
                .await
            {
                Ok(incentive) => UserFinalizeOutcome {
                    user_id: user.id,
                    ok: true,
                    detail: format!("net incentive {}", incentive.net_incentive),
                },
                Err(e) => {
                    error!(user_id = %user.id, month, "finalization failed: {}", e);
                    UserFinalizeOutcome {
                        user_id: user.id,
                        ok: false,
                        detail: e.to_string(),
                    }
                }
            }
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => results.push(outcome),
            Err(e) => return Err(AppError::Internal(format!("worker task failed: {e}"))),
        }
    }
    results.sort_by_key(|r| r.user_id);

    let success_count = results.iter().filter(|r| r.ok).count();
    let error_count = results.len() - success_count;
    info!(
        %organization_id,
        month,
        success_count,
        error_count,
        "month finalization complete"
    );

    Ok(FinalizeMonthResponse {
        month: month.to_string(),
        success_count,
        error_count,
        results,
    })
}
