// src/services/team_pool.rs

use crate::{
    engine::{
        period,
        team_pool::{self, PoolCandidate},
    },
    errors::{AppError, AppResult},
    models::{IncentiveConfig, PoolStatus, TeamPoolDistribution, User, UserRole},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
struct RevenueRow {
    user_id: Uuid,
    revenue: Decimal,
    first_sale_at: DateTime<Utc>,
}

pub async fn fetch_by_month(
    db: &PgPool,
    organization_id: Uuid,
    month: &str,
) -> AppResult<Option<TeamPoolDistribution>> {
    Ok(sqlx::query_as::<_, TeamPoolDistribution>(
        "SELECT * FROM team_pool_distributions WHERE organization_id = $1 AND month = $2",
    )
    .bind(organization_id)
    .bind(month)
    .fetch_optional(db)
    .await?)
}

/// Rank the month's sales reps and persist the pool distribution. A
/// `distributed` record is returned as-is (idempotent re-trigger); an
/// `approved` one refuses recomputation; a `pending_approval` one is
/// overwritten.
pub async fn create_distribution(
    db: &PgPool,
    config: &IncentiveConfig,
    organization_id: Uuid,
    month: &str,
    total_pool_amount: Decimal,
) -> AppResult<TeamPoolDistribution> {
    let (month_start, month_end) = period::month_range(month)?;

    if let Some(existing) = fetch_by_month(db, organization_id, month).await? {
        match existing.status {
            PoolStatus::Distributed => return Ok(existing),
            PoolStatus::Approved => {
                return Err(AppError::Precondition(format!(
                    "Team pool for {} is already approved; it cannot be recomputed",
                    month
                )));
            }
            PoolStatus::PendingApproval => {}
        }
    }

    let revenue_rows = sqlx::query_as::<_, RevenueRow>(
        r#"SELECT user_id, SUM(sale_price) AS revenue, MIN(created_at) AS first_sale_at
           FROM sales
           WHERE organization_id = $1 AND created_at >= $2 AND created_at < $3
           GROUP BY user_id"#,
    )
    .bind(organization_id)
    .bind(month_start)
    .bind(month_end)
    .fetch_all(db)
    .await?;

    let staff = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE organization_id = $1 AND is_active = TRUE",
    )
    .bind(organization_id)
    .fetch_all(db)
    .await?;

    // Reps with no sales still rank (at zero revenue, behind everyone with
    // sales) so they share the "others" bucket.
    let candidates: Vec<PoolCandidate> = staff
        .iter()
        .filter(|u| u.role == UserRole::SalesRep)
        .map(|u| {
            revenue_rows
                .iter()
                .find(|r| r.user_id == u.id)
                .map(|r| PoolCandidate {
                    user_id: r.user_id,
                    revenue: r.revenue,
                    first_sale_at: r.first_sale_at,
                })
                .unwrap_or(PoolCandidate {
                    user_id: u.id,
                    revenue: Decimal::ZERO,
                    first_sale_at: month_end,
                })
        })
        .collect();
    let manager_count = staff.iter().filter(|u| u.role == UserRole::Manager).count();
    let support_staff_count = staff
        .iter()
        .filter(|u| u.role == UserRole::SupportStaff)
        .count();

    let ranked = team_pool::rank(candidates);
    let breakdown = team_pool::distribute(
        total_pool_amount,
        &ranked,
        manager_count,
        support_staff_count,
        config,
    );

    let distribution = sqlx::query_as::<_, TeamPoolDistribution>(
        r#"INSERT INTO team_pool_distributions (
            id, organization_id, month, total_pool_amount, performer_allocations,
            manager_amount, support_staff_amount, support_staff_count,
            others_amount, others_count, status
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,'pending_approval')
        ON CONFLICT (organization_id, month) DO UPDATE SET
            total_pool_amount = EXCLUDED.total_pool_amount,
            performer_allocations = EXCLUDED.performer_allocations,
            manager_amount = EXCLUDED.manager_amount,
            support_staff_amount = EXCLUDED.support_staff_amount,
            support_staff_count = EXCLUDED.support_staff_count,
            others_amount = EXCLUDED.others_amount,
            others_count = EXCLUDED.others_count,
            updated_at = NOW()
        WHERE team_pool_distributions.status = 'pending_approval'
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(organization_id)
    .bind(month)
    .bind(total_pool_amount)
    .bind(sqlx::types::Json(breakdown.performer_allocations))
    .bind(breakdown.manager_amount)
    .bind(breakdown.support_staff_amount)
    .bind(breakdown.support_staff_count as i32)
    .bind(breakdown.others_amount)
    .bind(breakdown.others_count as i32)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| {
        AppError::Precondition(format!(
            "Team pool for {} advanced past pending_approval while recomputing",
            month
        ))
    })?;

    info!(
        %organization_id,
        month,
        total = %total_pool_amount,
        "team pool distribution computed"
    );

    Ok(distribution)
}

/// Advance a distribution along its lifecycle. Re-triggering `distributed`
/// on an already-distributed record returns it unchanged.
pub async fn advance(
    db: &PgPool,
    organization_id: Uuid,
    distribution_id: Uuid,
    next: PoolStatus,
) -> AppResult<TeamPoolDistribution> {
    let existing = sqlx::query_as::<_, TeamPoolDistribution>(
        "SELECT * FROM team_pool_distributions WHERE id = $1 AND organization_id = $2",
    )
    .bind(distribution_id)
    .bind(organization_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Team pool distribution {} not found", distribution_id)))?;

    if next == PoolStatus::Distributed && existing.status == PoolStatus::Distributed {
        return Ok(existing);
    }
    if !existing.status.can_advance_to(next) {
        return Err(AppError::Precondition(format!(
            "Team pool cannot move from {} to {}",
            existing.status.as_str(),
            next.as_str()
        )));
    }

    // Guard on the state the edge was validated against so a concurrent
    // transition cannot slip an illegal edge through.
    let updated = sqlx::query_as::<_, TeamPoolDistribution>(
        r#"UPDATE team_pool_distributions
           SET status = $1, updated_at = NOW()
           WHERE id = $2 AND status = $3
           RETURNING *"#,
    )
    .bind(next)
    .bind(distribution_id)
    .bind(existing.status)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| {
        AppError::Precondition(format!(
            "Team pool {} changed state while advancing to {}",
            distribution_id,
            next.as_str()
        ))
    })?;

    Ok(updated)
}
