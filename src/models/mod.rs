// src/models/mod.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ─── Users & Roles ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Manager,
    SalesRep,
    SupportStaff,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub monthly_salary: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: Uuid,
    pub name: String,
    pub role: UserRole,
}

// ─── Organization Config ──────────────────────────────────────────────────────

/// Per-organization tunables. Every calculation receives this as an immutable
/// snapshot; nothing reads it from ambient state.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct IncentiveConfig {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub review_bonus_per_review: Decimal,
    pub streak_bonus_7: Decimal,
    pub streak_bonus_14: Decimal,
    pub streak_bonus_30: Decimal,
    /// Cap on the sum of additive penalties; the nuclear penalty ignores it.
    pub penalty_ceiling_percentage: Decimal,
    pub late_arrival_percentage: Decimal,
    pub missed_follow_up_percentage: Decimal,
    pub unapproved_absence_percentage: Decimal,
    pub compliance_shortfall_base_percentage: Decimal,
    pub default_monthly_target: Decimal,
    pub salary_cap_enabled: bool,
    pub pool_top_share: Decimal,
    pub pool_second_share: Decimal,
    pub pool_third_share: Decimal,
    pub pool_manager_share: Decimal,
    pub pool_support_staff_share: Decimal,
    pub pool_others_share: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetIncentiveConfigRequest {
    pub review_bonus_per_review: Decimal,
    pub streak_bonus_7: Decimal,
    pub streak_bonus_14: Decimal,
    pub streak_bonus_30: Decimal,
    pub penalty_ceiling_percentage: Decimal,
    pub late_arrival_percentage: Decimal,
    pub missed_follow_up_percentage: Decimal,
    pub unapproved_absence_percentage: Decimal,
    pub compliance_shortfall_base_percentage: Decimal,
    pub default_monthly_target: Decimal,
    pub salary_cap_enabled: bool,
    pub pool_top_share: Decimal,
    pub pool_second_share: Decimal,
    pub pool_third_share: Decimal,
    pub pool_manager_share: Decimal,
    pub pool_support_staff_share: Decimal,
    pub pool_others_share: Decimal,
}

// ─── Commission Rates ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CommissionRate {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub category: String,
    pub commission_percentage: Decimal,
    pub multiplier: Decimal,
    pub min_sale_price: Decimal,
    pub premium_threshold: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetCommissionRateRequest {
    pub category: String,
    pub commission_percentage: Decimal,
    pub multiplier: Decimal,
    pub min_sale_price: Decimal,
    pub premium_threshold: Decimal,
}

// ─── Sales (win leads) ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "review_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Qualified,
    NotQualified,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Sale {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub category: String,
    pub sale_price: Decimal,
    pub review_status: ReviewStatus,
    pub created_at: DateTime<Utc>,
}

// ─── Daily Activity ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct DailyActivity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub activity_date: NaiveDate,
}

// ─── Penalties ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "penalty_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PenaltyType {
    LateArrival,
    MissedFollowUp,
    UnapprovedAbsence,
    /// Scaled by a severity value supplied at creation time.
    ComplianceShortfall,
    /// Nuclear: fixed 100%, overrides all additive stacking.
    ClientDisrespect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "penalty_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PenaltyStatus {
    Active,
    Disputed,
    Waived,
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PenaltyRecord {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    /// Format: "YYYY-MM"
    pub month: String,
    pub penalty_type: PenaltyType,
    /// Resolved from config at creation and never recomputed.
    pub penalty_percentage: Decimal,
    pub severity: Option<Decimal>,
    pub description: Option<String>,
    pub status: PenaltyStatus,
    pub dispute_reason: Option<String>,
    pub resolution_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePenaltyRequest {
    pub user_id: Uuid,
    /// Format: "YYYY-MM"
    pub month: String,
    pub penalty_type: PenaltyType,
    pub severity: Option<Decimal>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DisputePenaltyRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyResolution {
    Waived,
    Resolved,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolvePenaltyRequest {
    pub resolution: PenaltyResolution,
    pub notes: String,
}

// ─── Monthly Targets ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MonthlyTarget {
    pub id: Uuid,
    pub user_id: Uuid,
    pub month: String,
    pub target_amount: Decimal,
    pub achieved_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetTargetRequest {
    /// Format: "YYYY-MM"
    pub month: String,
    pub target_amount: Decimal,
}

// ─── Monthly Incentives ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "incentive_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IncentiveStatus {
    Calculating,
    PendingReview,
    Approved,
    Rejected,
    Paid,
}

impl IncentiveStatus {
    /// The full approval state machine. Every transition request goes through
    /// here; no handler encodes its own edge.
    pub fn can_advance_to(self, next: IncentiveStatus) -> bool {
        use IncentiveStatus::*;
        matches!(
            (self, next),
            (Calculating, PendingReview)
                | (PendingReview, Approved)
                | (PendingReview, Rejected)
                | (Approved, Paid)
        )
    }

    /// Re-opening resets a record to `Calculating` so it can be recomputed.
    /// `Paid` is terminal.
    pub fn can_reopen(self) -> bool {
        use IncentiveStatus::*;
        matches!(self, PendingReview | Rejected | Approved)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IncentiveStatus::Calculating => "calculating",
            IncentiveStatus::PendingReview => "pending_review",
            IncentiveStatus::Approved => "approved",
            IncentiveStatus::Rejected => "rejected",
            IncentiveStatus::Paid => "paid",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MonthlyIncentive {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub month: String,
    pub gross_commission: Decimal,
    pub streak_bonus: Decimal,
    pub review_bonus: Decimal,
    pub total_bonuses: Decimal,
    pub penalty_count: i32,
    pub penalty_percentage: Decimal,
    pub penalty_amount: Decimal,
    pub net_incentive: Decimal,
    pub target_amount: Decimal,
    pub achieved_amount: Decimal,
    pub target_met: bool,
    pub salary_cap_applied: bool,
    pub capped_amount: Option<Decimal>,
    pub final_approved_amount: Option<Decimal>,
    pub status: IncentiveStatus,
    pub review_notes: Option<String>,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FinalizeMonthRequest {
    /// Format: "YYYY-MM"
    pub month: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserFinalizeOutcome {
    pub user_id: Uuid,
    pub ok: bool,
    pub detail: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FinalizeMonthResponse {
    pub month: String,
    pub success_count: usize,
    pub error_count: usize,
    pub results: Vec<UserFinalizeOutcome>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApproveIncentiveRequest {
    pub approved: bool,
    /// Manager override; defaults to the computed payable amount.
    pub final_amount: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkApproveRequest {
    pub incentive_ids: Vec<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkApproveOutcome {
    pub incentive_id: Uuid,
    pub ok: bool,
    pub detail: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkApproveResponse {
    pub success_count: usize,
    pub error_count: usize,
    pub results: Vec<BulkApproveOutcome>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkPaidRequest {
    pub payment_reference: Option<String>,
}

// ─── Team Pool ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "pool_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PoolStatus {
    PendingApproval,
    Approved,
    Distributed,
}

impl PoolStatus {
    pub fn can_advance_to(self, next: PoolStatus) -> bool {
        use PoolStatus::*;
        matches!(
            (self, next),
            (PendingApproval, Approved) | (Approved, Distributed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PoolStatus::PendingApproval => "pending_approval",
            PoolStatus::Approved => "approved",
            PoolStatus::Distributed => "distributed",
        }
    }
}

/// One ranked-performer slice of the pool, stored as JSONB on the
/// distribution row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PoolAllocation {
    pub user_id: Uuid,
    pub rank: u32,
    pub revenue: Decimal,
    pub share_percentage: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TeamPoolDistribution {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub month: String,
    pub total_pool_amount: Decimal,
    #[schema(value_type = Vec<PoolAllocation>)]
    pub performer_allocations: sqlx::types::Json<Vec<PoolAllocation>>,
    pub manager_amount: Decimal,
    pub support_staff_amount: Decimal,
    pub support_staff_count: i32,
    pub others_amount: Decimal,
    pub others_count: i32,
    pub status: PoolStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTeamPoolRequest {
    /// Format: "YYYY-MM"
    pub month: String,
    pub total_pool_amount: Decimal,
}

// ─── JWT Claims ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub org: String,
    pub name: String,
    pub role: UserRole,
    pub exp: usize,
    pub iat: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incentive_transitions_accept_exactly_the_legal_edges() {
        use IncentiveStatus::*;
        let all = [Calculating, PendingReview, Approved, Rejected, Paid];
        let legal = [
            (Calculating, PendingReview),
            (PendingReview, Approved),
            (PendingReview, Rejected),
            (Approved, Paid),
        ];
        for from in all {
            for to in all {
                assert_eq!(
                    from.can_advance_to(to),
                    legal.contains(&(from, to)),
                    "{from:?} -> {to:?}"
                );
            }
        }
        // None of these skip or reverse a state.
        assert!(!Calculating.can_advance_to(Paid));
        assert!(!Calculating.can_advance_to(Approved));
        assert!(!Rejected.can_advance_to(Approved));
        assert!(!Paid.can_advance_to(PendingReview));
    }

    #[test]
    fn only_finalized_unpaid_incentives_can_reopen() {
        use IncentiveStatus::*;
        assert!(PendingReview.can_reopen());
        assert!(Rejected.can_reopen());
        assert!(Approved.can_reopen());
        // Already recomputable, nothing to re-open.
        assert!(!Calculating.can_reopen());
        // Terminal.
        assert!(!Paid.can_reopen());
    }

    #[test]
    fn pool_transitions_accept_exactly_the_legal_edges() {
        use PoolStatus::*;
        let all = [PendingApproval, Approved, Distributed];
        let legal = [(PendingApproval, Approved), (Approved, Distributed)];
        for from in all {
            for to in all {
                assert_eq!(
                    from.can_advance_to(to),
                    legal.contains(&(from, to)),
                    "{from:?} -> {to:?}"
                );
            }
        }
        assert!(!PendingApproval.can_advance_to(Distributed));
        assert!(!Distributed.can_advance_to(Approved));
    }
}
