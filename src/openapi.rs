// src/openapi.rs

use crate::engine::incentive::IncentiveBreakdown;
use crate::models::{
    ApproveIncentiveRequest, AuthResponse, BulkApproveOutcome, BulkApproveRequest,
    BulkApproveResponse, CommissionRate, CreatePenaltyRequest, CreateTeamPoolRequest,
    DisputePenaltyRequest, FinalizeMonthRequest, FinalizeMonthResponse, IncentiveConfig,
    IncentiveStatus, LoginRequest, MarkPaidRequest, MonthlyIncentive, MonthlyTarget,
    PenaltyRecord, PenaltyResolution, PenaltyStatus, PenaltyType, PoolAllocation, PoolStatus,
    ResolvePenaltyRequest, ReviewStatus, SetCommissionRateRequest, SetIncentiveConfigRequest,
    SetTargetRequest, TeamPoolDistribution, UserFinalizeOutcome, UserRole,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sales Incentive Engine API",
        version = "1.0.0",
        description = "Monthly sales-incentive computation for retail sales teams: \
            category commission rates with premium multipliers, activity-streak and \
            review bonuses, stacked penalties with a dispute workflow, target gating, \
            salary capping, a manager approval state machine and ranked team-pool \
            distribution.",
        license(name = "MIT")
    ),
    paths(
        // Auth
        crate::handlers::session::login,
        // Configuration
        crate::handlers::config::set_commission_rate,
        crate::handlers::config::list_commission_rates,
        crate::handlers::config::deactivate_commission_rate,
        crate::handlers::config::set_incentive_config,
        crate::handlers::config::get_incentive_config,
        crate::handlers::config::set_monthly_target,
        // Penalties
        crate::handlers::penalty::create_penalty,
        crate::handlers::penalty::list_penalties,
        crate::handlers::penalty::dispute_penalty,
        crate::handlers::penalty::resolve_penalty,
        // Incentives
        crate::handlers::incentive::preview_incentive,
        crate::handlers::incentive::finalize_organization_month,
        crate::handlers::incentive::list_incentives,
        crate::handlers::incentive::approve_incentive,
        crate::handlers::incentive::bulk_approve,
        crate::handlers::incentive::mark_paid,
        crate::handlers::incentive::reopen_incentive,
        // Team pool
        crate::handlers::team_pool::create_team_pool,
        crate::handlers::team_pool::get_team_pool,
        crate::handlers::team_pool::approve_team_pool,
        crate::handlers::team_pool::distribute_team_pool,
    ),
    components(
        schemas(
            LoginRequest, AuthResponse, UserRole,
            SetCommissionRateRequest, CommissionRate,
            SetIncentiveConfigRequest, IncentiveConfig,
            SetTargetRequest, MonthlyTarget,
            CreatePenaltyRequest, DisputePenaltyRequest, ResolvePenaltyRequest,
            PenaltyRecord, PenaltyType, PenaltyStatus, PenaltyResolution,
            IncentiveBreakdown, MonthlyIncentive, IncentiveStatus, ReviewStatus,
            FinalizeMonthRequest, FinalizeMonthResponse, UserFinalizeOutcome,
            ApproveIncentiveRequest, BulkApproveRequest, BulkApproveOutcome,
            BulkApproveResponse, MarkPaidRequest,
            CreateTeamPoolRequest, TeamPoolDistribution, PoolAllocation, PoolStatus,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Login and token issuance"),
        (name = "Configuration", description = "Commission rates, incentive tunables and targets"),
        (name = "Penalties", description = "Create, dispute and resolve penalties"),
        (name = "Incentives", description = "Compute, finalize, approve and pay monthly incentives"),
        (name = "Team Pool", description = "Ranked team bonus pool distribution"),
    )
)]
pub struct ApiDoc;
