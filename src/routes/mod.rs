// src/routes/mod.rs

use crate::{
    handlers::{
        config::{
            deactivate_commission_rate, get_incentive_config, list_commission_rates,
            set_commission_rate, set_incentive_config, set_monthly_target,
        },
        incentive::{
            approve_incentive, bulk_approve, finalize_organization_month, list_incentives,
            mark_paid, preview_incentive, reopen_incentive,
        },
        penalty::{create_penalty, dispute_penalty, list_penalties, resolve_penalty},
        session::login,
        team_pool::{approve_team_pool, create_team_pool, distribute_team_pool, get_team_pool},
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // ─── Auth ─────────────────────────────────────────────
        .route("/auth/login", post(login))
        // ─── Configuration ────────────────────────────────────
        .route(
            "/commission-rates",
            put(set_commission_rate).get(list_commission_rates),
        )
        .route(
            "/commission-rates/{rate_id}",
            delete(deactivate_commission_rate),
        )
        .route(
            "/incentive-config",
            put(set_incentive_config).get(get_incentive_config),
        )
        .route("/users/{user_id}/target", put(set_monthly_target))
        .route(
            "/users/{user_id}/incentives/{month}",
            get(preview_incentive),
        )
        // ─── Penalties ────────────────────────────────────────
        .route("/penalties", post(create_penalty).get(list_penalties))
        .route("/penalties/{penalty_id}/dispute", post(dispute_penalty))
        .route("/penalties/{penalty_id}/resolve", post(resolve_penalty))
        // ─── Incentives ───────────────────────────────────────
        .route("/incentives", get(list_incentives))
        .route("/incentives/finalize", post(finalize_organization_month))
        .route("/incentives/bulk-approve", post(bulk_approve))
        .route("/incentives/{incentive_id}/approve", post(approve_incentive))
        .route("/incentives/{incentive_id}/pay", post(mark_paid))
        .route("/incentives/{incentive_id}/reopen", post(reopen_incentive))
        // ─── Team Pool ────────────────────────────────────────
        .route("/team-pool", post(create_team_pool).get(get_team_pool))
        .route("/team-pool/{distribution_id}/approve", post(approve_team_pool))
        .route(
            "/team-pool/{distribution_id}/distribute",
            post(distribute_team_pool),
        )
}
