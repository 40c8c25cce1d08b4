use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
};
use serde_json::json;

/// Root handler — returns a small HTML landing page with project info and links
pub async fn root_handler() -> impl IntoResponse {
    Html(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <title>Sales Incentive Engine</title>
  <style>
    body { font-family: 'Segoe UI', system-ui, sans-serif; background: #0f172a; color: #e2e8f0; min-height: 100vh; padding: 40px 20px; }
    .container { max-width: 720px; margin: 0 auto; }
    h1 { font-size: 2.2rem; background: linear-gradient(135deg, #3b82f6, #8b5cf6); -webkit-background-clip: text; -webkit-text-fill-color: transparent; }
    p { color: #94a3b8; line-height: 1.6; }
    a { color: #38bdf8; text-decoration: none; }
    a:hover { text-decoration: underline; }
    ul { color: #94a3b8; line-height: 1.8; }
    code { background: #1e293b; border-radius: 4px; padding: 2px 6px; font-size: 0.85rem; }
  </style>
</head>
<body>
<div class="container">
  <h1>Sales Incentive Engine</h1>
  <p>Monthly commission, bonus, penalty and team-pool calculations for retail
  sales teams, with a manager approval workflow.</p>
  <ul>
    <li><a href="/docs">Swagger UI</a> — full interactive API documentation</li>
    <li><a href="/health">GET /health</a> — service and database status</li>
    <li><code>POST /api/v1/incentives/finalize</code> — compute a whole month</li>
    <li><code>POST /api/v1/team-pool</code> — distribute a team bonus pool</li>
  </ul>
</div>
</body>
</html>"#,
    )
}

/// Health check endpoint
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").fetch_one(&state.db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected",
                "service": "incentive-engine",
                "version": "1.0.0"
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "database": "disconnected",
                "error": e.to_string()
            })),
        ),
    }
}
