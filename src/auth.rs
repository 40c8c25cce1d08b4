use crate::{
    errors::AppError,
    models::{Claims, UserRole},
    state::AppState,
};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

/// Authenticated actor extractor.
/// Add `auth: AuthUser` as a parameter in any handler that requires identity;
/// state transitions validate `role` against their transition tables.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn require_manager(&self) -> Result<(), AppError> {
        if self.role != UserRole::Manager {
            return Err(AppError::Forbidden(
                "This action requires the manager role".to_string(),
            ));
        }
        Ok(())
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let headers: &HeaderMap = &parts.headers;

        let auth_header = headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization format".to_string()))?;

        let secret = state.config.jwt_secret.as_bytes();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        let user_id =
            Uuid::parse_str(&token_data.claims.sub).map_err(|_| AppError::InvalidToken)?;
        let organization_id =
            Uuid::parse_str(&token_data.claims.org).map_err(|_| AppError::InvalidToken)?;

        Ok(AuthUser {
            id: user_id,
            organization_id,
            name: token_data.claims.name,
            role: token_data.claims.role,
        })
    }
}

pub fn generate_token(
    user_id: Uuid,
    organization_id: Uuid,
    name: &str,
    role: UserRole,
    secret: &str,
    expiry_hours: i64,
) -> Result<String, AppError> {
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};

    let now = Utc::now().timestamp() as usize;
    let exp = (Utc::now() + chrono::Duration::hours(expiry_hours)).timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        org: organization_id.to_string(),
        name: name.to_string(),
        role,
        exp,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}
