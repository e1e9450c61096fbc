use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::{
    AppState,
    auth::Claims,
    error::{AppError, Result},
    models::LoginRequest,
};

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: i64,
    pub expires_at: i64,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    // Same answer for a wrong password and a non-admin id.
    let rejected = || AppError::Authentication("Invalid credentials".to_string());

    if payload.password != state.config.dashboard_password {
        tracing::warn!(user_id = payload.user_id, "Dashboard login with wrong password");
        return Err(rejected());
    }
    if !state.admin.access().is_admin(payload.user_id).await {
        tracing::warn!(user_id = payload.user_id, "Dashboard login by non-admin");
        return Err(rejected());
    }

    let (token, claims) = Claims::new(payload.user_id, &state.config.jwt_secret)?;
    tracing::info!(user_id = payload.user_id, "Dashboard login");

    Ok(Json(AuthResponse {
        token,
        user_id: payload.user_id,
        expires_at: claims.exp,
    }))
}
