use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{Value, json};
use validator::Validate;

use crate::{
    AppState,
    auth::AdminUser,
    error::{AppError, Result},
    models::{BanRequest, Target},
};

/// Accepts a numeric user id or a handle, with or without `@`.
pub(crate) fn parse_target(raw: &str) -> Result<Target> {
    Target::parse_arg(raw)
        .ok_or_else(|| AppError::BadRequest(format!("Not a user id or handle: {}", raw)))
}

pub async fn list_bans(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<Value>> {
    let bans = state.admin.list_bans().await?;
    Ok(Json(json!({ "bans": bans })))
}

pub async fn ban_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(payload): Json<BanRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    payload.validate()?;
    let target = parse_target(&payload.target)?;

    let record = state.admin.ban_user(&target).await?;
    tracing::info!(admin_id = admin.user_id, ban_key = %record.ban_key, "Ban from dashboard");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User banned",
            "ban": record,
        })),
    ))
}

pub async fn unban_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(target): Path<String>,
) -> Result<Json<Value>> {
    let target = parse_target(&target)?;
    let changed = state.admin.unban_user(&target).await?;

    Ok(Json(json!({
        "message": if changed { "User unbanned" } else { "User was not banned" },
        "changed": changed,
    })))
}
