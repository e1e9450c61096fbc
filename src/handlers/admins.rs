use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{Value, json};

use crate::{AppState, auth::AdminUser, error::Result, models::AdminRequest};

pub async fn list_admins(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<Value>> {
    let access = state.admin.access();
    Ok(Json(json!({
        "owner_id": access.owner_id(),
        "admins": access.admins().await,
    })))
}

pub async fn add_admin(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(payload): Json<AdminRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let changed = state.admin.add_admin(payload.user_id).await?;

    let status = if changed { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(json!({
            "message": if changed { "Admin added" } else { "Already an admin" },
            "user_id": payload.user_id,
            "changed": changed,
        })),
    ))
}

pub async fn remove_admin(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<i64>,
) -> Result<Json<Value>> {
    let changed = state.admin.remove_admin(user_id).await?;

    Ok(Json(json!({
        "message": if changed { "Admin removed" } else { "Not an admin" },
        "user_id": user_id,
        "changed": changed,
    })))
}
