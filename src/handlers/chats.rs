use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{Value, json};

use crate::{AppState, auth::AdminUser, error::Result, models::ChatRequest};

pub async fn list_chats(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<Value>> {
    let chats = state.admin.access().authorized_chats().await;
    Ok(Json(json!({ "chats": chats })))
}

pub async fn authorize_chat(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(payload): Json<ChatRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let changed = state.admin.authorize_chat(payload.chat_id).await?;
    tracing::info!(admin_id = admin.user_id, chat_id = payload.chat_id, "Chat authorized from dashboard");

    let status = if changed { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(json!({
            "message": if changed { "Chat authorized" } else { "Chat already authorized" },
            "chat_id": payload.chat_id,
            "changed": changed,
        })),
    ))
}

pub async fn revoke_chat(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(chat_id): Path<i64>,
) -> Result<Json<Value>> {
    let changed = state.admin.revoke_chat(chat_id).await?;
    tracing::info!(admin_id = admin.user_id, chat_id, "Chat revoked from dashboard");

    Ok(Json(json!({
        "message": if changed { "Chat revoked" } else { "Chat was not authorized" },
        "chat_id": chat_id,
        "changed": changed,
    })))
}
