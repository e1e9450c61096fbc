use axum::{
    extract::{Path, State},
    response::Json,
};
use serde_json::{Value, json};
use validator::Validate;

use crate::{
    AppState,
    auth::AdminUser,
    error::Result,
    models::{ChatSettings, ChatSettingsRequest, WelcomeRequest},
};

pub async fn get_welcome(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<Value>> {
    let text = state.admin.welcome_message().await?;
    Ok(Json(json!({ "text": text })))
}

pub async fn set_welcome(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(payload): Json<WelcomeRequest>,
) -> Result<Json<Value>> {
    payload.validate()?;
    state.admin.set_welcome_message(&payload.text).await?;

    Ok(Json(json!({ "message": "Welcome message updated" })))
}

pub async fn list_chat_settings(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Value>> {
    let settings = state.admin.list_chat_settings().await?;
    Ok(Json(json!({ "chat_settings": settings })))
}

pub async fn get_chat_settings(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(chat_id): Path<i64>,
) -> Result<Json<ChatSettings>> {
    Ok(Json(state.admin.chat_settings(chat_id).await?))
}

pub async fn set_chat_settings(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(chat_id): Path<i64>,
    Json(payload): Json<ChatSettingsRequest>,
) -> Result<Json<ChatSettings>> {
    payload.validate()?;

    let settings = state
        .admin
        .set_chat_settings(ChatSettings {
            chat_id,
            min_join_days: payload.min_join_days,
            force_channel_id: payload.force_channel_id,
        })
        .await?;

    Ok(Json(settings))
}
