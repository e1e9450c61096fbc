use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    AppState,
    auth::AdminUser,
    error::Result,
    handlers::bans::parse_target,
    models::RatingResponse,
};

#[derive(Debug, Deserialize)]
pub struct RatingQuery {
    pub chat_id: Option<i64>,
}

pub async fn get_rating(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(target): Path<String>,
    Query(params): Query<RatingQuery>,
) -> Result<Json<RatingResponse>> {
    let target = parse_target(&target)?;
    let stats = state.ledger.get_stats(&target, params.chat_id).await?;

    Ok(Json(RatingResponse::new(
        target.to_string(),
        params.chat_id,
        stats,
    )))
}

pub async fn clear_user_data(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(target): Path<String>,
) -> Result<Json<Value>> {
    let target = parse_target(&target)?;
    let removed = state.admin.clear_user_data(&target).await?;
    tracing::info!(admin_id = admin.user_id, removed, "User data cleared from dashboard");

    Ok(Json(json!({
        "message": "User data cleared",
        "removed": removed,
    })))
}
