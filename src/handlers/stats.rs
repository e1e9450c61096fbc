use axum::{extract::State, response::Json};
use serde_json::{Value, json};

use crate::{AppState, auth::AdminUser, error::Result};

pub async fn get_stats(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<Value>> {
    let totals = state.admin.totals().await?;
    let chats = state.admin.access().authorized_chats().await;
    let admins = state.admin.access().admins().await;

    Ok(Json(json!({
        "rated_users": totals.rated_users,
        "votes": totals.votes,
        "authorized_chats": chats.len(),
        "admins": admins.len(),
    })))
}
