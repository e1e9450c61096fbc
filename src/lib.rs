pub mod auth;
pub mod bot;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod store;

use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::Config,
    services::{admin_service::AdminService, ledger::Ledger},
};

#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
    pub admin: AdminService,
    pub config: Arc<Config>,
}

pub fn create_app(state: AppState) -> Router {
    let origins = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect::<Vec<_>>();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    // Public routes (no auth required)
    let public_routes = Router::new().route("/api/auth/login", post(handlers::auth::login));

    // Admin routes
    let protected_routes = Router::new()
        .route("/api/stats", get(handlers::stats::get_stats))
        // Chat authorization
        .route(
            "/api/chats",
            get(handlers::chats::list_chats).post(handlers::chats::authorize_chat),
        )
        .route(
            "/api/chats/{chat_id}",
            delete(handlers::chats::revoke_chat),
        )
        // Admins
        .route(
            "/api/admins",
            get(handlers::admins::list_admins).post(handlers::admins::add_admin),
        )
        .route(
            "/api/admins/{user_id}",
            delete(handlers::admins::remove_admin),
        )
        // Bans
        .route(
            "/api/bans",
            get(handlers::bans::list_bans).post(handlers::bans::ban_user),
        )
        .route(
            "/api/bans/{target}",
            delete(handlers::bans::unban_user),
        )
        // Ratings
        .route(
            "/api/ratings/{target}",
            get(handlers::ratings::get_rating).delete(handlers::ratings::clear_user_data),
        )
        // Settings
        .route(
            "/api/settings/welcome",
            get(handlers::settings::get_welcome).put(handlers::settings::set_welcome),
        )
        .route(
            "/api/chat-settings",
            get(handlers::settings::list_chat_settings),
        )
        .route(
            "/api/chat-settings/{chat_id}",
            get(handlers::settings::get_chat_settings).put(handlers::settings::set_chat_settings),
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
