use reputation_bot::config::Config;
use reputation_bot::database::connect_store;
use reputation_bot::services::{access::AccessCache, admin_service::AdminService, ledger::Ledger};
use reputation_bot::{AppState, bot, create_app};
use std::sync::Arc;
use teloxide::Bot;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "reputation_bot=debug,tower_http=debug,teloxide=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().inspect_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
    })?;
    tracing::info!("Configuration loaded successfully");

    // Open the store and run migrations
    let store = connect_store(&config.database_url, config.db_max_connections)
        .await
        .inspect_err(|e| tracing::error!("Failed to open store: {}", e))?;

    let ledger = Ledger::new(store.clone(), config.ledger_policy());
    let admin = AdminService::new(store, AccessCache::new(config.owner_id));
    admin.bootstrap().await?;
    tracing::info!(
        admins = admin.access().admins().await.len(),
        chats = admin.access().authorized_chats().await.len(),
        "Access cache loaded"
    );

    // Create application state
    let state = AppState {
        ledger,
        admin,
        config: Arc::new(config.clone()),
    };

    // Create application
    let app = create_app(state.clone());

    // Create listener
    let listener = TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;
    tracing::info!("Dashboard listening on {}:{}", config.host, config.port);

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Dashboard server stopped: {}", e);
        }
    });

    // Runs until Ctrl-C
    bot::run(Bot::new(&config.bot_token), state).await;

    server.abort();
    tracing::info!("Shut down");
    Ok(())
}
