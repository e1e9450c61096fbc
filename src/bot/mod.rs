//! Telegram adapter: mentions, vote buttons and the admin command console.

pub mod callbacks;
pub mod commands;
pub mod directory;
pub mod mentions;
pub mod messages;
pub mod payload;
pub mod render;

use std::{future::Future, pin::Pin, sync::Arc};
use teloxide::{dispatching::UpdateHandler, error_handlers::ErrorHandler, prelude::*};

use crate::{AppState, error::AppError};
use commands::Command;

pub fn schema() -> UpdateHandler<AppError> {
    let commands = Update::filter_message()
        .filter_command::<Command>()
        .endpoint(commands::handle_command);

    let group = Update::filter_message()
        .filter(|msg: Message| msg.chat.is_group() || msg.chat.is_supergroup())
        .endpoint(messages::handle_group_message);

    let private = Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private())
        .endpoint(messages::handle_private_message);

    let callbacks = Update::filter_callback_query().endpoint(callbacks::handle_callback);

    dptree::entry()
        .branch(commands)
        .branch(group)
        .branch(private)
        .branch(callbacks)
}

/// Handler errors are logged; the dispatcher keeps running.
pub struct TracingErrorHandler;

impl ErrorHandler<AppError> for TracingErrorHandler {
    fn handle_error(
        self: Arc<Self>,
        error: AppError,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>> {
        Box::pin(async move {
            tracing::error!("Update handler failed: {}", error);
        })
    }
}

pub async fn run(bot: Bot, state: AppState) {
    tracing::info!("Starting bot dispatcher");

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![state])
        .error_handler(Arc::new(TracingErrorHandler))
        .default_handler(|update| async move {
            tracing::trace!(update_id = update.id, "Unhandled update");
        })
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
