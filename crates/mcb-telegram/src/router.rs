use std::{sync::Arc, time::Duration};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use mcb_core::{
    bot::MortgageBot, config::Config, dialog::MortgageDialog, messaging::port::MessagingPort,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub bot: Arc<MortgageBot>,
}

pub async fn run_polling(cfg: Arc<Config>, dialog: Arc<MortgageDialog>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => info!(username = %me.username(), "bot is starting"),
        Err(e) => warn!(error = %e, "get_me failed; continuing"),
    }
    if let Err(e) = bot.set_my_commands(handlers::commands::bot_commands()).await {
        warn!(error = %e, "failed to register bot commands");
    }

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let _sweeper = spawn_idle_sweeper(dialog.clone(), cfg.session_sweep_interval);

    let state = Arc::new(AppState {
        bot: Arc::new(MortgageBot::new(dialog, messenger)),
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    info!("bot stopped");
    Ok(())
}

/// Periodically erase sessions that have been idle past the configured timeout.
pub fn spawn_idle_sweeper(dialog: Arc<MortgageDialog>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(every);
        loop {
            tick.tick().await;
            let expired = dialog.sweep_idle().await;
            if expired > 0 {
                info!(expired, "idle sessions cleared");
            }
        }
    })
}
