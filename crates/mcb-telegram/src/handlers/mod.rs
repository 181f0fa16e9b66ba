//! Telegram update handlers.
//!
//! Each handler maps a teloxide `Message` onto the transport-neutral
//! `IncomingUpdate` and hands it to the core bot, which replies through the
//! messaging port.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};
use tracing::warn;

use mcb_core::{
    domain::{ChatId, UserId},
    messaging::types::IncomingUpdate,
};

use crate::router::AppState;

pub mod commands;
mod text;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let update = to_incoming(
        ChatId(msg.chat.id.0),
        msg.from().map(|u| UserId(u.id.0 as i64)),
        msg.text(),
    );

    if let Err(e) = state.bot.on_update(update).await {
        warn!(chat_id = msg.chat.id.0, error = %e, "failed to deliver reply");
    }
    Ok(())
}

fn to_incoming(chat_id: ChatId, user_id: Option<UserId>, text: Option<&str>) -> IncomingUpdate {
    match text {
        Some(t) if t.trim_start().starts_with('/') => commands::to_command(chat_id, user_id, t)
            .unwrap_or(IncomingUpdate::Unsupported { chat_id }),
        Some(t) => text::to_text(chat_id, user_id, t),
        None => IncomingUpdate::Unsupported { chat_id },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_text_becomes_a_command() {
        let u = to_incoming(ChatId(1), Some(UserId(9)), Some("/cancel@mortgage_bot"));
        let IncomingUpdate::Command(cmd) = u else {
            panic!("expected a command, got {u:?}");
        };
        assert_eq!(cmd.name, "cancel");
        assert_eq!(cmd.user_id, Some(UserId(9)));
    }

    #[test]
    fn plain_text_is_an_answer() {
        let u = to_incoming(ChatId(1), None, Some("5 000 000"));
        assert!(matches!(u, IncomingUpdate::Text(ref t) if t.text == "5 000 000"));
    }

    #[test]
    fn non_text_is_unsupported() {
        let u = to_incoming(ChatId(4), None, None);
        assert!(matches!(u, IncomingUpdate::Unsupported { chat_id } if chat_id == ChatId(4)));
    }
}
