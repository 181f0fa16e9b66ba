use teloxide::types::BotCommand;

use mcb_core::{
    domain::{ChatId, UserId},
    messaging::types::{Command, IncomingUpdate},
    utils::parse_command,
};

/// Command list shown in the Telegram client menu.
pub fn bot_commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new("start", "Begin new calculation"),
        BotCommand::new("cancel", "Cancel current calculation"),
        BotCommand::new("help", "Show help"),
    ]
}

pub(crate) fn to_command(
    chat_id: ChatId,
    user_id: Option<UserId>,
    text: &str,
) -> Option<IncomingUpdate> {
    let name = parse_command(text)?;
    Some(IncomingUpdate::Command(Command {
        chat_id,
        user_id,
        name,
    }))
}
