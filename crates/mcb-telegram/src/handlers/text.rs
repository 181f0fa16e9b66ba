use mcb_core::{
    domain::{ChatId, UserId},
    messaging::types::{IncomingUpdate, TextMessage},
};

/// Free-text answers go to the dialog untouched; parsing happens in the core.
pub(crate) fn to_text(chat_id: ChatId, user_id: Option<UserId>, text: &str) -> IncomingUpdate {
    IncomingUpdate::Text(TextMessage {
        chat_id,
        user_id,
        text: text.to_string(),
    })
}
