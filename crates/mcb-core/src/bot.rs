//! Transport-neutral bot: routes inbound updates into the dialog and sends the reply.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    dialog::{MortgageDialog, Reply},
    domain::MessageRef,
    formatting::{self, escape_html},
    messaging::{
        port::MessagingPort,
        types::{Command, IncomingUpdate},
    },
    Result,
};

pub struct MortgageBot {
    dialog: Arc<MortgageDialog>,
    messenger: Arc<dyn MessagingPort>,
}

impl MortgageBot {
    pub fn new(dialog: Arc<MortgageDialog>, messenger: Arc<dyn MessagingPort>) -> Self {
        Self { dialog, messenger }
    }

    pub fn dialog(&self) -> &Arc<MortgageDialog> {
        &self.dialog
    }

    /// Decide the reply for one update without sending it.
    pub async fn reply_for(&self, update: &IncomingUpdate) -> Reply {
        match update {
            IncomingUpdate::Command(cmd) => self.on_command(cmd).await,
            IncomingUpdate::Text(msg) => {
                debug!(
                    chat_id = %msg.chat_id,
                    user_id = ?msg.user_id.map(|u| u.0),
                    "answer received"
                );
                self.dialog.handle_input(msg.chat_id, &msg.text).await
            }
            IncomingUpdate::Unsupported { .. } => Reply::Guidance {
                text: formatting::unsupported_message_text(),
            },
        }
    }

    async fn on_command(&self, cmd: &Command) -> Reply {
        debug!(
            chat_id = %cmd.chat_id,
            user_id = ?cmd.user_id.map(|u| u.0),
            command = %cmd.name,
            "command received"
        );
        match cmd.name.as_str() {
            "start" => self.dialog.start(cmd.chat_id).await,
            "cancel" => self.dialog.cancel(cmd.chat_id).await,
            "help" => self.dialog.help(),
            other => Reply::Guidance {
                text: formatting::unknown_command_text(other),
            },
        }
    }

    /// Handle one update end to end: run the dialog, then deliver the reply.
    pub async fn on_update(&self, update: IncomingUpdate) -> Result<MessageRef> {
        let chat_id = update.chat_id();
        let reply = self.reply_for(&update).await;

        let mut body = reply.render();
        let caps = self.messenger.capabilities();
        if !caps.supports_html {
            body = html_to_plain(&body);
        }
        if body.len() > caps.max_message_len {
            warn!(%chat_id, len = body.len(), "reply exceeds messenger limit, truncating");
            body = if caps.supports_html {
                truncate_html(&body, caps.max_message_len)
            } else {
                truncate_at_char_boundary(&body, caps.max_message_len)
            };
        }

        self.messenger.send_html(chat_id, &body).await
    }
}

/// Drop tags and decode the entities `escape_html` produces.
fn html_to_plain(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

fn truncate_at_char_boundary(s: &str, max: usize) -> String {
    let mut end = max.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

/// Shorten an HTML body to at most `max` bytes without splitting a tag or entity.
///
/// The markup is dropped and the cut text re-escaped, so the result is always valid HTML.
fn truncate_html(html: &str, max: usize) -> String {
    let plain = html_to_plain(html);
    let mut budget = max;
    loop {
        let cut = escape_html(&truncate_at_char_boundary(&plain, budget));
        if cut.len() <= max {
            return cut;
        }
        budget = budget.saturating_sub(cut.len() - max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;
    use crate::domain::{ChatId, MessageId};
    use crate::messaging::types::{MessagingCapabilities, TextMessage};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    struct FakeMessenger {
        supports_html: bool,
        max_message_len: usize,
        sends: Mutex<Vec<(ChatId, String)>>,
    }

    impl FakeMessenger {
        fn new(supports_html: bool) -> Self {
            Self::with_limit(supports_html, 4096)
        }

        fn with_limit(supports_html: bool, max_message_len: usize) -> Self {
            Self {
                supports_html,
                max_message_len,
                sends: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<(ChatId, String)> {
            self.sends.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        fn capabilities(&self) -> MessagingCapabilities {
            MessagingCapabilities {
                supports_html: self.supports_html,
                max_message_len: self.max_message_len,
            }
        }

        async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
            let mut sends = self.sends.lock().unwrap();
            sends.push((chat_id, html.to_string()));
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(sends.len() as i32),
            })
        }
    }

    fn bot(messenger: Arc<FakeMessenger>) -> MortgageBot {
        let dialog = Arc::new(MortgageDialog::new(
            Limits::default(),
            Duration::from_secs(60),
        ));
        MortgageBot::new(dialog, messenger)
    }

    fn cmd(chat: i64, name: &str) -> IncomingUpdate {
        IncomingUpdate::Command(Command {
            chat_id: ChatId(chat),
            user_id: None,
            name: name.to_string(),
        })
    }

    fn text(chat: i64, text: &str) -> IncomingUpdate {
        IncomingUpdate::Text(TextMessage {
            chat_id: ChatId(chat),
            user_id: None,
            text: text.to_string(),
        })
    }

    #[tokio::test]
    async fn full_conversation_over_the_port() {
        let messenger = Arc::new(FakeMessenger::new(true));
        let bot = bot(messenger.clone());

        bot.on_update(cmd(1, "start")).await.unwrap();
        for answer in ["5000000", "1000000", "15", "12"] {
            bot.on_update(text(1, answer)).await.unwrap();
        }

        let sent = messenger.sent();
        assert_eq!(sent.len(), 5);
        assert!(sent.iter().all(|(chat, _)| *chat == ChatId(1)));
        assert!(sent[0].1.contains("Step 1"));
        assert!(sent[4].1.contains("~48 007 RUB"));
        assert!(sent[4].1.contains("deleted from memory"));
        assert_eq!(bot.dialog().active_sessions().await, 0);
    }

    #[tokio::test]
    async fn routes_help_unknown_and_unsupported() {
        let messenger = Arc::new(FakeMessenger::new(true));
        let bot = bot(messenger.clone());

        bot.on_update(cmd(2, "help")).await.unwrap();
        bot.on_update(cmd(2, "frobnicate")).await.unwrap();
        bot.on_update(IncomingUpdate::Unsupported {
            chat_id: ChatId(2),
        })
        .await
        .unwrap();
        bot.on_update(text(2, "hello")).await.unwrap();

        let sent = messenger.sent();
        assert!(sent[0].1.contains("/cancel"));
        assert!(sent[1].1.contains("Unknown command /frobnicate"));
        assert!(sent[2].1.contains("plain text"));
        assert!(sent[3].1.contains("Type /start"));
        assert_eq!(bot.dialog().active_sessions().await, 0);
    }

    #[tokio::test]
    async fn cancel_command_ends_the_conversation() {
        let messenger = Arc::new(FakeMessenger::new(true));
        let bot = bot(messenger.clone());

        bot.on_update(cmd(3, "start")).await.unwrap();
        bot.on_update(text(3, "5000000")).await.unwrap();
        bot.on_update(cmd(3, "cancel")).await.unwrap();

        let reply = bot.reply_for(&text(3, "1000000")).await;
        assert!(matches!(reply, Reply::Guidance { .. }));
        assert!(messenger.sent()[2].1.contains("cancelled"));
    }

    #[tokio::test]
    async fn plain_text_messengers_get_tags_stripped() {
        let messenger = Arc::new(FakeMessenger::new(false));
        let bot = bot(messenger.clone());

        bot.on_update(cmd(4, "start")).await.unwrap();
        let body = &messenger.sent()[0].1;
        assert!(body.contains("Step 1:"));
        assert!(!body.contains("<b>"));
    }

    #[test]
    fn html_to_plain_decodes_entities() {
        assert_eq!(html_to_plain("<b>a &lt; b</b> &amp; c"), "a < b & c");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_at_char_boundary("héllo", 2), "h");
        assert_eq!(truncate_at_char_boundary("abc", 10), "abc");
    }

    #[test]
    fn html_truncation_never_splits_markup() {
        // The cut would land inside `&amp;`; re-escaping must shrink it further.
        assert_eq!(truncate_html("<b>Mortgage</b> &amp; more", 10), "Mortga");
        assert_eq!(truncate_html("<b>Mortgage</b> &amp; more", 14), "Mortgage &amp;");
        assert_eq!(truncate_html("<i>abc</i>", 2), "ab");
    }

    #[tokio::test]
    async fn oversized_html_reply_is_cut_to_valid_markup() {
        let messenger = Arc::new(FakeMessenger::with_limit(true, 40));
        let bot = bot(messenger.clone());

        bot.on_update(cmd(5, "start")).await.unwrap();
        let body = &messenger.sent()[0].1;
        assert!(body.len() <= 40, "{body}");
        assert!(!body.contains('<'), "{body}");
        assert!(body.starts_with("🏠 Mortgage Calculator"), "{body}");
    }
}
