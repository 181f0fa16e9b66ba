//! The mortgage conversation: start, cancel, and one answer at a time.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::{debug, error, info};

use crate::{
    config::Limits,
    domain::ChatId,
    formatting::{self, escape_html, DELETION_NOTICE},
    session::{InputError, LoanSummary, Session, Stage},
    store::{MemorySessionStore, SessionStore},
};

/// Outcome of one dialog operation, independent of the transport.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    /// Ask the question for `stage`.
    Prompt { stage: Stage, text: String },
    /// The answer was rejected; the same question stands.
    ValidationError { stage: Stage, error: InputError },
    /// Help, "please /start first", internal errors.
    Guidance { text: String },
    CancelAck { text: String },
    CalculationComplete {
        summary: LoanSummary,
        deletion_notice: String,
    },
}

impl Reply {
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Reply::Prompt { stage, .. } | Reply::ValidationError { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Telegram-HTML body for this reply.
    pub fn render(&self) -> String {
        match self {
            Reply::Prompt { text, .. } | Reply::Guidance { text } | Reply::CancelAck { text } => {
                text.clone()
            }
            Reply::ValidationError { error, .. } => {
                format!("⚠️ {}", escape_html(&error.to_string()))
            }
            Reply::CalculationComplete {
                summary,
                deletion_notice,
            } => format!(
                "{}\n<i>{}</i>\n\nType /start for a new calculation.",
                formatting::render_summary(summary),
                escape_html(deletion_notice)
            ),
        }
    }
}

/// Conversation state machine over a session store.
pub struct MortgageDialog {
    limits: Limits,
    idle_timeout: Duration,
    store: Arc<dyn SessionStore>,
}

impl MortgageDialog {
    pub fn new(limits: Limits, idle_timeout: Duration) -> Self {
        Self::with_store(limits, idle_timeout, Arc::new(MemorySessionStore::new()))
    }

    pub fn with_store(
        limits: Limits,
        idle_timeout: Duration,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            limits,
            idle_timeout,
            store,
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Begin a fresh calculation, discarding whatever this chat had before.
    pub async fn start(&self, chat_id: ChatId) -> Reply {
        let mut slot = self.store.acquire(chat_id).await;
        let replaced = slot.replace(Session::new(Instant::now())).is_some();
        self.store.release(chat_id, slot).await;
        info!(%chat_id, replaced, "session started");

        Reply::Prompt {
            stage: Stage::AwaitingLoanAmount,
            text: formatting::welcome_prompt(),
        }
    }

    /// Erase the session at any stage. Cancelling nothing is fine.
    pub async fn cancel(&self, chat_id: ChatId) -> Reply {
        let mut slot = self.store.acquire(chat_id).await;
        let existed = slot.take().is_some();
        self.store.release(chat_id, slot).await;
        if existed {
            info!(%chat_id, "session cleared (cancelled)");
        }

        Reply::CancelAck {
            text: formatting::cancel_text(),
        }
    }

    pub fn help(&self) -> Reply {
        Reply::Guidance {
            text: formatting::help_text(),
        }
    }

    /// Feed one free-text answer into the chat's session.
    pub async fn handle_input(&self, chat_id: ChatId, raw: &str) -> Reply {
        let mut slot = self.store.acquire(chat_id).await;

        let Some(session) = (*slot).as_ref() else {
            self.store.release(chat_id, slot).await;
            debug!(%chat_id, "input without an active session");
            return Reply::Guidance {
                text: formatting::no_session_text(),
            };
        };

        let next = match session.accept(raw, &self.limits, Instant::now()) {
            Ok(next) => next,
            Err(error) => {
                let stage = error.stage();
                debug!(%chat_id, stage = stage.name(), kind = error.kind(), "answer rejected");
                self.store.release(chat_id, slot).await;
                return Reply::ValidationError { stage, error };
            }
        };

        let Some(inputs) = next.completed() else {
            let stage = next.stage();
            let text = formatting::step_prompt(next.progress(), &self.limits);
            *slot = Some(next);
            self.store.release(chat_id, slot).await;
            return Reply::Prompt { stage, text };
        };

        let params = inputs.params();
        match params.compute() {
            Ok(result) => {
                *slot = None;
                self.store.release(chat_id, slot).await;
                info!(%chat_id, "calculation complete, session cleared");
                Reply::CalculationComplete {
                    summary: LoanSummary {
                        inputs,
                        params,
                        result,
                    },
                    deletion_notice: DELETION_NOTICE.to_string(),
                }
            }
            Err(e) => {
                // The stored session keeps its last valid stage so the user can retry.
                error!(%chat_id, error = %e, "calculation failed");
                self.store.release(chat_id, slot).await;
                Reply::Guidance {
                    text: formatting::internal_error_text(),
                }
            }
        }
    }

    /// Snapshot of the chat's session, if one is in progress.
    pub async fn session(&self, chat_id: ChatId) -> Option<Session> {
        let slot = self.store.acquire(chat_id).await;
        let snapshot = (*slot).clone();
        self.store.release(chat_id, slot).await;
        snapshot
    }

    /// Live sessions. A chat whose slot is mid-operation is counted even when
    /// it holds no session; see [`SessionStore::active`].
    pub async fn active_sessions(&self) -> usize {
        self.store.active().await
    }

    /// Erase sessions idle for longer than the configured timeout.
    pub async fn sweep_idle(&self) -> usize {
        self.sweep_idle_at(Instant::now()).await
    }

    pub async fn sweep_idle_at(&self, now: Instant) -> usize {
        let expired = self.store.sweep_idle(now, self.idle_timeout).await;
        for chat_id in &expired {
            info!(%chat_id, "session cleared (idle timeout)");
        }
        expired.len()
    }
}
