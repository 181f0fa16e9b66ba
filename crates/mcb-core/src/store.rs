use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{domain::ChatId, session::Session};

/// Exclusive handle on one chat's session. `None` means no conversation in progress.
pub type SessionSlot = OwnedMutexGuard<Option<Session>>;

/// Keyed session storage with per-chat exclusive access.
///
/// Callers never see the underlying map: they acquire a slot, read or replace
/// the session inside it, then hand it back through `release`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Wait for exclusive access to `chat_id`'s slot.
    async fn acquire(&self, chat_id: ChatId) -> SessionSlot;

    /// Give the slot back. Empty slots are forgotten so an erased session leaves no key behind.
    async fn release(&self, chat_id: ChatId, slot: SessionSlot);

    /// Erase sessions idle for at least `max_idle` as of `now`. Slots in use are skipped.
    async fn sweep_idle(&self, now: Instant, max_idle: Duration) -> Vec<ChatId>;

    /// Number of chats with a session.
    ///
    /// A slot that is locked at the time of the call counts as live even if
    /// it turns out to be empty, so an in-flight operation on a chat without a
    /// session adds one until its slot is released.
    async fn active(&self) -> usize;
}

#[derive(Default)]
pub struct MemorySessionStore {
    slots: Mutex<HashMap<ChatId, Arc<Mutex<Option<Session>>>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Only the map holds the slot and nobody has it locked, and it is empty.
fn is_vacant(slot: &Arc<Mutex<Option<Session>>>) -> bool {
    Arc::strong_count(slot) == 1 && slot.try_lock().map(|s| s.is_none()).unwrap_or(false)
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn acquire(&self, chat_id: ChatId) -> SessionSlot {
        let slot = {
            let mut map = self.slots.lock().await;
            map.entry(chat_id)
                .or_insert_with(|| Arc::new(Mutex::new(None)))
                .clone()
        };
        slot.lock_owned().await
    }

    async fn release(&self, chat_id: ChatId, slot: SessionSlot) {
        let empty = slot.is_none();
        drop(slot);
        if !empty {
            return;
        }

        let mut map = self.slots.lock().await;
        if map.get(&chat_id).is_some_and(is_vacant) {
            map.remove(&chat_id);
        }
    }

    async fn sweep_idle(&self, now: Instant, max_idle: Duration) -> Vec<ChatId> {
        let mut map = self.slots.lock().await;
        let mut expired = Vec::new();

        for (chat_id, slot) in map.iter() {
            let Ok(mut guard) = slot.try_lock() else {
                continue;
            };
            let idle = (*guard)
                .as_ref()
                .is_some_and(|s| now.saturating_duration_since(s.last_activity()) >= max_idle);
            if idle {
                *guard = None;
                expired.push(*chat_id);
            }
        }

        map.retain(|_, slot| !is_vacant(slot));
        expired
    }

    async fn active(&self) -> usize {
        let map = self.slots.lock().await;
        // Locked slots cannot be inspected without waiting; count them.
        map.values()
            .filter(|slot| slot.try_lock().map(|s| s.is_some()).unwrap_or(true))
            .count()
    }
}
