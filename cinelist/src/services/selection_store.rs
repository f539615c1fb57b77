//! Pending selection store
//!
//! In-memory table of open interactive choices keyed by
//! (chat, user, prompt message). Holds at most one live session per
//! (chat, user); expired sessions read as absent whether or not they have
//! been physically removed yet.
//!
//! Each session owns a [`CancellationToken`]; every removal path cancels it,
//! so a pending timeout task wakes up, sees the token, and exits quietly.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use cinelist_common::time::Clock;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::models::{PendingSelection, SelectionDraft, SessionKey};

struct Entry {
    selection: Arc<PendingSelection>,
    timer: CancellationToken,
}

/// Result of a lookup that distinguishes expiry from absence
#[derive(Debug, Clone)]
pub enum Lookup {
    Open(Arc<PendingSelection>),
    /// Was present but past its expiry; removed by this lookup
    Expired(Arc<PendingSelection>),
    Absent,
}

/// A freshly stored session
#[derive(Debug)]
pub struct Created {
    pub selection: Arc<PendingSelection>,
    /// Sessions of the same (chat, user) removed to make room
    pub superseded: Vec<Arc<PendingSelection>>,
    /// Cancelled when the session leaves the store
    pub timer: CancellationToken,
}

/// Shared store of open choices
///
/// Cloning shares the table.
#[derive(Clone)]
pub struct SelectionStore {
    entries: Arc<RwLock<HashMap<SessionKey, Entry>>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SelectionStore {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            clock,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store a session expiring one TTL from now
    ///
    /// Any session already held by the same (chat, user) is removed first and
    /// returned in [`Created::superseded`].
    pub async fn create(&self, key: SessionKey, draft: SelectionDraft) -> Created {
        let expires_at = self.clock.now() + self.ttl;
        let selection = Arc::new(PendingSelection::from_draft(key, draft, expires_at));
        let timer = CancellationToken::new();

        let mut entries = self.entries.write().await;
        let superseded = take_where(&mut entries, |k, _| k.is_owned_by(key.chat_id, key.user_id));
        entries.insert(
            key,
            Entry {
                selection: Arc::clone(&selection),
                timer: timer.clone(),
            },
        );

        debug!(
            chat_id = key.chat_id,
            user_id = key.user_id,
            message_id = key.message_id,
            options = selection.options.len(),
            "Pending selection stored"
        );

        Created {
            selection,
            superseded,
            timer,
        }
    }

    /// Live session for `key`; an expired one is removed and reads as absent
    pub async fn get(&self, key: &SessionKey) -> Option<Arc<PendingSelection>> {
        match self.lookup(key).await {
            Lookup::Open(selection) => Some(selection),
            Lookup::Expired(_) | Lookup::Absent => None,
        }
    }

    /// Look up `key`, removing it if it has expired
    pub async fn lookup(&self, key: &SessionKey) -> Lookup {
        let now = self.clock.now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Lookup::Absent,
                Some(entry) if !entry.selection.is_expired_at(now) => {
                    return Lookup::Open(Arc::clone(&entry.selection));
                }
                Some(_) => {}
            }
        }

        match self.take_expired(key).await {
            Some(selection) => Lookup::Expired(selection),
            None => Lookup::Absent,
        }
    }

    /// Atomically remove `key` for resolution
    ///
    /// Returns `Open` only if the session was still live at removal time, so
    /// a choice racing the expiry instant can never win.
    pub async fn claim(&self, key: &SessionKey) -> Lookup {
        let now = self.clock.now();
        let Some(entry) = self.entries.write().await.remove(key) else {
            return Lookup::Absent;
        };
        entry.timer.cancel();
        if entry.selection.is_expired_at(now) {
            Lookup::Expired(entry.selection)
        } else {
            Lookup::Open(entry.selection)
        }
    }

    /// Remove `key`; a missing key is a no-op
    pub async fn remove(&self, key: &SessionKey) -> Option<Arc<PendingSelection>> {
        let entry = self.entries.write().await.remove(key)?;
        entry.timer.cancel();
        Some(entry.selection)
    }

    /// Remove `key` only if it exists and has expired
    pub async fn take_expired(&self, key: &SessionKey) -> Option<Arc<PendingSelection>> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        if !entries.get(key)?.selection.is_expired_at(now) {
            return None;
        }
        let entry = entries.remove(key)?;
        entry.timer.cancel();
        Some(entry.selection)
    }

    /// Remove and return every session held by (chat, user), expired or not
    pub async fn take_for_user(&self, chat_id: i64, user_id: i64) -> Vec<Arc<PendingSelection>> {
        let mut entries = self.entries.write().await;
        take_where(&mut entries, |k, _| k.is_owned_by(chat_id, user_id))
    }

    /// Remove every expired session
    pub async fn sweep(&self) -> Vec<Arc<PendingSelection>> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let expired = take_where(&mut entries, |_, e| e.selection.is_expired_at(now));
        if !expired.is_empty() {
            debug!(count = expired.len(), "Swept expired selections");
        }
        expired
    }

    /// Number of stored sessions, including expired ones not yet removed
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Run `on_expire` once the session expires, unless `timer` is cancelled first
    ///
    /// On wake-up the clock is consulted again through [`Self::take_expired`];
    /// the handler only runs if this task is the one that removed the session.
    pub fn spawn_expiry<F, Fut>(&self, selection: &PendingSelection, timer: CancellationToken, on_expire: F)
    where
        F: FnOnce(Arc<PendingSelection>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let store = self.clone();
        let key = selection.key;
        let deadline = selection.expires_at;

        tokio::spawn(async move {
            tokio::select! {
                _ = timer.cancelled() => {
                    debug!(message_id = key.message_id, "Selection timer cancelled");
                }
                _ = tokio::time::sleep_until(deadline) => {
                    if let Some(expired) = store.take_expired(&key).await {
                        on_expire(expired).await;
                    }
                }
            }
        });
    }
}

/// Remove matching entries, cancelling their timers
fn take_where<P>(entries: &mut HashMap<SessionKey, Entry>, predicate: P) -> Vec<Arc<PendingSelection>>
where
    P: Fn(&SessionKey, &Entry) -> bool,
{
    let keys: Vec<SessionKey> = entries
        .iter()
        .filter(|&(k, e)| predicate(k, e))
        .map(|(k, _)| *k)
        .collect();

    keys.into_iter()
        .filter_map(|k| entries.remove(&k))
        .map(|entry| {
            entry.timer.cancel();
            entry.selection
        })
        .collect()
}
