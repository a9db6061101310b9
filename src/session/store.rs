//! SessionStore — append-only message log with write-through persistence
//! and broadcast fan-out to every embedding surface.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, error, info, warn};

use super::model::{Message, SessionEvent};
use super::storage::Storage;

/// Storage namespace for the chat session record.
pub const SESSION_NAMESPACE: &str = "chat-storage";

/// Broadcast channel capacity for session events.
const EVENT_CAPACITY: usize = 256;

/// Persisted session layout: the ordered message list plus the typing flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub messages: Vec<Message>,
    pub is_typing: bool,
}

/// The session: ordered messages + transient typing indicator.
///
/// All mutation funnels through [`add`](Self::add), [`set_typing`](Self::set_typing)
/// and [`clear`](Self::clear), preserving the append-only invariant. Every
/// mutation persists write-through and broadcasts a [`SessionEvent`].
pub struct SessionStore {
    state: RwLock<PersistedSession>,
    storage: Arc<Storage>,
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    /// Restore the session from storage. A corrupt record is logged and the
    /// session starts empty; the typing flag always resets to false on load.
    pub fn open(storage: Arc<Storage>) -> Arc<Self> {
        let mut state = match storage.load::<PersistedSession>(SESSION_NAMESPACE) {
            Ok(Some(persisted)) => {
                info!(messages = persisted.messages.len(), "Session restored");
                persisted
            }
            Ok(None) => PersistedSession::default(),
            Err(e) => {
                warn!(error = %e, "Session record unreadable, starting fresh");
                PersistedSession::default()
            }
        };
        state.is_typing = false;

        let (tx, _rx) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            state: RwLock::new(state),
            storage,
            tx,
        })
    }

    /// Subscribe to session events. Each embedding surface calls this.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Append a message. Messages are immutable once stored.
    pub async fn add(&self, message: Message) -> Message {
        debug!(
            id = %message.id,
            sender = %message.sender,
            "Message appended to session"
        );
        {
            let mut state = self.state.write().await;
            state.messages.push(message.clone());
            self.persist(&state);
        }
        let _ = self.tx.send(SessionEvent::MessageAdded {
            message: message.clone(),
        });
        message
    }

    /// Toggle the typing indicator.
    pub async fn set_typing(&self, active: bool) {
        {
            let mut state = self.state.write().await;
            if state.is_typing == active {
                return;
            }
            state.is_typing = active;
            self.persist(&state);
        }
        let _ = self.tx.send(SessionEvent::Typing { active });
    }

    /// Irreversibly truncate the message log.
    pub async fn clear(&self) {
        {
            let mut state = self.state.write().await;
            state.messages.clear();
            state.is_typing = false;
            self.persist(&state);
        }
        info!("Session cleared");
        let _ = self.tx.send(SessionEvent::SessionCleared);
    }

    /// Snapshot of the ordered message list.
    pub async fn messages(&self) -> Vec<Message> {
        self.state.read().await.messages.clone()
    }

    /// Current typing flag.
    pub async fn is_typing(&self) -> bool {
        self.state.read().await.is_typing
    }

    /// Number of messages in the log.
    pub async fn len(&self) -> usize {
        self.state.read().await.messages.len()
    }

    /// Whether the log is empty.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.messages.is_empty()
    }

    /// Full persisted-layout snapshot (messages + typing flag).
    pub async fn snapshot(&self) -> PersistedSession {
        self.state.read().await.clone()
    }

    /// Write-through persist. Persistence failure is logged, never fatal —
    /// the in-memory session stays authoritative for this process.
    fn persist(&self, state: &PersistedSession) {
        if let Err(e) = self.storage.save(SESSION_NAMESPACE, state) {
            error!(error = %e, "Failed to persist session");
        }
    }
}
