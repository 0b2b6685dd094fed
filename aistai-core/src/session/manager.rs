//! In-memory session store keyed by user id

use super::store::Session;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Platform user identifier
pub type UserId = u64;

/// Shared, individually locked session record.
///
/// Holding the lock serializes every turn of one user; different users never
/// contend on it.
pub type SessionHandle = Arc<tokio::sync::Mutex<Session>>;

/// Process-lifetime store of user sessions.
///
/// Sessions are created lazily and live until process exit, or until evicted
/// as least recently used once `capacity` residents are exceeded.
pub struct SessionStore {
    sessions: Mutex<LruCache<UserId, SessionHandle>>,
    default_model: String,
}

impl SessionStore {
    /// Create a store. `capacity == 0` means unbounded.
    pub fn new(default_model: impl Into<String>, capacity: usize) -> Self {
        let cache = match NonZeroUsize::new(capacity) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            sessions: Mutex::new(cache),
            default_model: default_model.into(),
        }
    }

    /// Get the session for `user_id`, creating it on first contact.
    ///
    /// Repeated calls return the same record while it stays resident. When
    /// the store is full the least recently used idle session is evicted;
    /// a session whose handle is still held elsewhere (an in-flight turn) is
    /// never chosen, and the store grows past its cap if every resident is busy.
    pub fn get_or_create(&self, user_id: UserId) -> SessionHandle {
        let mut sessions = self.sessions.lock();
        if let Some(handle) = sessions.get(&user_id) {
            return handle.clone();
        }

        if sessions.len() >= sessions.cap().get() {
            let idle = sessions
                .iter()
                .rev()
                .find(|(_, handle)| Arc::strong_count(handle) == 1)
                .map(|(id, _)| *id);
            match idle {
                Some(evicted) => {
                    sessions.pop(&evicted);
                    tracing::debug!("Evicted least recently used session for user {}", evicted);
                }
                None => {
                    let grown = sessions.cap().saturating_add(1);
                    tracing::warn!(
                        "All {} sessions are busy, growing session store to {}",
                        sessions.len(),
                        grown
                    );
                    sessions.resize(grown);
                }
            }
        }

        let handle = Arc::new(tokio::sync::Mutex::new(Session::new(
            self.default_model.clone(),
        )));
        sessions.put(user_id, handle.clone());
        tracing::debug!("Created session for user {}", user_id);
        handle
    }

    /// Get an existing session without creating one
    pub fn get(&self, user_id: UserId) -> Option<SessionHandle> {
        self.sessions.lock().get(&user_id).cloned()
    }

    /// Number of resident sessions
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Model code assigned to new sessions
    pub fn default_model(&self) -> &str {
        &self.default_model
    }
}
