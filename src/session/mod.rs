//! Session store for the signed-in staff member.
//!
//! SYSTEM CONTEXT
//! ==============
//! The store is the only authority on "is someone logged in". It is built
//! once per application instance and handed to the API client and the route
//! guard as `Arc<dyn SessionStore>`, so tests substitute an in-memory fake.
//!
//! INVARIANTS
//! ==========
//! Token and user are written and removed together. A failed write leaves
//! both slots empty. Reads never fail: a missing slot, a missing storage
//! backend, or a corrupt profile all read as "no session".

#[cfg(feature = "browser")]
pub mod browser;
pub mod storage;


use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;

use crate::net::types::User;
pub use storage::{FileBackend, MemoryBackend, StorageBackend};

/// Storage key for the bearer token.
pub const TOKEN_KEY: &str = "soutien_token";
/// Storage key for the JSON-encoded user profile.
pub const USER_KEY: &str = "soutien_user";

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No durable storage exists in this execution context.
    #[error("session storage unavailable")]
    Unavailable,

    /// The backend refused a write.
    #[error("session storage write failed: {0}")]
    Write(String),

    /// The user profile could not be encoded.
    #[error("user profile encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A complete token + profile pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Read/write access to the persisted session.
pub trait SessionStore: Send + Sync {
    /// Stored token, or `None` when unset or storage is unavailable.
    fn token(&self) -> Option<String>;

    /// Stored profile, or `None` when unset or unparseable.
    fn user(&self) -> Option<User>;

    /// Persist both values, replacing any previous session.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] when the backend rejects a write. The store
    /// is empty afterwards.
    fn save(&self, token: &str, user: &User) -> Result<(), SessionError>;

    /// Remove both values.
    fn clear(&self);

    /// Remove both values only while the stored token is still `expected`.
    /// Returns whether anything was cleared.
    fn clear_if_token(&self, expected: Option<&str>) -> bool {
        if self.token().as_deref() != expected {
            return false;
        }
        self.clear();
        true
    }

    fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Both halves of the session, only when both are readable.
    fn session(&self) -> Option<Session> {
        let token = self.token()?;
        let user = self.user()?;
        Some(Session { token, user })
    }
}

/// [`SessionStore`] over a two-slot key/value backend.
pub struct KeyValueSessionStore<B> {
    backend: B,
    // Serializes save/clear against reads so no reader sees a torn pair.
    lock: Mutex<()>,
}

impl<B: StorageBackend> KeyValueSessionStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend, lock: Mutex::new(()) }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn remove_both(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.backend.remove(key) {
                tracing::warn!(key, error = %e, "session slot removal failed");
            }
        }
    }
}

impl<B: StorageBackend> SessionStore for KeyValueSessionStore<B> {
    fn token(&self) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.backend.get(TOKEN_KEY).filter(|token| !token.is_empty())
    }

    fn user(&self) -> Option<User> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let raw = self.backend.get(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::debug!(error = %e, "stored user profile unreadable; treating as absent");
                None
            }
        }
    }

    fn save(&self, token: &str, user: &User) -> Result<(), SessionError> {
        let encoded = serde_json::to_string(user)?;
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Profile first: a present token must always have a profile next to it.
        let written = self
            .backend
            .set(USER_KEY, &encoded)
            .and_then(|()| self.backend.set(TOKEN_KEY, token));
        if let Err(e) = written {
            tracing::warn!(error = %e, "session save failed; clearing partial state");
            self.remove_both();
            return Err(e);
        }
        Ok(())
    }

    fn clear(&self) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.remove_both();
    }

    fn clear_if_token(&self, expected: Option<&str>) -> bool {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.backend.get(TOKEN_KEY).filter(|token| !token.is_empty());
        if current.as_deref() != expected {
            return false;
        }
        self.remove_both();
        true
    }
}

/// In-memory store, used for tests and as an injectable fake.
#[must_use]
pub fn memory_store() -> Arc<KeyValueSessionStore<MemoryBackend>> {
    Arc::new(KeyValueSessionStore::new(MemoryBackend::default()))
}

/// File-backed store rooted at `dir`.
#[must_use]
pub fn file_store(dir: PathBuf) -> Arc<KeyValueSessionStore<FileBackend>> {
    Arc::new(KeyValueSessionStore::new(FileBackend::new(dir)))
}

/// `localStorage`-backed store for wasm front ends.
#[cfg(feature = "browser")]
#[must_use]
pub fn browser_store() -> Arc<KeyValueSessionStore<browser::BrowserBackend>> {
    Arc::new(KeyValueSessionStore::new(browser::BrowserBackend))
}

// =============================================================================
// EVENTS
// =============================================================================

/// Session lifecycle notifications.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn { username: String },
    SignedOut,
    /// The backend rejected the token; the store has already been cleared.
    Invalidated { path: String },
}

/// Broadcast hub for [`SessionEvent`]s.
///
/// The API client emits; navigation code subscribes and decides where to go.
#[derive(Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl Default for SessionEvents {
    fn default() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }
}

impl SessionEvents {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Emit to current subscribers. Having none is not an error.
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}
