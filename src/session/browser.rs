//! `window.localStorage` backend for wasm builds.
//!
//! The window and storage handles are looked up on every call and never
//! held, so the backend stays `Send + Sync`. Without a window (workers,
//! server-side rendering) every read is empty and writes report
//! [`SessionError::Unavailable`].

use super::SessionError;
use super::storage::StorageBackend;

#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserBackend;

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window().and_then(|w| w.local_storage().ok().flatten())
}

impl StorageBackend for BrowserBackend {
    fn get(&self, key: &str) -> Option<String> {
        local_storage()?.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let storage = local_storage().ok_or(SessionError::Unavailable)?;
        storage
            .set_item(key, value)
            .map_err(|e| SessionError::Write(format!("{e:?}")))
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let Some(storage) = local_storage() else {
            return Ok(());
        };
        storage
            .remove_item(key)
            .map_err(|e| SessionError::Write(format!("{e:?}")))
    }
}
