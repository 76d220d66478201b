use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{ClientError, ClientResult};
use crate::session::model::UserProfile;

mod file;

pub use file::FileStorage;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const USER_PROFILE_KEY: &str = "user_profile";

/// Key/value store holding the persisted session.
///
/// Implementations decide where the values live (memory, a file, a platform
/// keychain). Only two keys are used: [`ACCESS_TOKEN_KEY`] and
/// [`USER_PROFILE_KEY`]. Writes are last-writer-wins.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> ClientResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> ClientResult<()>;
    fn remove(&self, key: &str) -> ClientResult<()>;
}

#[derive(Default)]
pub struct InMemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl InMemoryStorage {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl SessionStorage for InMemoryStorage {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Typed view over a [`SessionStorage`] backend.
#[derive(Clone)]
pub struct StoredSession {
    storage: Arc<dyn SessionStorage>,
}

impl std::fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredSession").finish_non_exhaustive()
    }
}

impl StoredSession {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    pub fn access_token(&self) -> ClientResult<Option<String>> {
        Ok(self
            .storage
            .get(ACCESS_TOKEN_KEY)?
            .filter(|token| !token.trim().is_empty()))
    }

    pub fn set_access_token(&self, token: &str) -> ClientResult<()> {
        if token.trim().is_empty() {
            return Err(ClientError::InvalidToken(
                "refusing to persist an empty access token".into(),
            ));
        }
        self.storage.set(ACCESS_TOKEN_KEY, token)
    }

    /// Cached profile. A payload that no longer parses is treated as absent.
    pub fn profile(&self) -> ClientResult<Option<UserProfile>> {
        let Some(raw) = self.storage.get(USER_PROFILE_KEY)? else {
            return Ok(None);
        };
        Ok(serde_json::from_str(&raw).ok())
    }

    pub fn set_profile(&self, profile: &UserProfile) -> ClientResult<()> {
        let serialized = serde_json::to_string(profile).map_err(|err| {
            ClientError::Storage(format!("Failed to serialize user profile: {err}"))
        })?;
        self.storage.set(USER_PROFILE_KEY, &serialized)
    }

    /// Removes both keys. Attempts both removals even if the first fails.
    pub fn clear(&self) -> ClientResult<()> {
        let token = self.storage.remove(ACCESS_TOKEN_KEY);
        let profile = self.storage.remove(USER_PROFILE_KEY);
        token.and(profile)
    }
}
