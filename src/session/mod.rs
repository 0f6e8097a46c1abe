//! Console session state: the bearer token pair, the derived authentication flag and
//! the cached user profile.
//!
//! [`SessionManager`] is the only owner of the token pair. It is created once from
//! persisted storage and afterwards changes only through `login`, `logout`,
//! `refresh_tokens` and `clear_auth`. Each transition replaces the in-memory pair as
//! a whole and writes both tokens plus the auth snapshot in a single storage batch,
//! so nobody can observe a half-updated pair. `is_authenticated` is recomputed from
//! the pair on every read.
//!
//! Persisted values that cannot be decoded are logged and treated as absent.

mod profile;

pub use profile::UserProfile;

use crate::storage::{
    Storage, StorageBatch, StorageError, ACCESS_TOKEN_KEY, AUTH_STORE_KEY, REFRESH_TOKEN_KEY,
    USER_INFO_KEY,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError, RwLock},
};
use tracing::{debug, info, warn};

/// Opaque bearer credentials, always stored and replaced together.
#[derive(Clone, Debug)]
pub struct TokenPair {
    access_token: SecretString,
    refresh_token: SecretString,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            refresh_token: SecretString::from(refresh_token.into()),
        }
    }

    #[must_use]
    pub fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    #[must_use]
    pub fn refresh_token(&self) -> &SecretString {
        &self.refresh_token
    }
}

/// Wire shape of the login and refresh responses.
#[derive(Deserialize)]
pub(crate) struct TokenPayload {
    access_token: String,
    refresh_token: String,
}

impl From<TokenPayload> for TokenPair {
    fn from(payload: TokenPayload) -> Self {
        Self::new(payload.access_token, payload.refresh_token)
    }
}

/// Persisted auth snapshot, kept in the same shape the web console used.
#[derive(Deserialize)]
struct AuthSnapshot {
    state: AuthSnapshotState,
}

#[derive(Deserialize)]
struct AuthSnapshotState {
    #[serde(rename = "isAuthenticated")]
    is_authenticated: bool,
}

fn snapshot(is_authenticated: bool) -> String {
    json!({
        "state": { "isAuthenticated": is_authenticated },
        "version": 0
    })
    .to_string()
}

#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    storage: Arc<dyn Storage>,
    tokens: RwLock<Option<TokenPair>>,
    // Serializes token writes so storage order follows memory order.
    persist: Mutex<()>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("storage", &self.inner.storage)
            .field("is_authenticated", &self.is_authenticated())
            .finish()
    }
}

impl SessionManager {
    /// Loads the session from persisted storage.
    ///
    /// A pair with only one half present is treated as corrupt and ignored. The auth
    /// snapshot is only compared against the tokens for diagnostics; the tokens win.
    #[must_use]
    pub fn init(storage: Arc<dyn Storage>) -> Self {
        let access = non_empty(storage.get(ACCESS_TOKEN_KEY));
        let refresh = non_empty(storage.get(REFRESH_TOKEN_KEY));

        let tokens = match (access, refresh) {
            (Some(access), Some(refresh)) => Some(TokenPair::new(access, refresh)),
            (None, None) => None,
            _ => {
                warn!("Persisted token pair is incomplete; treating session as signed out");
                None
            }
        };

        if let Some(raw) = storage.get(AUTH_STORE_KEY) {
            match serde_json::from_str::<AuthSnapshot>(&raw) {
                Ok(snapshot) if snapshot.state.is_authenticated != tokens.is_some() => {
                    debug!(
                        snapshot = snapshot.state.is_authenticated,
                        tokens = tokens.is_some(),
                        "Auth snapshot disagrees with persisted tokens; using tokens"
                    );
                }
                Ok(_) => {}
                Err(err) => warn!("Ignoring corrupt auth snapshot: {err}"),
            }
        }

        Self {
            inner: Arc::new(SessionInner {
                storage,
                tokens: RwLock::new(tokens),
                persist: Mutex::new(()),
            }),
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read(|tokens| tokens.is_some())
    }

    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.read(|tokens| tokens.as_ref().map(|pair| pair.access_token.clone()))
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<SecretString> {
        self.read(|tokens| tokens.as_ref().map(|pair| pair.refresh_token.clone()))
    }

    /// Returns true when `token` is the access token currently held.
    #[must_use]
    pub fn is_current_access_token(&self, token: &SecretString) -> bool {
        self.read(|tokens| {
            tokens
                .as_ref()
                .is_some_and(|pair| pair.access_token.expose_secret() == token.expose_secret())
        })
    }

    /// Stores the pair returned by a successful login.
    ///
    /// # Errors
    /// Returns an error if the pair could not be persisted. The in-memory session is
    /// updated regardless.
    pub fn login(&self, pair: TokenPair) -> Result<(), StorageError> {
        info!("Session established");
        self.replace(Some(pair), &[])
    }

    /// Replaces the pair after a successful refresh exchange.
    ///
    /// # Errors
    /// Returns an error if the pair could not be persisted. The in-memory session is
    /// updated regardless.
    pub fn refresh_tokens(&self, pair: TokenPair) -> Result<(), StorageError> {
        debug!("Session tokens rotated");
        self.replace(Some(pair), &[])
    }

    /// Drops the tokens, the auth snapshot and the cached profile.
    ///
    /// # Errors
    /// Returns an error if storage could not be updated. The in-memory session is
    /// cleared regardless.
    pub fn logout(&self) -> Result<(), StorageError> {
        info!("Session closed");
        self.replace(None, &[AUTH_STORE_KEY, USER_INFO_KEY])
    }

    /// Drops the tokens without touching anything else.
    ///
    /// # Errors
    /// Returns an error if storage could not be updated. The in-memory session is
    /// cleared regardless.
    pub fn clear_auth(&self) -> Result<(), StorageError> {
        debug!("Session credentials cleared");
        self.replace(None, &[])
    }

    /// Caches the signed-in user's profile.
    ///
    /// # Errors
    /// Returns an error if the profile could not be encoded or persisted.
    pub fn cache_profile(&self, profile: &UserProfile) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(profile)?;
        self.inner
            .storage
            .apply(StorageBatch::new().set(USER_INFO_KEY, encoded))
    }

    /// Returns the cached profile, or `None` when it is missing or unreadable.
    #[must_use]
    pub fn cached_profile(&self) -> Option<UserProfile> {
        let raw = self.inner.storage.get(USER_INFO_KEY)?;
        match serde_json::from_str::<UserProfile>(&raw) {
            Ok(profile) if profile.id.trim().is_empty() => {
                warn!("Cached profile has no subject id; ignoring it");
                None
            }
            Ok(profile) => Some(profile),
            Err(err) => {
                warn!("Ignoring corrupt cached profile: {err}");
                None
            }
        }
    }

    /// Removes the cached profile.
    ///
    /// # Errors
    /// Returns an error if storage could not be updated.
    pub fn clear_profile(&self) -> Result<(), StorageError> {
        self.inner
            .storage
            .apply(StorageBatch::new().remove(USER_INFO_KEY))
    }

    fn read<T>(&self, f: impl FnOnce(&Option<TokenPair>) -> T) -> T {
        let tokens = self
            .inner
            .tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f(&tokens)
    }

    // Readers only wait for the in-memory swap; the blocking storage write happens
    // after the token lock is released, under the persist lock.
    fn replace(&self, pair: Option<TokenPair>, also_remove: &[&str]) -> Result<(), StorageError> {
        let _persist = self
            .inner
            .persist
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut batch = match &pair {
            Some(pair) => StorageBatch::new()
                .set(ACCESS_TOKEN_KEY, pair.access_token.expose_secret())
                .set(REFRESH_TOKEN_KEY, pair.refresh_token.expose_secret())
                .set(AUTH_STORE_KEY, snapshot(true)),
            None => StorageBatch::new()
                .remove(ACCESS_TOKEN_KEY)
                .remove(REFRESH_TOKEN_KEY)
                .set(AUTH_STORE_KEY, snapshot(false)),
        };
        for key in also_remove {
            batch = batch.remove(key);
        }

        *self
            .inner
            .tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner) = pair;

        self.inner.storage.apply(batch)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
