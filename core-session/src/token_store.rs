//! # Token Store
//!
//! Persists the token pair and user snapshot in the host-provided key-value
//! store so a session survives application restarts.
//!
//! ## Storage layout
//!
//! | Key            | Value                          |
//! |----------------|--------------------------------|
//! | `token`        | access token, raw string       |
//! | `refreshToken` | refresh token, raw string      |
//! | `user`         | JSON-serialized [`User`]       |
//!
//! The three keys are the complete persistence footprint of a session;
//! [`clear`](TokenStore::clear) removes exactly these and nothing else, so
//! unrelated data in a shared store is left alone.

use crate::error::{ApiError, Result};
use crate::types::{AuthTokens, User};
use bridge_traits::KeyValueStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

const ACCESS_TOKEN_KEY: &str = "token";
const REFRESH_TOKEN_KEY: &str = "refreshToken";
const USER_KEY: &str = "user";

/// Session persistence over a [`KeyValueStore`].
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persists the token pair.
    ///
    /// When the pair carries no refresh token the old `refreshToken` entry is
    /// left in place, matching rotation semantics where a refresh response
    /// without a new refresh token keeps the previous one valid.
    pub async fn save_tokens(&self, tokens: &AuthTokens) -> Result<()> {
        self.store
            .set(ACCESS_TOKEN_KEY, &tokens.access_token)
            .await
            .map_err(|e| ApiError::Storage(e.to_string()))?;

        if let Some(refresh_token) = &tokens.refresh_token {
            self.store
                .set(REFRESH_TOKEN_KEY, refresh_token)
                .await
                .map_err(|e| ApiError::Storage(e.to_string()))?;
        }

        info!(
            has_refresh_token = tokens.refresh_token.is_some(),
            "Tokens persisted"
        );
        Ok(())
    }

    /// Loads the persisted token pair.
    ///
    /// Returns `None` when no access token is stored; a dangling refresh
    /// token without an access token is not a restorable session.
    pub async fn load_tokens(&self) -> Result<Option<AuthTokens>> {
        let access_token = self
            .store
            .get(ACCESS_TOKEN_KEY)
            .await
            .map_err(|e| ApiError::Storage(e.to_string()))?;

        let Some(access_token) = access_token else {
            debug!("No persisted access token");
            return Ok(None);
        };

        let refresh_token = self
            .store
            .get(REFRESH_TOKEN_KEY)
            .await
            .map_err(|e| ApiError::Storage(e.to_string()))?;

        Ok(Some(AuthTokens {
            access_token,
            refresh_token,
        }))
    }

    /// Persists the user snapshot as JSON.
    pub async fn save_user(&self, user: &User) -> Result<()> {
        let json = serde_json::to_string(user)?;
        self.store
            .set(USER_KEY, &json)
            .await
            .map_err(|e| ApiError::Storage(e.to_string()))?;
        debug!(user_id = user.id, "User snapshot persisted");
        Ok(())
    }

    /// Loads the persisted user snapshot.
    ///
    /// A corrupted snapshot is deleted and treated as absent; the session is
    /// then rehydrated from the profile endpoint instead of failing restore.
    pub async fn load_user(&self) -> Result<Option<User>> {
        let json = self
            .store
            .get(USER_KEY)
            .await
            .map_err(|e| ApiError::Storage(e.to_string()))?;

        let Some(json) = json else {
            return Ok(None);
        };

        match serde_json::from_str::<User>(&json) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                warn!(error = %e, "Corrupted user snapshot, discarding");
                self.store
                    .remove(USER_KEY)
                    .await
                    .map_err(|e| ApiError::Storage(e.to_string()))?;
                Ok(None)
            }
        }
    }

    /// Removes all three session keys. Idempotent.
    pub async fn clear(&self) -> Result<()> {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
            self.store
                .remove(key)
                .await
                .map_err(|e| ApiError::Storage(e.to_string()))?;
        }
        info!("Session storage cleared");
        Ok(())
    }
}
