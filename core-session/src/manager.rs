//! # Session Manager
//!
//! Orchestrates the session lifecycle: sign-in, sign-out, restore,
//! registration, profile updates, and the single-flight token refresh cycle.
//!
//! ## Overview
//!
//! The `SessionManager` is the only component allowed to mutate session
//! state. It keeps the in-memory [`Session`] and the persisted snapshot in
//! step, arms a fixed-lifetime expiry timer on every successful sign-in, and
//! emits [`SessionEvent`]s so observers never have to poll.
//!
//! ## Single-flight refresh
//!
//! Any number of callers may hit a 401 at once and ask for a refresh.
//! Exactly one exchange request reaches the API: the first caller through
//! the refresh lock performs it, and every caller parked behind the lock
//! observes the completed cycle's outcome instead of starting its own.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use core_runtime::events::EventBus;
//! use core_session::{Credentials, SessionManager};
//!
//! let event_bus = EventBus::new(100);
//! let manager = SessionManager::new(&config, event_bus.clone());
//!
//! let user = manager
//!     .login(&Credentials {
//!         email: "maria@mail.com".into(),
//!         password: "12345".into(),
//!     })
//!     .await?;
//! ```

use crate::api::AuthApi;
use crate::error::{ApiError, Result};
use crate::token_store::TokenStore;
use crate::types::{AuthTokens, Credentials, RegisterRequest, Role, Session, User, UserUpdate};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
use core_runtime::logging::redact_if_sensitive;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

pub struct SessionManager {
    session: Arc<RwLock<Session>>,
    token_store: TokenStore,
    api: AuthApi,
    event_bus: EventBus,
    session_ttl: Duration,
    /// Serializes refresh cycles; parked callers observe the winner's outcome
    refresh_lock: Mutex<()>,
    expiry_timer: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    /// Creates a new session manager from the core configuration.
    pub fn new(config: &CoreConfig, event_bus: EventBus) -> Self {
        Self {
            session: Arc::new(RwLock::new(Session::default())),
            token_store: TokenStore::new(Arc::clone(&config.key_value_store)),
            api: AuthApi::new(Arc::clone(&config.http_client), config.api_base_url.clone()),
            event_bus,
            session_ttl: config.session_ttl,
            refresh_lock: Mutex::new(()),
            expiry_timer: Mutex::new(None),
        }
    }

    /// Signs in with email and password.
    ///
    /// Exchanges credentials for tokens, fetches the profile, persists the
    /// snapshot, and only then commits the in-memory session and arms the
    /// expiry timer. A failure at any step, storage included, leaves the
    /// previous session untouched.
    #[instrument(
        skip(self, credentials),
        fields(email = %redact_if_sensitive("email", &credentials.email))
    )]
    pub async fn login(&self, credentials: &Credentials) -> Result<User> {
        info!("Signing in");
        let _ = self
            .event_bus
            .emit(CoreEvent::Session(SessionEvent::SigningIn));

        let tokens = match self.api.login(credentials).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.emit_auth_error(&e);
                return Err(e);
            }
        };

        let user = match self.api.profile(&tokens.access_token).await {
            Ok(user) => user,
            Err(e) => {
                error!(error = %e, "Profile fetch after login failed");
                self.emit_auth_error(&e);
                return Err(e);
            }
        };

        if let Err(e) = self.persist_session(&tokens, &user).await {
            error!(error = %e, "Failed to persist session, aborting sign-in");
            if let Err(clear_err) = self.token_store.clear().await {
                warn!(error = %clear_err, "Failed to clear partially persisted session");
            }
            self.emit_auth_error(&e);
            return Err(e);
        }

        {
            let mut session = self.session.write().await;
            session.current_user = Some(user.clone());
            session.access_token = Some(tokens.access_token.clone());
            session.refresh_token = tokens.refresh_token.clone();
        }

        self.arm_expiry_timer().await;

        let _ = self
            .event_bus
            .emit(CoreEvent::Session(SessionEvent::SignedIn {
                user_id: user.id,
                role: user.role.to_string(),
            }));

        info!(user_id = user.id, role = %user.role, "Signed in");
        Ok(user)
    }

    /// Signs out, clearing in-memory state, persisted keys, and the expiry
    /// timer. Idempotent: signing out while signed out is a no-op that still
    /// succeeds.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        self.disarm_expiry_timer().await;

        {
            let mut session = self.session.write().await;
            session.clear();
        }

        self.token_store.clear().await?;

        let _ = self
            .event_bus
            .emit(CoreEvent::Session(SessionEvent::SignedOut));

        info!("Signed out");
        Ok(())
    }

    /// Exchanges the refresh token for a new token pair, unconditionally.
    ///
    /// For 401-driven refreshes use
    /// [`refresh_token_after`](Self::refresh_token_after), which collapses
    /// concurrent callers into a single exchange.
    ///
    /// On failure the session is torn down; a refresh token the API rejects
    /// will never start working again on its own.
    #[instrument(skip(self))]
    pub async fn refresh_token(&self) -> Result<String> {
        self.run_refresh_cycle(None).await
    }

    /// Refreshes after a request carrying `rejected_token` came back 401.
    ///
    /// Concurrent callers are collapsed into a single exchange: whether a
    /// caller was parked behind an in-flight cycle or arrives after one
    /// finished, a session access token that already differs from the
    /// rejected one is returned as-is instead of starting another exchange.
    /// After a failed cycle tore the session down the same callers get
    /// [`ApiError::Unauthorized`].
    #[instrument(skip(self, rejected_token))]
    pub async fn refresh_token_after(&self, rejected_token: &str) -> Result<String> {
        self.run_refresh_cycle(Some(rejected_token)).await
    }

    async fn run_refresh_cycle(&self, rejected_token: Option<&str>) -> Result<String> {
        let _guard = self.refresh_lock.lock().await;

        // Decided under the lock: only here is the session token guaranteed
        // not to be mid-replacement by another cycle.
        if let Some(rejected) = rejected_token {
            match self.session.read().await.access_token.as_deref() {
                Some(current) if current != rejected => {
                    debug!("Adopting outcome of completed refresh cycle");
                    return Ok(current.to_string());
                }
                None => return Err(ApiError::Unauthorized),
                _ => {}
            }
        }

        let refresh_token = self.session.read().await.refresh_token.clone();
        let Some(refresh_token) = refresh_token else {
            warn!("Refresh requested without a refresh token");
            self.force_signed_out().await;
            let err = ApiError::NoRefreshToken;
            self.emit_auth_error(&err);
            return Err(err);
        };

        let _ = self
            .event_bus
            .emit(CoreEvent::Session(SessionEvent::TokenRefreshing));

        match self.api.refresh(&refresh_token).await {
            Ok(new_tokens) => {
                {
                    let mut session = self.session.write().await;
                    session.access_token = Some(new_tokens.access_token.clone());
                    // Rotation: a response without a refresh token keeps the old one
                    if new_tokens.refresh_token.is_some() {
                        session.refresh_token = new_tokens.refresh_token.clone();
                    }
                }

                if let Err(e) = self.token_store.save_tokens(&new_tokens).await {
                    warn!(error = %e, "Failed to persist refreshed tokens");
                }

                let _ = self
                    .event_bus
                    .emit(CoreEvent::Session(SessionEvent::TokenRefreshed));

                info!("Token refreshed");
                Ok(new_tokens.access_token)
            }
            Err(e) => {
                error!(error = %e, "Token refresh failed, signing out");
                self.force_signed_out().await;
                self.emit_auth_error(&e);
                Err(e)
            }
        }
    }

    /// Rehydrates a persisted session on startup.
    ///
    /// Returns `Ok(None)` when nothing is persisted or the stored token is
    /// no longer accepted. Any failure to verify the persisted token signs
    /// out completely: a session that cannot be confirmed is not kept, in
    /// memory or in storage.
    #[instrument(skip(self))]
    pub async fn restore_session(&self) -> Result<Option<User>> {
        let Some(tokens) = self.token_store.load_tokens().await? else {
            debug!("No persisted session to restore");
            return Ok(None);
        };

        // The persisted snapshot gives observers an identity while the
        // profile probe is in flight; the server's answer replaces it.
        if let Some(snapshot) = self.token_store.load_user().await? {
            let mut session = self.session.write().await;
            session.current_user = Some(snapshot);
        }

        match self.api.profile(&tokens.access_token).await {
            Ok(user) => {
                {
                    let mut session = self.session.write().await;
                    session.current_user = Some(user.clone());
                    session.access_token = Some(tokens.access_token.clone());
                    session.refresh_token = tokens.refresh_token.clone();
                }
                self.token_store.save_user(&user).await?;
                self.arm_expiry_timer().await;

                let _ = self
                    .event_bus
                    .emit(CoreEvent::Session(SessionEvent::SignedIn {
                        user_id: user.id,
                        role: user.role.to_string(),
                    }));

                info!(user_id = user.id, "Session restored");
                Ok(Some(user))
            }
            Err(ApiError::Unauthorized) => {
                info!("Persisted token rejected, clearing stale session");
                self.force_signed_out().await;
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "Session restore failed, signing out");
                self.force_signed_out().await;
                Err(e)
            }
        }
    }

    /// Creates a new account. Does not sign the new user in.
    pub async fn register(&self, request: &RegisterRequest) -> Result<User> {
        self.api.register(request).await
    }

    /// Updates a user's profile.
    ///
    /// When the target is the signed-in user, the in-memory user and the
    /// persisted snapshot are refreshed with the server's response. Edits to
    /// other accounts leave the session alone.
    #[instrument(skip(self, update))]
    pub async fn update_user(&self, user_id: i64, update: &UserUpdate) -> Result<User> {
        let (current_id, access_token) = {
            let session = self.session.read().await;
            match (&session.current_user, &session.access_token) {
                (Some(user), Some(token)) => (user.id, token.clone()),
                _ => return Err(ApiError::NotAuthenticated),
            }
        };

        let updated = self.api.update_user(user_id, update, &access_token).await?;

        if user_id == current_id {
            {
                let mut session = self.session.write().await;
                session.current_user = Some(updated.clone());
            }
            self.token_store.save_user(&updated).await?;
        }

        info!(user_id = updated.id, "Profile updated");
        Ok(updated)
    }

    /// Returns `true` when the signed-in user holds the given role.
    /// Always `false` when signed out.
    pub async fn has_role(&self, role: Role) -> bool {
        self.session
            .read()
            .await
            .current_user
            .as_ref()
            .map(|u| u.role == role)
            .unwrap_or(false)
    }

    /// Returns `true` when the signed-in user holds at least one of the
    /// given roles. An empty slice is vacuously `true` for any signed-in
    /// user.
    pub async fn has_any_role(&self, roles: &[Role]) -> bool {
        let session = self.session.read().await;
        match &session.current_user {
            Some(user) => roles.is_empty() || roles.contains(&user.role),
            None => false,
        }
    }

    /// Returns `true` when the signed-in user holds every given role. Since
    /// a user has exactly one role, this is `true` only for an empty slice
    /// or a slice whose entries all equal the user's role.
    pub async fn has_all_roles(&self, roles: &[Role]) -> bool {
        let session = self.session.read().await;
        match &session.current_user {
            Some(user) => roles.iter().all(|r| *r == user.role),
            None => false,
        }
    }

    /// Current access token, if signed in.
    pub async fn access_token(&self) -> Option<String> {
        self.session.read().await.access_token.clone()
    }

    /// Current user snapshot, if signed in.
    pub async fn current_user(&self) -> Option<User> {
        self.session.read().await.current_user.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_authenticated()
    }

    async fn persist_session(&self, tokens: &AuthTokens, user: &User) -> Result<()> {
        self.token_store.save_tokens(tokens).await?;
        self.token_store.save_user(user).await?;
        Ok(())
    }

    /// Clears state and storage without the usual logout logging. Used when
    /// the session dies under the caller (failed refresh) rather than by
    /// explicit user intent.
    async fn force_signed_out(&self) {
        self.disarm_expiry_timer().await;
        {
            let mut session = self.session.write().await;
            session.clear();
        }
        if let Err(e) = self.token_store.clear().await {
            warn!(error = %e, "Failed to clear session storage");
        }
        let _ = self
            .event_bus
            .emit(CoreEvent::Session(SessionEvent::SignedOut));
    }

    /// Arms (or re-arms) the fixed-lifetime expiry timer. The session ends
    /// `session_ttl` after sign-in regardless of activity.
    async fn arm_expiry_timer(&self) {
        let session = Arc::clone(&self.session);
        let token_store = self.token_store.clone();
        let event_bus = self.event_bus.clone();
        let ttl = self.session_ttl;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            info!("Session lifetime elapsed, signing out");
            {
                let mut session = session.write().await;
                session.clear();
            }
            if let Err(e) = token_store.clear().await {
                warn!(error = %e, "Failed to clear session storage on expiry");
            }
            // SessionExpired is the one notification for this transition;
            // observers treat it as a sign-out with a reason attached.
            let _ = event_bus.emit(CoreEvent::Session(SessionEvent::SessionExpired));
        });

        let mut timer = self.expiry_timer.lock().await;
        if let Some(previous) = timer.replace(handle) {
            previous.abort();
        }
    }

    async fn disarm_expiry_timer(&self) {
        let mut timer = self.expiry_timer.lock().await;
        if let Some(handle) = timer.take() {
            handle.abort();
        }
    }

    fn emit_auth_error(&self, error: &ApiError) {
        let _ = self
            .event_bus
            .emit(CoreEvent::Session(SessionEvent::AuthError {
                message: error.to_string(),
                recoverable: error.is_transient(),
            }));
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        // The timer task holds its own clones and would otherwise run to
        // completion against a dead manager.
        if let Ok(mut timer) = self.expiry_timer.try_lock() {
            if let Some(handle) = timer.take() {
                handle.abort();
            }
        }
    }
}
