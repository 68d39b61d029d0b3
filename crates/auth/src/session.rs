//! Auth state machine.
//!
//! ```text
//!                  login / exchange / refresh ok
//!  Unauthenticated ─────────────────────────────▶ Authenticated
//!        ▲                                             │
//!        └──────── logout / refresh failed / ──────────┘
//!                  login failed / expiry detected
//! ```
//!
//! The session store is the source of truth. The observable [`AuthStatus`] is
//! a notification channel for subscribers and is reconciled against the
//! stored token whenever [`AuthSession::is_authenticated`] runs.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use bankflow_core::{AuthConfig, AuthError, AuthResult, Clock, SystemClock, keys};
use bankflow_events::AuthBroadcaster;

use crate::backend::{AuthBackend, ExchangeRequest, LoginRequest, LoginResponse, RefreshRequest};
use crate::claims::{self, Claims};
use crate::guard::AuthCheck;
use crate::navigation::Navigator;
use crate::store::SessionStore;
use crate::{Permission, Role, UserInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    Unauthenticated,
    Authenticated,
}

impl AuthStatus {
    pub fn from_valid(valid: bool) -> Self {
        if valid {
            Self::Authenticated
        } else {
            Self::Unauthenticated
        }
    }

    pub fn is_authenticated(self) -> bool {
        self == Self::Authenticated
    }
}

impl core::fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AuthStatus::Unauthenticated => write!(f, "unauthenticated"),
            AuthStatus::Authenticated => write!(f, "authenticated"),
        }
    }
}

/// Collaborators an [`AuthSession`] is wired to.
pub struct SessionParts {
    pub store: Arc<dyn SessionStore>,
    pub backend: Arc<dyn AuthBackend>,
    pub navigator: Arc<dyn Navigator>,
    pub broadcaster: AuthBroadcaster,
    pub clock: Arc<dyn Clock>,
}

impl SessionParts {
    pub fn new(
        store: Arc<dyn SessionStore>,
        backend: Arc<dyn AuthBackend>,
        navigator: Arc<dyn Navigator>,
        broadcaster: AuthBroadcaster,
    ) -> Self {
        Self {
            store,
            backend,
            navigator,
            broadcaster,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

pub struct AuthSession {
    config: AuthConfig,
    store: Arc<dyn SessionStore>,
    backend: Arc<dyn AuthBackend>,
    navigator: Arc<dyn Navigator>,
    broadcaster: AuthBroadcaster,
    clock: Arc<dyn Clock>,
    state: watch::Sender<AuthStatus>,
}

impl core::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthSession")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl AuthSession {
    /// Build a session from whatever the store currently holds.
    ///
    /// A stored token that is missing, malformed or expired clears the auth
    /// data left over from a previous session.
    pub fn new(config: AuthConfig, parts: SessionParts) -> Self {
        let SessionParts {
            store,
            backend,
            navigator,
            broadcaster,
            clock,
        } = parts;

        let valid = claims::is_valid_at(store.get(keys::JWT_TOKEN).as_deref(), clock.now_seconds());
        let (state, _) = watch::channel(AuthStatus::from_valid(valid));

        let session = Self {
            config,
            store,
            backend,
            navigator,
            broadcaster,
            clock,
            state,
        };

        if !valid {
            session.clear_auth_data();
        }
        tracing::info!(status = %session.status(), "auth session initialised");

        session
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Last emitted status. Prefer [`AuthSession::is_authenticated`] for decisions.
    pub fn status(&self) -> AuthStatus {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthStatus> {
        self.state.subscribe()
    }

    /// Re-check the stored token; this never trusts the cached status.
    ///
    /// If the cached status disagrees (e.g. the token expired since the last
    /// transition) subscribers are notified of the corrected value.
    pub fn is_authenticated(&self) -> bool {
        let valid = claims::is_valid_at(self.token().as_deref(), self.clock.now_seconds());
        let derived = AuthStatus::from_valid(valid);

        let changed = self.state.send_if_modified(|current| {
            if *current == derived {
                false
            } else {
                *current = derived;
                true
            }
        });
        if changed {
            tracing::info!(status = %derived, "auth status reconciled with stored token");
        }

        valid
    }

    pub async fn login(&self, credentials: &LoginRequest) -> AuthResult<LoginResponse> {
        let response = match self.backend.login(credentials).await {
            Ok(response) => response,
            Err(err) => return Err(self.fail_login(err)),
        };

        let Some(token) = response.token.as_deref().filter(|t| !t.is_empty()) else {
            return Err(self.fail_login(AuthError::login("response did not contain a token")));
        };

        self.store.set(keys::JWT_TOKEN, token);
        if let Some(refresh) = response.refresh_token.as_deref() {
            self.store.set(keys::REFRESH_TOKEN, refresh);
        }
        if let Some(user) = &response.user {
            self.store.set(keys::USER_INFO, &user.to_string());
        }

        self.emit(AuthStatus::Authenticated);
        self.broadcaster.publish_token(token);
        tracing::info!(username = %credentials.username, "login succeeded");

        Ok(response)
    }

    fn fail_login(&self, err: AuthError) -> AuthError {
        let err = match err {
            AuthError::LoginFailure(_) => err,
            other => AuthError::login(other.to_string()),
        };
        tracing::warn!(%err, "login failed");

        self.clear_auth_data();
        self.emit(AuthStatus::Unauthenticated);
        err
    }

    /// End the session. Safe to call repeatedly.
    pub fn logout(&self) {
        self.clear_auth_data();
        self.emit(AuthStatus::Unauthenticated);
        self.navigator.navigate(&self.config.login_route);
        self.broadcaster.publish_logout();
        tracing::info!("logged out");
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Any failure ends the session (logout side effects included).
    pub async fn refresh(&self) -> AuthResult<String> {
        let Some(refresh_token) = self.store.get(keys::REFRESH_TOKEN) else {
            return Err(self.fail_refresh(AuthError::refresh("no refresh token available")));
        };

        let request = RefreshRequest { refresh_token };
        let response = match self.backend.refresh(&request).await {
            Ok(response) => response,
            Err(err) => return Err(self.fail_refresh(err)),
        };

        match response.token.filter(|t| !t.is_empty()) {
            Some(token) => {
                self.store.set(keys::JWT_TOKEN, &token);
                self.emit(AuthStatus::Authenticated);
                tracing::info!("access token refreshed");
                Ok(token)
            }
            None => Err(self.fail_refresh(AuthError::refresh("response did not contain a token"))),
        }
    }

    fn fail_refresh(&self, err: AuthError) -> AuthError {
        let err = match err {
            AuthError::RefreshFailure(_) => err,
            other => AuthError::refresh(other.to_string()),
        };
        tracing::warn!(%err, "token refresh failed; ending session");

        self.logout();
        err
    }

    /// Trade an identity-provider token for a backend JWT (hybrid sign-in).
    pub async fn exchange_identity(&self, request: &ExchangeRequest) -> AuthResult<()> {
        let response = match self.backend.exchange(request).await {
            Ok(response) => response,
            Err(err) => return Err(self.fail_exchange(err)),
        };

        let Some(token) = response.jwt_token.as_deref().filter(|t| !t.is_empty()) else {
            return Err(self.fail_exchange(AuthError::login("exchange did not return a token")));
        };

        self.store.set(keys::JWT_TOKEN, token);
        if let Some(refresh) = response.refresh_token.as_deref() {
            self.store.set(keys::REFRESH_TOKEN, refresh);
        }
        if let Some(permissions) = &response.permissions {
            match serde_json::to_string(permissions) {
                Ok(encoded) => self.store.set(keys::USER_PERMISSIONS, &encoded),
                Err(err) => tracing::warn!(%err, "could not encode permissions"),
            }
        }

        self.emit(AuthStatus::Authenticated);
        self.broadcaster.publish_token(token);
        self.navigator.navigate(&self.config.home_route);
        tracing::info!(username = %request.user_info.username, "identity exchange succeeded");

        Ok(())
    }

    fn fail_exchange(&self, err: AuthError) -> AuthError {
        let err = self.fail_login(err);
        self.navigator.navigate(&self.config.login_route);
        err
    }

    pub fn token(&self) -> Option<String> {
        self.store.get(keys::JWT_TOKEN)
    }

    pub fn claims(&self) -> Option<Claims> {
        claims::decode(&self.token()?).ok()
    }

    pub fn user_info(&self) -> Option<UserInfo> {
        self.claims()?.user_info()
    }

    /// The `user` object returned by the last login, if any.
    pub fn stored_user(&self) -> Option<serde_json::Value> {
        let raw = self.store.get(keys::USER_INFO)?;
        serde_json::from_str(&raw).ok()
    }

    pub fn username(&self) -> Option<String> {
        self.claims()?.subject().map(str::to_string)
    }

    pub fn roles(&self) -> Vec<Role> {
        self.claims().map(|c| c.roles).unwrap_or_default()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles().iter().any(|r| r.as_str() == role)
    }

    pub fn permissions(&self) -> Vec<Permission> {
        let Some(raw) = self.store.get(keys::USER_PERMISSIONS) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(list) => list.into_iter().map(Permission::from).collect(),
            Err(err) => {
                tracing::warn!(%err, "ignoring unreadable stored permissions");
                Vec::new()
            }
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions().iter().any(|p| p.as_str() == permission)
    }

    pub fn has_all_permissions(&self, required: &[&str]) -> bool {
        let granted = self.permissions();
        required.iter().all(|r| granted.iter().any(|p| p.as_str() == *r))
    }

    pub fn has_any_permission(&self, required: &[&str]) -> bool {
        let granted = self.permissions();
        required.iter().any(|r| granted.iter().any(|p| p.as_str() == *r))
    }

    /// Read and forget the route recorded by the guard before login.
    pub fn take_redirect_url(&self) -> Option<String> {
        let url = self.store.get(keys::REDIRECT_URL)?;
        self.store.remove(keys::REDIRECT_URL);
        Some(url)
    }

    fn emit(&self, status: AuthStatus) {
        let previous = self.state.send_replace(status);
        if previous != status {
            tracing::info!(from = %previous, to = %status, "auth status changed");
        }
    }

    fn clear_auth_data(&self) {
        for key in keys::AUTH_DATA {
            self.store.remove(key);
        }
    }
}

impl AuthCheck for AuthSession {
    fn is_authenticated(&self) -> bool {
        AuthSession::is_authenticated(self)
    }
}
