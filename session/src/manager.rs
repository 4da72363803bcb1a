//! Session manager: the client's single authentication lifecycle.
//!
//! ARCHITECTURE
//! ============
//! One `SessionManager` is created at startup and cloned into every consumer
//! (views, the API client, the CLI). Clones share a single [`Session`] held
//! in a `watch` channel; all mutation goes through the methods below, and
//! observers call [`SessionManager::subscribe`] to react to changes.
//!
//! ```text
//!                 restore_session
//!   Unauthenticated ───────────► Restoring ──► Authenticated
//!         ▲   ▲                     │                │
//!         │   └──── logout ◄── Expired ◄─────────────┘ (401 anywhere)
//!         └──────────────── login / register ─────────┘
//! ```
//!
//! TRADE-OFFS
//! ==========
//! No lock is held across an await. Two overlapping logins are not
//! coordinated: whichever resolves last overwrites the session.

#[cfg(test)]
#[path = "manager_test.rs"]
mod manager_test;

use std::sync::Arc;

use tokio::sync::watch;

use crate::decoder::{self, Claims};
use crate::gateway::{AuthError, AuthGateway};
use crate::token_store::TokenStore;
use crate::types::{RegisterRequest, User};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    Unauthenticated,
    Restoring,
    Authenticated,
    Expired,
}

/// Where the UI should go after an auth transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Navigation {
    Dashboard,
    Login,
}

impl Navigation {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Dashboard => "/dashboard",
            Self::Login => "/login",
        }
    }
}

/// The client's current belief about who is logged in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<User>,
    pub phase: SessionPhase,
    pub loading: bool,
}

impl Default for Session {
    /// Application start: nobody logged in, restoration pending.
    fn default() -> Self {
        Self { token: None, user: None, phase: SessionPhase::Unauthenticated, loading: true }
    }
}

impl Session {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

struct Inner {
    store: Arc<dyn TokenStore>,
    gateway: Arc<dyn AuthGateway>,
    state: watch::Sender<Session>,
}

/// Shared handle over the session state. Cheap to clone.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>, gateway: Arc<dyn AuthGateway>) -> Self {
        let (state, _) = watch::channel(Session::default());
        Self { inner: Arc::new(Inner { store, gateway, state }) }
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.inner.state.borrow().phase
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user.clone()
    }

    /// The token store this session persists to.
    #[must_use]
    pub fn token_store(&self) -> Arc<dyn TokenStore> {
        Arc::clone(&self.inner.store)
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    fn update(&self, f: impl FnOnce(&mut Session)) {
        self.inner.state.send_modify(f);
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Rebuild the session from a persisted token at startup.
    ///
    /// Never fails: a missing, malformed, expired or rejected token all end
    /// in `Unauthenticated` with the store cleared.
    pub async fn restore_session(&self) -> SessionPhase {
        let Some(token) = self.inner.store.get() else {
            self.update(|s| {
                s.phase = SessionPhase::Unauthenticated;
                s.loading = false;
            });
            return SessionPhase::Unauthenticated;
        };

        self.update(|s| {
            s.phase = SessionPhase::Restoring;
            s.loading = true;
            s.token = Some(token.clone());
        });

        match decoder::decode(&token) {
            Ok(claims) if !claims.is_expired(decoder::now_unix()) => {}
            Ok(Claims { exp, .. }) => {
                tracing::info!(?exp, "stored token expired");
                return self.expire();
            }
            Err(e) => {
                tracing::warn!(error = %e, "stored token undecodable");
                return self.expire();
            }
        }

        let result = self.inner.gateway.fetch_current_user(&token).await;

        // A logout or newer login while the request was in flight wins.
        if self.inner.store.get().as_deref() != Some(token.as_str()) {
            tracing::debug!("stored token changed during restore; dropping result");
            self.update(|s| s.loading = false);
            return self.phase();
        }

        match result {
            Ok(user) => {
                tracing::info!(user_id = user.id, "session restored");
                self.update(|s| {
                    s.user = Some(user);
                    s.phase = SessionPhase::Authenticated;
                    s.loading = false;
                });
                SessionPhase::Authenticated
            }
            Err(e) => {
                tracing::warn!(error = %e, "session restore rejected");
                self.logout();
                SessionPhase::Unauthenticated
            }
        }
    }

    /// Same as [`SessionManager::restore_session`].
    pub async fn check_auth_status(&self) -> SessionPhase {
        self.restore_session().await
    }

    fn expire(&self) -> SessionPhase {
        self.update(|s| s.phase = SessionPhase::Expired);
        self.logout();
        SessionPhase::Unauthenticated
    }

    /// Log in and persist the returned token.
    ///
    /// # Errors
    ///
    /// Returns the gateway's [`AuthError`] unchanged so the UI can show it.
    pub async fn login(&self, username: &str, password: &str) -> Result<Navigation, AuthError> {
        self.update(|s| s.loading = true);

        match self.inner.gateway.login(username, password).await {
            Ok(resp) => {
                self.inner.store.set(&resp.access_token);
                tracing::info!(user_id = resp.user.id, "logged in");
                self.update(|s| {
                    s.token = Some(resp.access_token);
                    s.user = Some(resp.user);
                    s.phase = SessionPhase::Authenticated;
                    s.loading = false;
                });
                Ok(Navigation::Dashboard)
            }
            Err(e) => {
                tracing::info!(error = %e, "login failed");
                self.update(|s| s.loading = false);
                Err(e)
            }
        }
    }

    /// Create an account, then log in with the same credentials.
    ///
    /// # Errors
    ///
    /// Returns the registration error (no login is attempted) or the error
    /// from the follow-up login.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<Navigation, AuthError> {
        self.update(|s| s.loading = true);

        let request = RegisterRequest {
            username: username.to_owned(),
            email: email.to_owned(),
            password: password.to_owned(),
            confirm_password: confirm_password.to_owned(),
        };
        if let Err(e) = self.inner.gateway.register(&request).await {
            tracing::info!(error = %e, "registration failed");
            self.update(|s| s.loading = false);
            return Err(e);
        }

        self.login(username, password).await
    }

    /// Drop all credentials. Safe from any state, idempotent.
    pub fn logout(&self) -> Navigation {
        self.inner.store.clear();
        self.update(|s| {
            s.token = None;
            s.user = None;
            s.phase = SessionPhase::Unauthenticated;
            s.loading = false;
        });
        Navigation::Login
    }

    /// Any 401 seen while a session is active ends up here.
    pub fn handle_unauthorized(&self) -> Navigation {
        tracing::warn!("backend rejected credentials; forcing logout");
        self.logout()
    }
}
