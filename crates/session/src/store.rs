//! Auth session store
//!
//! Owns the current [`Session`]. It changes only through [`SessionStore::bootstrap`],
//! [`SessionStore::login`], [`SessionStore::logout`] and login-required
//! events from the HTTP client; observers subscribe to a watch channel.

use crate::error::SessionResult;
use crate::form::LoginForm;
use portal_core::access::Access;
use portal_core::{Preferences, Role, User};
use portal_http::{ApiClient, AuthEvent};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Authentication state seen by guards and views
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub is_authenticated: bool,
    pub user: Option<User>,
    pub is_loading: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            is_authenticated: false,
            user: None,
            is_loading: true, // Resolved by bootstrap
        }
    }
}

impl Session {
    pub fn authenticated(user: User) -> Self {
        Self {
            is_authenticated: true,
            user: Some(user),
            is_loading: false,
        }
    }

    pub const fn anonymous() -> Self {
        Self {
            is_authenticated: false,
            user: None,
            is_loading: false,
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|user| user.role)
    }

    /// Permission checks for the current user
    pub fn access(&self) -> Access<'_> {
        Access::new(self.user.as_ref())
    }

    fn reduce(&mut self, action: SessionAction) {
        match action {
            SessionAction::SignedIn(user) => *self = Self::authenticated(user),
            SessionAction::SignedOut => *self = Self::anonymous(),
            SessionAction::SetLoading(is_loading) => self.is_loading = is_loading,
        }
    }
}

enum SessionAction {
    SignedIn(User),
    SignedOut,
    SetLoading(bool),
}

pub struct SessionStore {
    client: ApiClient,
    preferences: Preferences,
    state: watch::Sender<Session>,
}

impl SessionStore {
    /// Preferences share the client's storage backend
    pub fn new(client: ApiClient) -> Self {
        let preferences = Preferences::new(client.tokens().backend().clone());
        let (state, _) = watch::channel(Session::default());
        Self {
            client,
            preferences,
            state,
        }
    }

    pub const fn client(&self) -> &ApiClient {
        &self.client
    }

    pub const fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Snapshot of the current session
    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    fn dispatch(&self, action: SessionAction) {
        self.state.send_modify(|session| session.reduce(action));
    }

    /// Restore the session from persisted tokens
    ///
    /// Runs once at startup; always leaves the session resolved.
    pub async fn bootstrap(&self) -> Session {
        self.dispatch(SessionAction::SetLoading(true));

        let user = match self.client.tokens().access_token() {
            Ok(Some(_)) => match self.client.profile().await {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!("Could not restore session: {e}");
                    self.clear_tokens();
                    None
                }
            },
            Ok(None) => {
                debug!("No stored access token, starting signed out");
                None
            }
            Err(e) => {
                warn!("Could not read stored tokens: {e}");
                None
            }
        };

        match user {
            Some(user) => {
                info!(user_id = %user.id, role = %user.role, "Session restored");
                self.dispatch(SessionAction::SignedIn(user));
            }
            None => self.dispatch(SessionAction::SignedOut),
        }
        self.session()
    }

    /// Sign in with a validated form, then load the full profile
    ///
    /// On any failure the stored tokens are dropped and the session stays
    /// signed out.
    pub async fn login(&self, form: &LoginForm) -> SessionResult<User> {
        form.validate()?;

        let user = match self.sign_in(form).await {
            Ok(user) => user,
            Err(e) => {
                warn!(email = %form.email, "Login failed: {e}");
                self.clear_tokens();
                self.dispatch(SessionAction::SignedOut);
                return Err(e);
            }
        };

        let remembered = form.remember_me.then_some(form.email.as_str());
        if let Err(e) = self.preferences.remember_email(remembered) {
            warn!("Failed to update remembered email: {e}");
        }

        info!(user_id = %user.id, role = %user.role, "Logged in");
        self.dispatch(SessionAction::SignedIn(user.clone()));
        Ok(user)
    }

    async fn sign_in(&self, form: &LoginForm) -> SessionResult<User> {
        self.client.login(&form.email, &form.password).await?;
        Ok(self.client.profile().await?)
    }

    /// Sign out locally, telling the backend when it can be reached
    pub async fn logout(&self) {
        if let Err(e) = self.client.logout().await {
            warn!("Logout request failed, clearing local session anyway: {e}");
        }
        self.clear_tokens();
        self.dispatch(SessionAction::SignedOut);
        info!("Logged out");
    }

    pub fn handle_event(&self, event: AuthEvent) {
        match event {
            AuthEvent::LoginRequired => {
                if self.state.borrow().is_authenticated {
                    info!("Session expired, login required");
                }
                self.dispatch(SessionAction::SignedOut);
            }
            AuthEvent::TokensRefreshed => debug!("Tokens refreshed"),
        }
    }

    /// Follow the client's auth events until the store is dropped
    pub fn listen_for_auth_events(self: &Arc<Self>) -> JoinHandle<()> {
        let mut events = self.client.events().subscribe();
        let store = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let Some(store) = store.upgrade() else { break };
                        store.handle_event(event);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Auth event listener fell behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Auth event listener stopped");
        })
    }

    fn clear_tokens(&self) {
        if let Err(e) = self.client.tokens().clear() {
            warn!("Failed to clear stored tokens: {e}");
        }
    }
}
