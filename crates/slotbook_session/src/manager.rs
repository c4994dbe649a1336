//! The session state machine.
//!
//! ```text
//! Anonymous --login/register--> Authenticating --ok--> Authenticated
//!     ^                              |                      |
//!     +-----------failure------------+                      |
//!     +------------------------logout-----------------------+
//! ```
//!
//! Identity and credential live in one `Option<SignedIn>`, so one is never
//! present without the other. Every change is written to the
//! [`SessionStore`] before the in-memory state is replaced.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use slotbook_common::{ApiError, CredentialProvider, SlotbookError};
use slotbook_config::SessionConfig;

use crate::models::{
    AuthResponse, Credential, Identity, LoginRequest, RegisterProfile, Session, SessionEvent,
    SessionState, SignedIn,
};
use crate::service::AuthService;
use crate::storage::{SessionStore, StoreError, TOKEN_KEY, USER_KEY};

const EVENT_CAPACITY: usize = 16;

#[derive(Error, Debug)]
pub enum SessionError {
    /// The server rejected the attempt and said why.
    #[error("{0}")]
    AuthFailure(String),
    /// No usable answer from the server.
    #[error("{0}")]
    TransportFailure(String),
    /// A login or registration is already in flight.
    #[error("Another sign-in is already in progress")]
    Busy,
    /// The new session could not be persisted; nothing was kept.
    #[error("Could not persist session: {0}")]
    Storage(#[from] StoreError),
}

impl SessionError {
    fn from_api(err: ApiError) -> Self {
        match err.server_message() {
            Some(message) => SessionError::AuthFailure(message.to_string()),
            None => SessionError::TransportFailure(err.to_string()),
        }
    }
}

impl From<SessionError> for SlotbookError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::AuthFailure(msg) => SlotbookError::AuthError(msg),
            SessionError::TransportFailure(msg) => SlotbookError::HttpError(msg),
            SessionError::Busy => SlotbookError::BusyError(SessionError::Busy.to_string()),
            SessionError::Storage(e) => e.into(),
        }
    }
}

/// Shared handle; clones point at the same session.
pub type SessionHandle = Arc<SessionManager>;

#[derive(Debug, Default)]
struct Inner {
    signed_in: Option<SignedIn>,
    loading: bool,
}

/// Owns the one session of this process.
pub struct SessionManager {
    auth: Arc<dyn AuthService>,
    store: Arc<dyn SessionStore>,
    inner: Mutex<Inner>,
    events: broadcast::Sender<SessionEvent>,
    login_redirect: String,
    logout_redirect: String,
}

/// Clears `loading` when an auth call ends, including when its future is
/// dropped half way.
struct LoadingGuard<'a> {
    manager: &'a SessionManager,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.manager.lock().loading = false;
    }
}

impl SessionManager {
    /// Rebuilds the session from `store`.
    ///
    /// Ends `Authenticated` only when both slots are present and the stored
    /// identity parses. Anything else is cleared and the session starts
    /// anonymous; nothing here fails.
    pub fn restore(
        auth: Arc<dyn AuthService>,
        store: Arc<dyn SessionStore>,
        config: &SessionConfig,
    ) -> SessionHandle {
        let signed_in = load_persisted(store.as_ref());
        match &signed_in {
            Some(s) => info!("Restored session for {}", s.identity.email),
            None => debug!("No persisted session, starting anonymous"),
        }
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            auth,
            store,
            inner: Mutex::new(Inner {
                signed_in,
                loading: false,
            }),
            events,
            login_redirect: config.login_redirect.clone(),
            logout_redirect: config.logout_redirect.clone(),
        })
    }

    /// Receives [`SessionEvent`]s emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> Session {
        let inner = self.lock();
        Session {
            signed_in: inner.signed_in.clone(),
            loading: inner.loading,
        }
    }

    pub fn state(&self) -> SessionState {
        self.snapshot().state()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn identity(&self) -> Option<Identity> {
        self.lock().signed_in.as_ref().map(|s| s.identity.clone())
    }

    pub fn credential(&self) -> Option<Credential> {
        self.lock().signed_in.as_ref().map(|s| s.credential.clone())
    }

    /// Signs in with email and password.
    ///
    /// On failure the previous state is left untouched and the server's
    /// message, when it sent one, is returned as [`SessionError::AuthFailure`].
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, SessionError> {
        let _loading = self.begin()?;
        info!("Signing in {}", email);
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let result = self.auth.login(request).await;
        self.complete(result, "login")
    }

    /// Creates an account and signs in with it.
    pub async fn register(&self, profile: RegisterProfile) -> Result<Identity, SessionError> {
        let _loading = self.begin()?;
        info!("Registering {}", profile.email);
        let result = self.auth.register(profile).await;
        self.complete(result, "registration")
    }

    /// Clears the session from memory and storage. Safe to call repeatedly;
    /// every call announces [`SessionEvent::Ended`].
    pub fn logout(&self) {
        {
            let mut inner = self.lock();
            clear_slots(self.store.as_ref());
            if let Some(previous) = inner.signed_in.take() {
                info!("Signed out {}", previous.identity.email);
            }
        }
        self.announce(SessionEvent::Ended {
            redirect: self.logout_redirect.clone(),
        });
    }

    fn begin(&self) -> Result<LoadingGuard<'_>, SessionError> {
        let mut inner = self.lock();
        if inner.loading {
            warn!("Rejecting sign-in while another one is in flight");
            return Err(SessionError::Busy);
        }
        inner.loading = true;
        Ok(LoadingGuard { manager: self })
    }

    fn complete(
        &self,
        result: Result<AuthResponse, ApiError>,
        what: &str,
    ) -> Result<Identity, SessionError> {
        let response = match result {
            Ok(response) => response,
            Err(err) => {
                warn!("{} failed: {}", what, err);
                self.lock().loading = false;
                return Err(SessionError::from_api(err));
            }
        };
        if response.token.expose().is_empty() {
            self.lock().loading = false;
            return Err(SessionError::TransportFailure(format!(
                "{} response carried no token",
                what
            )));
        }

        let identity = response.user.clone();
        {
            let mut inner = self.lock();
            inner.loading = false;
            if let Err(err) = persist(self.store.as_ref(), &response.user, &response.token) {
                if reinstate(self.store.as_ref(), inner.signed_in.as_ref()) {
                    return Err(err.into());
                }
                warn!("Previous session could not be written back, ending it");
                inner.signed_in = None;
                drop(inner);
                self.announce(SessionEvent::Ended {
                    redirect: self.logout_redirect.clone(),
                });
                return Err(err.into());
            }
            inner.signed_in = Some(SignedIn {
                identity: response.user,
                credential: response.token,
            });
        }
        info!("{} succeeded for {}", what, identity.email);
        self.announce(SessionEvent::Authenticated {
            identity: identity.clone(),
            redirect: self.login_redirect.clone(),
        });
        Ok(identity)
    }

    fn announce(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CredentialProvider for SessionManager {
    fn bearer_token(&self) -> Option<String> {
        self.lock()
            .signed_in
            .as_ref()
            .map(|s| s.credential.expose().to_string())
    }

    fn invalidate(&self, rejected: &str) {
        let current = self
            .lock()
            .signed_in
            .as_ref()
            .is_some_and(|s| s.credential.expose() == rejected);
        if current {
            warn!("Credential rejected by server, ending session");
            self.logout();
        } else {
            debug!("Ignoring rejection of a credential that is no longer current");
        }
    }
}

/// Writes both slots, or neither.
///
/// On failure both slots are cleared; callers holding a previous session put
/// it back with [`reinstate`].
fn persist(store: &dyn SessionStore, identity: &Identity, token: &Credential) -> Result<(), StoreError> {
    let user = serde_json::to_string(identity).map_err(|e| StoreError::Corrupt {
        path: USER_KEY.to_string(),
        message: e.to_string(),
    })?;
    let written = store
        .set(TOKEN_KEY, token.expose())
        .and_then(|_| store.set(USER_KEY, &user));
    if let Err(err) = written {
        warn!("Persisting session failed, rolling back: {}", err);
        clear_slots(store);
        return Err(err);
    }
    Ok(())
}

/// Writes `previous` back after a failed [`persist`]. Returns whether storage
/// matches `previous` afterwards.
fn reinstate(store: &dyn SessionStore, previous: Option<&SignedIn>) -> bool {
    match previous {
        Some(previous) => persist(store, &previous.identity, &previous.credential).is_ok(),
        None => true,
    }
}

fn clear_slots(store: &dyn SessionStore) {
    for key in [TOKEN_KEY, USER_KEY] {
        if let Err(err) = store.remove(key) {
            warn!("Could not clear stored {}: {}", key, err);
        }
    }
}

fn load_persisted(store: &dyn SessionStore) -> Option<SignedIn> {
    let read = |key: &str| match store.get(key) {
        Ok(value) => value.filter(|v| !v.is_empty()),
        Err(err) => {
            warn!("Could not read stored {}: {}", key, err);
            None
        }
    };

    match (read(TOKEN_KEY), read(USER_KEY)) {
        (Some(token), Some(user)) => match serde_json::from_str::<Identity>(&user) {
            Ok(identity) => Some(SignedIn {
                identity,
                credential: Credential::new(token),
            }),
            Err(err) => {
                warn!("Stored identity is unreadable, starting anonymous: {}", err);
                clear_slots(store);
                None
            }
        },
        (None, None) => None,
        _ => {
            warn!("Discarding half-persisted session");
            clear_slots(store);
            None
        }
    }
}
