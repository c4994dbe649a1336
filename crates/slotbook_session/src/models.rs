// --- File: crates/slotbook_session/src/models.rs ---

use serde::{Deserialize, Serialize};
use std::fmt;

/// The authenticated user's profile as the scheduling service returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Opaque bearer token. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for the `Authorization` header and storage only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /auth/register`.
#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterProfile {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl fmt::Debug for RegisterProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterProfile")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("avatar", &self.avatar)
            .finish_non_exhaustive()
    }
}

/// Successful answer of both auth endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: Credential,
    pub user: Identity,
}

/// Coarse state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated,
}

/// Identity and credential, always held together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedIn {
    pub identity: Identity,
    pub credential: Credential,
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub signed_in: Option<SignedIn>,
    pub loading: bool,
}

impl Session {
    pub fn identity(&self) -> Option<&Identity> {
        self.signed_in.as_ref().map(|s| &s.identity)
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.signed_in.as_ref().map(|s| &s.credential)
    }

    /// `Authenticating` while an auth call is in flight, regardless of
    /// whether an older session is still present.
    pub fn state(&self) -> SessionState {
        if self.loading {
            SessionState::Authenticating
        } else if self.signed_in.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }
}

/// Signals for the host UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Login or registration succeeded; the host should navigate to `redirect`.
    Authenticated { identity: Identity, redirect: String },
    /// The session was cleared; the host should navigate to `redirect`.
    Ended { redirect: String },
}
