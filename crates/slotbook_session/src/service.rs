//! Remote authentication endpoints.
//!
//! [`AuthService`] is the seam between the session manager and the
//! scheduling service. [`HttpAuthService`] talks to the real endpoints; the
//! `mock` module provides an in-memory user directory for tests and demos.

use slotbook_common::{ApiClient, ApiError, BoxFuture};

use crate::models::{AuthResponse, LoginRequest, RegisterProfile};

/// Remote authentication operations.
pub trait AuthService: Send + Sync {
    /// `POST /auth/login`.
    fn login(&self, request: LoginRequest) -> BoxFuture<'_, AuthResponse, ApiError>;

    /// `POST /auth/register`.
    fn register(&self, profile: RegisterProfile) -> BoxFuture<'_, AuthResponse, ApiError>;
}

/// [`AuthService`] over HTTP.
///
/// The client should be anonymous: these calls establish the credential
/// rather than use one.
#[derive(Debug, Clone)]
pub struct HttpAuthService {
    api: ApiClient,
}

impl HttpAuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl AuthService for HttpAuthService {
    fn login(&self, request: LoginRequest) -> BoxFuture<'_, AuthResponse, ApiError> {
        Box::pin(async move { self.api.post_json("auth/login", &request).await })
    }

    fn register(&self, profile: RegisterProfile) -> BoxFuture<'_, AuthResponse, ApiError> {
        Box::pin(async move { self.api.post_json("auth/register", &profile).await })
    }
}

pub mod mock {
    use super::*;
    use crate::models::{Credential, Identity};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, PoisonError};
    use std::time::Duration;

    struct Account {
        password: String,
        identity: Identity,
    }

    /// In-memory user directory that answers like the real service.
    ///
    /// Wrong credentials yield a 401 with `"Invalid credentials"`, duplicate
    /// registrations a 400 with `"User already exists"`.
    #[derive(Default)]
    pub struct MockAuthService {
        accounts: Mutex<HashMap<String, Account>>,
        issued: AtomicUsize,
        latency: Option<Duration>,
        offline: bool,
    }

    impl MockAuthService {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every call sleeps for `latency` before answering.
        pub fn with_latency(mut self, latency: Duration) -> Self {
            self.latency = Some(latency);
            self
        }

        /// Every call fails as if the network were down.
        pub fn offline() -> Self {
            Self {
                offline: true,
                ..Self::default()
            }
        }

        pub fn add_user(&self, identity: Identity, password: &str) {
            let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
            accounts.insert(
                identity.email.clone(),
                Account {
                    password: password.to_string(),
                    identity,
                },
            );
        }

        /// Number of tokens handed out so far.
        pub fn issued(&self) -> usize {
            self.issued.load(Ordering::SeqCst)
        }

        fn issue(&self, identity: Identity) -> AuthResponse {
            let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            AuthResponse {
                token: Credential::new(format!("mock-token-{}-{}", identity.id, n)),
                user: identity,
            }
        }

        async fn pause(&self) -> Result<(), ApiError> {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            if self.offline {
                return Err(ApiError::Transport("Network Error".to_string()));
            }
            Ok(())
        }
    }

    impl AuthService for MockAuthService {
        fn login(&self, request: LoginRequest) -> BoxFuture<'_, AuthResponse, ApiError> {
            Box::pin(async move {
                self.pause().await?;
                let identity = {
                    let accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
                    match accounts.get(&request.email) {
                        Some(account) if account.password == request.password => {
                            account.identity.clone()
                        }
                        _ => {
                            return Err(ApiError::Status {
                                status: 401,
                                message: Some("Invalid credentials".to_string()),
                            })
                        }
                    }
                };
                Ok(self.issue(identity))
            })
        }

        fn register(&self, profile: RegisterProfile) -> BoxFuture<'_, AuthResponse, ApiError> {
            Box::pin(async move {
                self.pause().await?;
                let identity = {
                    let mut accounts =
                        self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
                    if accounts.contains_key(&profile.email) {
                        return Err(ApiError::Status {
                            status: 400,
                            message: Some("User already exists".to_string()),
                        });
                    }
                    let identity = Identity {
                        id: format!("user-{}", accounts.len() + 1),
                        name: profile.name,
                        email: profile.email.clone(),
                        role: Some("user".to_string()),
                        avatar: profile.avatar,
                    };
                    accounts.insert(
                        profile.email,
                        Account {
                            password: profile.password,
                            identity: identity.clone(),
                        },
                    );
                    identity
                };
                Ok(self.issue(identity))
            })
        }
    }
}
