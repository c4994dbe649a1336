#[cfg(test)]
mod tests {
    use crate::manager::{SessionError, SessionHandle, SessionManager};
    use crate::models::{Identity, RegisterProfile, SessionEvent, SessionState};
    use crate::service::mock::MockAuthService;
    use crate::storage::{MemoryStore, SessionStore, StoreError, TOKEN_KEY, USER_KEY};
    use slotbook_common::CredentialProvider;
    use slotbook_config::SessionConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn ada() -> Identity {
        Identity {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            role: Some("user".to_string()),
            avatar: None,
        }
    }

    fn directory() -> Arc<MockAuthService> {
        let auth = MockAuthService::new();
        auth.add_user(ada(), "correct-horse");
        Arc::new(auth)
    }

    fn manager_with(auth: Arc<MockAuthService>, store: Arc<dyn SessionStore>) -> SessionHandle {
        SessionManager::restore(auth, store, &SessionConfig::default())
    }

    /// Asserts the pair invariant on both memory and storage.
    fn assert_consistent(manager: &SessionManager, store: &dyn SessionStore) {
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.identity().is_some(), snapshot.credential().is_some());
        let token = store.get(TOKEN_KEY).unwrap();
        let user = store.get(USER_KEY).unwrap();
        assert_eq!(token.is_some(), user.is_some());
        assert_eq!(token.is_some(), snapshot.credential().is_some());
    }

    /// Store whose next `failures` writes to one key fail.
    struct FailingStore {
        inner: MemoryStore,
        broken_key: &'static str,
        failures: AtomicUsize,
    }

    impl FailingStore {
        fn new(broken_key: &'static str, failures: usize) -> Self {
            Self {
                inner: MemoryStore::new(),
                broken_key,
                failures: AtomicUsize::new(failures),
            }
        }

        fn fail_next(&self, failures: usize) {
            self.failures.store(failures, Ordering::SeqCst);
        }
    }

    impl SessionStore for FailingStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            let failing = key == self.broken_key
                && self
                    .failures
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok();
            if failing {
                return Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only",
                )));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }
    }

    #[tokio::test]
    async fn starts_anonymous_with_empty_storage() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(directory(), store.clone());
        assert_eq!(manager.state(), SessionState::Anonymous);
        assert!(manager.identity().is_none());
        assert!(manager.bearer_token().is_none());
        assert!(!manager.is_loading());
        assert_consistent(&manager, store.as_ref());
    }

    #[tokio::test]
    async fn login_success_persists_and_announces() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(directory(), store.clone());
        let mut events = manager.subscribe();

        let identity = manager.login("ada@example.com", "correct-horse").await.unwrap();

        assert_eq!(identity, ada());
        assert_eq!(manager.state(), SessionState::Authenticated);
        let token = manager.credential().unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some(token.expose()));
        let stored: Identity = serde_json::from_str(&store.get(USER_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored, ada());
        assert_eq!(manager.bearer_token().as_deref(), Some(token.expose()));
        assert_consistent(&manager, store.as_ref());

        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::Authenticated {
                identity: ada(),
                redirect: "/categories".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn wrong_password_surfaces_server_message_and_stays_anonymous() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(directory(), store.clone());
        let mut events = manager.subscribe();

        let err = manager.login("ada@example.com", "wrong").await.unwrap_err();

        assert!(matches!(&err, SessionError::AuthFailure(m) if m == "Invalid credentials"));
        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(manager.state(), SessionState::Anonymous);
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(store.get(USER_KEY).unwrap(), None);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn network_failure_is_a_transport_failure() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(Arc::new(MockAuthService::offline()), store.clone());

        let err = manager.login("ada@example.com", "correct-horse").await.unwrap_err();

        assert!(matches!(&err, SessionError::TransportFailure(m) if m == "Network Error"));
        assert_eq!(manager.state(), SessionState::Anonymous);
        assert!(!manager.is_loading());
    }

    #[tokio::test]
    async fn register_signs_in_and_rejects_duplicates() {
        let store = Arc::new(MemoryStore::new());
        let auth = directory();
        let manager = manager_with(auth.clone(), store.clone());
        let mut events = manager.subscribe();

        let profile = RegisterProfile {
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
            password: "cobol".to_string(),
            avatar: Some("https://img/grace.png".to_string()),
        };
        let identity = manager.register(profile.clone()).await.unwrap();
        assert_eq!(identity.email, "grace@example.com");
        assert_eq!(identity.avatar.as_deref(), Some("https://img/grace.png"));
        assert_eq!(manager.state(), SessionState::Authenticated);
        assert!(matches!(
            events.try_recv().unwrap(),
            SessionEvent::Authenticated { redirect, .. } if redirect == "/categories"
        ));

        manager.logout();
        let err = manager.register(profile).await.unwrap_err();
        assert!(matches!(err, SessionError::AuthFailure(m) if m == "User already exists"));
        assert_eq!(manager.state(), SessionState::Anonymous);
        assert_consistent(&manager, store.as_ref());
        assert_eq!(auth.issued(), 1);
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(directory(), store.clone());
        manager.login("ada@example.com", "correct-horse").await.unwrap();
        let mut events = manager.subscribe();

        manager.logout();
        assert_eq!(manager.state(), SessionState::Anonymous);
        assert_consistent(&manager, store.as_ref());
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);

        manager.logout();
        assert_eq!(manager.state(), SessionState::Anonymous);
        assert_eq!(store.get(USER_KEY).unwrap(), None);

        for _ in 0..2 {
            assert_eq!(
                events.try_recv().unwrap(),
                SessionEvent::Ended {
                    redirect: "/login".to_string()
                }
            );
        }
    }

    #[tokio::test]
    async fn restores_persisted_session() {
        let store = Arc::new(MemoryStore::new());
        {
            let first = manager_with(directory(), store.clone());
            first.login("ada@example.com", "correct-horse").await.unwrap();
        }

        let reloaded = manager_with(directory(), store.clone());
        assert_eq!(reloaded.state(), SessionState::Authenticated);
        assert_eq!(reloaded.identity(), Some(ada()));
        assert_eq!(
            reloaded.bearer_token(),
            store.get(TOKEN_KEY).unwrap()
        );
    }

    #[tokio::test]
    async fn corrupt_stored_identity_degrades_to_anonymous() {
        let store = Arc::new(MemoryStore::new());
        store.set(TOKEN_KEY, "tok").unwrap();
        store.set(USER_KEY, "{\"_id\": 42").unwrap();

        let manager = manager_with(directory(), store.clone());

        assert_eq!(manager.state(), SessionState::Anonymous);
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(store.get(USER_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn half_persisted_session_is_discarded() {
        let store = Arc::new(MemoryStore::new());
        store.set(TOKEN_KEY, "orphan").unwrap();

        let manager = manager_with(directory(), store.clone());

        assert_eq!(manager.state(), SessionState::Anonymous);
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        assert_consistent(&manager, store.as_ref());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_login_is_rejected_not_queued() {
        let store = Arc::new(MemoryStore::new());
        let auth = MockAuthService::new().with_latency(Duration::from_secs(2));
        auth.add_user(ada(), "correct-horse");
        let manager = manager_with(Arc::new(auth), store.clone());

        let first = tokio::spawn({
            let manager = manager.clone();
            async move { manager.login("ada@example.com", "correct-horse").await }
        });
        tokio::task::yield_now().await;

        assert!(manager.is_loading());
        assert_eq!(manager.state(), SessionState::Authenticating);
        let second = manager.login("ada@example.com", "correct-horse").await;
        assert!(matches!(second, Err(SessionError::Busy)));

        first.await.unwrap().unwrap();
        assert!(!manager.is_loading());
        assert_eq!(manager.state(), SessionState::Authenticated);
        assert_consistent(&manager, store.as_ref());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_login_does_not_leave_loading_set() {
        let store = Arc::new(MemoryStore::new());
        let auth = MockAuthService::new().with_latency(Duration::from_secs(5));
        auth.add_user(ada(), "correct-horse");
        let manager = manager_with(Arc::new(auth), store.clone());

        let timed_out = tokio::time::timeout(
            Duration::from_millis(10),
            manager.login("ada@example.com", "correct-horse"),
        )
        .await;

        assert!(timed_out.is_err());
        assert!(!manager.is_loading());
        assert_eq!(manager.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn storage_failure_keeps_nothing() {
        let store = Arc::new(FailingStore::new(USER_KEY, usize::MAX));
        let manager = manager_with(directory(), store.clone());

        let err = manager.login("ada@example.com", "correct-horse").await.unwrap_err();

        assert!(matches!(err, SessionError::Storage(_)));
        assert_eq!(manager.state(), SessionState::Anonymous);
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        assert_consistent(&manager, store.as_ref());
    }

    fn grace() -> Identity {
        Identity {
            id: "u2".to_string(),
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
            role: None,
            avatar: None,
        }
    }

    #[tokio::test]
    async fn storage_failure_on_relogin_restores_previous_session() {
        let auth = directory();
        auth.add_user(grace(), "cobol");
        let store = Arc::new(FailingStore::new(USER_KEY, 0));
        let manager = manager_with(auth.clone(), store.clone());
        manager.login("ada@example.com", "correct-horse").await.unwrap();
        let ada_token = manager.bearer_token();

        store.fail_next(1);
        let err = manager.login("grace@example.com", "cobol").await.unwrap_err();

        assert!(matches!(err, SessionError::Storage(_)));
        assert_eq!(manager.identity(), Some(ada()));
        assert_eq!(manager.bearer_token(), ada_token);
        assert_eq!(store.get(TOKEN_KEY).unwrap(), ada_token);
        assert_consistent(&manager, store.as_ref());

        let restarted = manager_with(auth, store.clone());
        assert_eq!(restarted.state(), SessionState::Authenticated);
        assert_eq!(restarted.identity(), Some(ada()));
    }

    #[tokio::test]
    async fn storage_failure_on_relogin_without_recovery_ends_session() {
        let auth = directory();
        auth.add_user(grace(), "cobol");
        let store = Arc::new(FailingStore::new(USER_KEY, 0));
        let manager = manager_with(auth.clone(), store.clone());
        manager.login("ada@example.com", "correct-horse").await.unwrap();
        let mut events = manager.subscribe();

        store.fail_next(usize::MAX);
        let err = manager.login("grace@example.com", "cobol").await.unwrap_err();

        assert!(matches!(err, SessionError::Storage(_)));
        assert!(matches!(events.try_recv().unwrap(), SessionEvent::Ended { .. }));
        assert_eq!(manager.state(), SessionState::Anonymous);
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        assert_consistent(&manager, store.as_ref());

        let restarted = manager_with(auth, store.clone());
        assert_eq!(restarted.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn failed_relogin_keeps_existing_session() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(directory(), store.clone());
        manager.login("ada@example.com", "correct-horse").await.unwrap();
        let token = manager.bearer_token();

        assert!(manager.login("ada@example.com", "nope").await.is_err());

        assert_eq!(manager.state(), SessionState::Authenticated);
        assert_eq!(manager.bearer_token(), token);
        assert_consistent(&manager, store.as_ref());
    }

    #[tokio::test]
    async fn invalidated_credential_ends_session() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(directory(), store.clone());
        manager.login("ada@example.com", "correct-horse").await.unwrap();
        let token = manager.bearer_token().unwrap();
        let mut events = manager.subscribe();

        manager.invalidate(&token);

        assert_eq!(manager.state(), SessionState::Anonymous);
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        assert!(matches!(events.try_recv().unwrap(), SessionEvent::Ended { .. }));

        // Nothing to end the second time.
        manager.invalidate(&token);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn rejection_of_replaced_credential_keeps_new_session() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(directory(), store.clone());
        manager.login("ada@example.com", "correct-horse").await.unwrap();
        let old_token = manager.bearer_token().unwrap();

        manager.logout();
        manager.login("ada@example.com", "correct-horse").await.unwrap();
        let new_token = manager.bearer_token().unwrap();
        assert_ne!(old_token, new_token);
        let mut events = manager.subscribe();

        manager.invalidate(&old_token);

        assert_eq!(manager.state(), SessionState::Authenticated);
        assert_eq!(manager.bearer_token(), Some(new_token.clone()));
        assert_eq!(store.get(TOKEN_KEY).unwrap(), Some(new_token));
        assert!(events.try_recv().is_err());
        assert_consistent(&manager, store.as_ref());
    }
}
