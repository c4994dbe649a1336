// --- File: crates/slotbook_session/src/lib.rs ---
pub mod manager;
#[cfg(test)]
mod manager_test;
pub mod models;
pub mod service;
pub mod storage;

pub use manager::{SessionError, SessionHandle, SessionManager};
pub use models::{
    Credential, Identity, RegisterProfile, Session, SessionEvent, SessionState, SignedIn,
};
pub use service::{AuthService, HttpAuthService};
pub use storage::{FileStore, MemoryStore, SessionStore, StoreError};
