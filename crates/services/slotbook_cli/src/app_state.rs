// --- File: crates/services/slotbook_cli/src/app_state.rs ---
//! Wiring of the session manager and booking client.

use slotbook_booking::{BookingClient, HttpSchedulingService, SchedulingService};
use slotbook_common::{ApiClient, SlotbookError};
use slotbook_config::AppConfig;
use slotbook_session::{
    AuthService, FileStore, HttpAuthService, SessionHandle, SessionManager, SessionStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

const SESSION_FILE: &str = "session.json";

/// Everything a command needs.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub session: SessionHandle,
    pub booking: BookingClient,
}

impl AppState {
    /// Builds the HTTP-backed state.
    ///
    /// Auth calls go out anonymously. Booking calls carry the session's
    /// bearer token, and a 401 on them ends the session.
    pub fn new(config: Arc<AppConfig>) -> Result<Self, SlotbookError> {
        let anonymous = ApiClient::from_config(&config.api)?;
        let store_path = session_file(&config)?;
        info!("Using API at {}", anonymous.base_url());
        debug!("Session file: {}", store_path.display());

        let auth: Arc<dyn AuthService> = Arc::new(HttpAuthService::new(anonymous.clone()));
        let store: Arc<dyn SessionStore> = Arc::new(FileStore::new(store_path));
        let session = SessionManager::restore(auth, store, &config.session);

        let authorized = anonymous.with_credentials(session.clone());
        let scheduling: Arc<dyn SchedulingService> =
            Arc::new(HttpSchedulingService::new(authorized));

        Self::with_services(config, session, scheduling)
    }

    /// Builds the state around an existing session and scheduling backend.
    pub fn with_services(
        config: Arc<AppConfig>,
        session: SessionHandle,
        scheduling: Arc<dyn SchedulingService>,
    ) -> Result<Self, SlotbookError> {
        let booking = BookingClient::from_config(scheduling, &config.booking)?;
        Ok(Self {
            config,
            session,
            booking,
        })
    }
}

/// `session.storage_path`, or `<data dir>/slotbook/session.json`.
fn session_file(config: &AppConfig) -> Result<PathBuf, SlotbookError> {
    if let Some(path) = &config.session.storage_path {
        return Ok(path.clone());
    }
    dirs::data_dir()
        .map(|dir| dir.join("slotbook").join(SESSION_FILE))
        .ok_or_else(|| {
            slotbook_common::config_error(
                "No data directory found; set SLOTBOOK_SESSION__STORAGE_PATH",
            )
        })
}
