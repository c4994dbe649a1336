// --- File: crates/slotbook_config/src/models.rs ---

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

// --- Remote API Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String, // SLOTBOOK_API__BASE_URL, falls back to REACT_APP_API_URL
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// --- Session Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    /// File holding the persisted `token` and `user` slots. The CLI picks a
    /// location under the user data directory when unset.
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
    #[serde(default = "default_login_redirect")]
    pub login_redirect: String,
    #[serde(default = "default_logout_redirect")]
    pub logout_redirect: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_path: None,
            login_redirect: default_login_redirect(),
            logout_redirect: default_logout_redirect(),
        }
    }
}

// --- Booking Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BookingConfig {
    /// IANA zone used to compose the wall-clock date and time a user picks.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    /// How long before the appointment a booking must be submitted.
    #[serde(default = "default_lead_time_minutes")]
    pub lead_time_minutes: i64,
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: i64,
}

impl BookingConfig {
    /// Checks that the lead time and duration are usable: duration positive,
    /// lead time not negative, neither longer than
    /// [`MAX_WINDOW_MINUTES`](crate::MAX_WINDOW_MINUTES).
    pub fn check_window(&self) -> Result<(), crate::ConfigLoadError> {
        let max = crate::MAX_WINDOW_MINUTES;
        if self.duration_minutes <= 0 || self.duration_minutes > max {
            return Err(crate::ConfigLoadError::InvalidBookingWindow(format!(
                "duration_minutes must be between 1 and {}, got {}",
                max, self.duration_minutes
            )));
        }
        if !(0..=max).contains(&self.lead_time_minutes) {
            return Err(crate::ConfigLoadError::InvalidBookingWindow(format!(
                "lead_time_minutes must be between 0 and {}, got {}",
                max, self.lead_time_minutes
            )));
        }
        Ok(())
    }

    /// Parses `time_zone` into a chrono-tz zone.
    pub fn tz(&self) -> Result<Tz, crate::ConfigLoadError> {
        self.time_zone
            .parse::<Tz>()
            .map_err(|_| crate::ConfigLoadError::InvalidTimeZone(self.time_zone.clone()))
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            time_zone: default_time_zone(),
            lead_time_minutes: default_lead_time_minutes(),
            duration_minutes: default_duration_minutes(),
        }
    }
}

// --- Unified App Configuration ---
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub booking: BookingConfig,
}

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_login_redirect() -> String {
    "/categories".to_string()
}

fn default_logout_redirect() -> String {
    "/login".to_string()
}

fn default_time_zone() -> String {
    "Europe/Zurich".to_string()
}

fn default_lead_time_minutes() -> i64 {
    30
}

fn default_duration_minutes() -> i64 {
    60
}
