// --- File: crates/slotbook_common/src/http/client.rs ---
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;

/// Request timeout used when the configuration does not set one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = concat!("slotbook/", env!("CARGO_PKG_VERSION"));

/// Builds the shared `reqwest` client.
///
/// A zero `timeout_secs` falls back to [`DEFAULT_TIMEOUT_SECS`]. Connecting
/// gets at most a third of the overall budget.
pub fn create_client(timeout_secs: u64, follow_redirects: bool) -> Result<Client, reqwest::Error> {
    let timeout = match timeout_secs {
        0 => DEFAULT_TIMEOUT_SECS,
        secs => secs,
    };
    let redirects = if follow_redirects {
        Policy::limited(5)
    } else {
        Policy::none()
    };

    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout))
        .connect_timeout(Duration::from_secs(timeout.div_ceil(3)))
        .redirect(redirects)
        .build()
}
