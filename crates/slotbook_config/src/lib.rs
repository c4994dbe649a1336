use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub mod models;
pub use models::*;

/// Prefix for environment overrides, e.g. `SLOTBOOK_API__BASE_URL`.
pub const ENV_PREFIX: &str = "SLOTBOOK";

/// Upper bound for `booking.lead_time_minutes` and `booking.duration_minutes`
/// (one year).
pub const MAX_WINDOW_MINUTES: i64 = 366 * 24 * 60;

/// Legacy variable the web build used for the API location.
pub const LEGACY_API_URL_VAR: &str = "REACT_APP_API_URL";

#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("Unknown time zone: {0}")]
    InvalidTimeZone(String),
    #[error("Invalid booking window: {0}")]
    InvalidBookingWindow(String),
}

/// Loads configuration from `config/default`, `config/{RUN_ENV}` and
/// `SLOTBOOK_*` environment variables, in increasing priority.
///
/// The config directory defaults to `./config` and can be moved with
/// `SLOTBOOK_CONFIG_DIR`.
pub fn load_config() -> Result<AppConfig, ConfigLoadError> {
    ensure_dotenv_loaded();

    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| "debug".to_string());
    let config_dir = env::var("SLOTBOOK_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config"));

    load_config_from(&config_dir, &run_env)
}

/// Same as [`load_config`] with an explicit directory and run environment.
pub fn load_config_from(config_dir: &Path, run_env: &str) -> Result<AppConfig, ConfigLoadError> {
    let default_path = config_dir.join("default");
    let env_path = config_dir.join(run_env);
    debug!(
        "Loading config from {} and {}",
        default_path.display(),
        env_path.display()
    );

    let mut builder = Config::builder();
    if let Some(legacy_url) = env::var(LEGACY_API_URL_VAR).ok().filter(|s| !s.is_empty()) {
        builder = builder.set_default("api.base_url", legacy_url)?;
    }
    let builder = builder
        .add_source(File::from(default_path).required(false))
        .add_source(File::from(env_path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    build_config(builder)
}

/// Builds and validates an [`AppConfig`] from a prepared builder.
pub fn build_config(builder: ConfigBuilder<DefaultState>) -> Result<AppConfig, ConfigLoadError> {
    let config: AppConfig = builder.build()?.try_deserialize()?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &AppConfig) -> Result<(), ConfigLoadError> {
    config.booking.tz()?;
    config.booking.check_window()
}

static INIT_DOTENV: OnceCell<()> = OnceCell::new();

/// Loads the dotenv file into the process environment once.
///
/// The file is `DOTENV_OVERRIDE` when set, otherwise `.env`. A missing file
/// is not an error. Returns the path that was tried.
pub fn ensure_dotenv_loaded() -> String {
    let dotenv_path = std::env::var("DOTENV_OVERRIDE").unwrap_or_else(|_| ".env".to_string());

    INIT_DOTENV.get_or_init(|| {
        dotenv::from_filename(&dotenv_path).ok();
    });

    dotenv_path
}
