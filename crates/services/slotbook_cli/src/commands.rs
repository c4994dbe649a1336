// --- File: crates/services/slotbook_cli/src/commands.rs ---
use chrono::{DateTime, NaiveDate, Utc};
use clap::Subcommand;
use slotbook_booking::logic::preview_label;
use slotbook_booking::BookingRejection;
use slotbook_common::{log_result, HttpStatusCode, SlotbookError};
use slotbook_session::{RegisterProfile, SessionError, SessionEvent, SessionState};
use std::io::Write;
use thiserror::Error;
use tracing::debug;

use crate::app_state::AppState;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "SLOTBOOK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "SLOTBOOK_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        avatar: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Show a provider
    Provider { id: String },
    /// Book a one-hour appointment with a provider
    Book {
        provider: String,
        /// YYYY-MM-DD
        #[arg(short, long)]
        date: String,
        /// HH:MM
        #[arg(short, long)]
        time: String,
    },
    /// Earliest date and time that can be picked
    MinTime {
        /// YYYY-MM-DD, defaults to today
        #[arg(short, long)]
        date: Option<String>,
    },
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Booking(#[from] BookingRejection),
    #[error("{0}")]
    Session(#[from] SessionError),
    #[error("{0}")]
    Service(#[from] SlotbookError),
    #[error("You must be logged in to book an appointment")]
    NotLoggedIn,
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Could not write output: {0}")]
    Output(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code: 2 for bad input, 3 for authentication problems,
    /// 1 for everything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Booking(BookingRejection::SlotConflict)
            | CliError::Booking(BookingRejection::SubmissionFailed(_)) => 1,
            CliError::Booking(_) | CliError::InvalidDate(_) => 2,
            CliError::NotLoggedIn | CliError::Session(SessionError::AuthFailure(_)) => 3,
            CliError::Service(err) => match err.status_code() {
                401 => 3,
                400 | 404 => 2,
                _ => 1,
            },
            CliError::Session(_) | CliError::Output(_) => 1,
        }
    }
}

/// Runs one command, writing user-facing output to `out`.
pub async fn run<W: Write>(
    command: Command,
    state: &AppState,
    now: DateTime<Utc>,
    out: &mut W,
) -> Result<(), CliError> {
    debug!("Running {}", command_name(&command));
    match command {
        Command::Login { email, password } => {
            let identity = state.session.login(&email, &password).await?;
            writeln!(out, "Signed in as {} <{}>", identity.name, identity.email)?;
        }
        Command::Register {
            name,
            email,
            password,
            avatar,
        } => {
            let profile = RegisterProfile {
                name,
                email,
                password,
                avatar,
            };
            let identity = state.session.register(profile).await?;
            writeln!(out, "Welcome, {}!", identity.name)?;
        }
        Command::Logout => {
            state.session.logout();
            writeln!(out, "Signed out")?;
        }
        Command::Whoami => match state.session.identity() {
            Some(identity) => {
                writeln!(out, "{} <{}>", identity.name, identity.email)?;
                if let Some(role) = identity.role {
                    writeln!(out, "role: {}", role)?;
                }
            }
            None => writeln!(out, "Not signed in")?,
        },
        Command::Provider { id } => {
            let provider = state.booking.provider(&id).await?;
            writeln!(out, "{} ({})", provider.name, provider.id)?;
        }
        Command::Book {
            provider,
            date,
            time,
        } => {
            if state.session.state() != SessionState::Authenticated {
                return Err(CliError::NotLoggedIn);
            }
            let request = log_result(
                state.booking.book(&provider, &date, &time, now).await,
                "Appointment submitted",
                "Booking not made",
            )?;
            let start = request.start.with_timezone(&state.booking.time_zone());
            writeln!(out, "Appointment booked for {}", preview_label(&start))?;
        }
        Command::MinTime { date } => {
            let today = state.booking.min_selectable_date(now);
            let date = match date {
                Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                    .map_err(|_| CliError::InvalidDate(raw))?,
                None => today,
            };
            writeln!(out, "earliest date: {}", today)?;
            match state.booking.min_selectable_time(date, now) {
                Some(time) => writeln!(out, "earliest time on {}: {}", date, time.format("%H:%M"))?,
                None => writeln!(out, "any time on {}", date)?,
            }
        }
    }
    Ok(())
}

/// Renders a session event for the terminal.
pub fn describe_event(event: &SessionEvent) -> String {
    match event {
        SessionEvent::Authenticated { identity, redirect } => {
            format!("session: signed in as {} -> {}", identity.email, redirect)
        }
        SessionEvent::Ended { redirect } => format!("session: ended -> {}", redirect),
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Login { .. } => "login",
        Command::Register { .. } => "register",
        Command::Logout => "logout",
        Command::Whoami => "whoami",
        Command::Provider { .. } => "provider",
        Command::Book { .. } => "book",
        Command::MinTime { .. } => "min-time",
    }
}
