// --- File: crates/slotbook_booking/src/logic.rs ---
use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc,
};
use serde::{Deserialize, Serialize};
use slotbook_config::{BookingConfig, ConfigLoadError};
use thiserror::Error;
use tracing::debug;

// --- Error Handling ---

/// Why a booking was not made. `Display` is the message shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingRejection {
    #[error("Please select date and time")]
    MissingInput,
    #[error("Invalid date or time: {0}")]
    InvalidInput(String),
    #[error("You cannot book an appointment in the past")]
    PastTime,
    #[error("You must book the appointment at least {lead_minutes} minutes before the selected time")]
    TooLateToBook { lead_minutes: i64 },
    /// The server already holds an overlapping booking (HTTP 409).
    #[error("Selected time is already booked. Choose another time.")]
    SlotConflict,
    /// Any other failure while submitting; the detail is for logs.
    #[error("Failed to book appointment. Try again.")]
    SubmissionFailed(String),
}

impl From<BookingRejection> for slotbook_common::SlotbookError {
    fn from(rejection: BookingRejection) -> Self {
        match rejection {
            BookingRejection::SlotConflict => {
                slotbook_common::conflict(BookingRejection::SlotConflict)
            }
            BookingRejection::SubmissionFailed(detail) => {
                slotbook_common::external_service_error("scheduling API", detail)
            }
            other => slotbook_common::validation_error(other),
        }
    }
}

// --- Data Structures ---

/// Timing rules applied to every booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingPolicy {
    /// Bookings close this long before the appointment starts.
    pub lead_time: Duration,
    /// Length of every appointment.
    pub duration: Duration,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            lead_time: Duration::minutes(30),
            duration: Duration::minutes(60),
        }
    }
}

impl BookingPolicy {
    /// Rejects windows outside [`BookingConfig::check_window`].
    pub fn from_config(config: &BookingConfig) -> Result<Self, ConfigLoadError> {
        config.check_window()?;
        let minutes = |value: i64| {
            Duration::try_minutes(value).ok_or_else(|| {
                ConfigLoadError::InvalidBookingWindow(format!("{} minutes is out of range", value))
            })
        };
        Ok(Self {
            lead_time: minutes(config.lead_time_minutes)?,
            duration: minutes(config.duration_minutes)?,
        })
    }
}

/// Body of `POST /appointment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub provider_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

// --- Validation Logic ---

/// Checks a requested date and time against `now` and builds the request.
///
/// `date` is `YYYY-MM-DD` and `time` is `HH:MM` (or `HH:MM:SS`, seconds are
/// dropped), both read as wall-clock time in `now`'s time zone. Checks run in
/// order and the first failure is returned:
///
/// 1. both inputs present, else [`BookingRejection::MissingInput`]
/// 2. inputs parse to an existing local time, else [`BookingRejection::InvalidInput`]
/// 3. start strictly after `now`, else [`BookingRejection::PastTime`]
/// 4. `now <= start - lead_time`, else [`BookingRejection::TooLateToBook`]
///
/// `now` exactly at the cutoff is accepted.
pub fn validate_booking<Tz: TimeZone>(
    provider_id: &str,
    date: &str,
    time: &str,
    now: &DateTime<Tz>,
    policy: &BookingPolicy,
) -> Result<BookingRequest, BookingRejection> {
    let (date, time) = (date.trim(), time.trim());
    if date.is_empty() || time.is_empty() {
        return Err(BookingRejection::MissingInput);
    }

    let local = compose_local(date, time)?;
    let start = resolve_local(&now.timezone(), local)?;
    let now = now.with_timezone(&Utc);

    if start <= now {
        debug!("Rejecting {} for {}: not after now ({})", start, provider_id, now);
        return Err(BookingRejection::PastTime);
    }

    let cutoff = start
        .checked_sub_signed(policy.lead_time)
        .ok_or_else(|| out_of_range(start))?;
    if now > cutoff {
        debug!("Rejecting {} for {}: cutoff {} passed", start, provider_id, cutoff);
        return Err(BookingRejection::TooLateToBook {
            lead_minutes: policy.lead_time.num_minutes(),
        });
    }

    let end = start
        .checked_add_signed(policy.duration)
        .ok_or_else(|| out_of_range(start))?;

    Ok(BookingRequest {
        provider_id: provider_id.to_string(),
        start,
        end,
    })
}

fn out_of_range(start: DateTime<Utc>) -> BookingRejection {
    BookingRejection::InvalidInput(format!("{} is outside the bookable range", start))
}

/// Parses the date and time fields into a naive wall-clock value with zero
/// seconds.
pub fn compose_local(date: &str, time: &str) -> Result<NaiveDateTime, BookingRejection> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| BookingRejection::InvalidInput(format!("date '{}': {}", date, e)))?;
    let clock = NaiveTime::parse_from_str(time, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M:%S"))
        .map_err(|e| BookingRejection::InvalidInput(format!("time '{}': {}", time, e)))?;
    let clock = NaiveTime::from_hms_opt(clock.hour(), clock.minute(), 0)
        .ok_or_else(|| BookingRejection::InvalidInput(format!("time '{}'", time)))?;
    Ok(day.and_time(clock))
}

/// Places a wall-clock value in `tz`. A time skipped by a DST change does not
/// exist and is rejected; a repeated one takes the earlier instant.
fn resolve_local<Tz: TimeZone>(
    tz: &Tz,
    local: NaiveDateTime,
) -> Result<DateTime<Utc>, BookingRejection> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(BookingRejection::InvalidInput(format!(
            "{} does not exist in the local time zone",
            local.format("%Y-%m-%d %H:%M")
        ))),
    }
}

// --- Input Shaping ---

/// Earliest selectable date: today in `now`'s zone.
pub fn min_selectable_date<Tz: TimeZone>(now: &DateTime<Tz>) -> NaiveDate {
    now.date_naive()
}

/// Earliest selectable clock time on `date`: the current minute when `date`
/// is today, otherwise no bound.
pub fn min_selectable_time<Tz: TimeZone>(date: NaiveDate, now: &DateTime<Tz>) -> Option<NaiveTime> {
    if date != now.date_naive() {
        return None;
    }
    let clock = now.time();
    NaiveTime::from_hms_opt(clock.hour(), clock.minute(), 0)
}

/// "May 5, 2025, 10:00 AM" style label for a start time.
pub fn preview_label<Tz: TimeZone>(start: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    start.format("%b %-d, %Y, %-I:%M %p").to_string()
}
