// --- File: crates/slotbook_booking/src/client.rs ---
//! Validation plus submission.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use slotbook_common::SlotbookError;
use slotbook_config::{BookingConfig, ConfigLoadError};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::logic::{
    min_selectable_date, min_selectable_time, validate_booking, BookingPolicy, BookingRejection,
    BookingRequest,
};
use crate::service::{Provider, SchedulingService};

/// Books appointments in one time zone under one [`BookingPolicy`].
#[derive(Clone)]
pub struct BookingClient {
    service: Arc<dyn SchedulingService>,
    policy: BookingPolicy,
    time_zone: Tz,
}

impl BookingClient {
    pub fn new(service: Arc<dyn SchedulingService>, policy: BookingPolicy, time_zone: Tz) -> Self {
        Self {
            service,
            policy,
            time_zone,
        }
    }

    /// Builds a client from the `[booking]` config section.
    pub fn from_config(
        service: Arc<dyn SchedulingService>,
        config: &BookingConfig,
    ) -> Result<Self, ConfigLoadError> {
        Ok(Self::new(
            service,
            BookingPolicy::from_config(config)?,
            config.tz()?,
        ))
    }

    pub fn policy(&self) -> &BookingPolicy {
        &self.policy
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    /// Runs the booking window checks without contacting the server.
    pub fn validate(
        &self,
        provider_id: &str,
        date: &str,
        time: &str,
        now: DateTime<Utc>,
    ) -> Result<BookingRequest, BookingRejection> {
        validate_booking(
            provider_id,
            date,
            time,
            &now.with_timezone(&self.time_zone),
            &self.policy,
        )
    }

    /// Today in the booking time zone.
    pub fn min_selectable_date(&self, now: DateTime<Utc>) -> NaiveDate {
        min_selectable_date(&now.with_timezone(&self.time_zone))
    }

    /// Lower bound for the time picker on `date`.
    pub fn min_selectable_time(&self, date: NaiveDate, now: DateTime<Utc>) -> Option<NaiveTime> {
        min_selectable_time(date, &now.with_timezone(&self.time_zone))
    }

    pub async fn provider(&self, provider_id: &str) -> Result<Provider, SlotbookError> {
        self.service.get_provider(provider_id).await.map_err(|err| {
            warn!("Failed to fetch provider {}: {}", provider_id, err);
            SlotbookError::from(err)
        })
    }

    /// Validates and submits a booking.
    ///
    /// A 409 from the server becomes [`BookingRejection::SlotConflict`] and is
    /// not retried.
    pub async fn book(
        &self,
        provider_id: &str,
        date: &str,
        time: &str,
        now: DateTime<Utc>,
    ) -> Result<BookingRequest, BookingRejection> {
        let request = self.validate(provider_id, date, time, now)?;
        info!(
            "Booking {} from {} to {}",
            request.provider_id, request.start, request.end
        );

        match self.service.create_appointment(request.clone()).await {
            Ok(()) => Ok(request),
            Err(err) if err.status() == Some(409) => {
                warn!("Slot {} for {} already taken", request.start, request.provider_id);
                Err(BookingRejection::SlotConflict)
            }
            Err(err) => {
                error!("Booking submission failed: {}", err);
                let detail = match err.server_message() {
                    Some(message) => format!("{}: {}", err, message),
                    None => err.to_string(),
                };
                Err(BookingRejection::SubmissionFailed(detail))
            }
        }
    }
}
