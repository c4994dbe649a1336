// --- File: crates/slotbook_booking/src/service.rs ---
//! Scheduling service endpoints used for booking.
//!
//! [`SchedulingService`] abstracts the remote provider and appointment
//! endpoints. [`HttpSchedulingService`] is the real implementation; the
//! `mock` module keeps appointments in memory and detects conflicts the way
//! the server does.

use serde::{Deserialize, Serialize};
use slotbook_common::{ApiClient, ApiError, BoxFuture};

use crate::logic::BookingRequest;

/// A bookable provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
}

/// Remote scheduling operations.
pub trait SchedulingService: Send + Sync {
    /// `GET /providers/:id`.
    fn get_provider(&self, provider_id: &str) -> BoxFuture<'_, Provider, ApiError>;

    /// `POST /appointment`. A slot taken by someone else answers 409.
    fn create_appointment(&self, request: BookingRequest) -> BoxFuture<'_, (), ApiError>;
}

/// [`SchedulingService`] over HTTP. Give it an [`ApiClient`] that carries the
/// session's credentials.
#[derive(Debug, Clone)]
pub struct HttpSchedulingService {
    api: ApiClient,
}

impl HttpSchedulingService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl SchedulingService for HttpSchedulingService {
    fn get_provider(&self, provider_id: &str) -> BoxFuture<'_, Provider, ApiError> {
        let path = format!("providers/{}", provider_id.trim());
        Box::pin(async move { self.api.get_json(&path).await })
    }

    fn create_appointment(&self, request: BookingRequest) -> BoxFuture<'_, (), ApiError> {
        Box::pin(async move { self.api.post_unit("appointment", &request).await })
    }
}

pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Mutex, PoisonError};

    /// In-memory provider directory and appointment book.
    #[derive(Default)]
    pub struct MockSchedulingService {
        providers: Mutex<HashMap<String, Provider>>,
        appointments: Mutex<Vec<BookingRequest>>,
        failure: Option<u16>,
    }

    impl MockSchedulingService {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every appointment submission answers with `status`.
        pub fn failing_with(status: u16) -> Self {
            Self {
                failure: Some(status),
                ..Self::default()
            }
        }

        pub fn add_provider(&self, id: &str, name: &str) {
            let mut providers = self.providers.lock().unwrap_or_else(PoisonError::into_inner);
            providers.insert(
                id.to_string(),
                Provider {
                    id: id.to_string(),
                    name: name.to_string(),
                },
            );
        }

        /// Appointments accepted so far, in submission order.
        pub fn appointments(&self) -> Vec<BookingRequest> {
            self.appointments
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    fn status(status: u16, message: &str) -> ApiError {
        ApiError::Status {
            status,
            message: Some(message.to_string()),
        }
    }

    impl SchedulingService for MockSchedulingService {
        fn get_provider(&self, provider_id: &str) -> BoxFuture<'_, Provider, ApiError> {
            let provider_id = provider_id.to_string();
            Box::pin(async move {
                let providers = self.providers.lock().unwrap_or_else(PoisonError::into_inner);
                providers
                    .get(&provider_id)
                    .cloned()
                    .ok_or_else(|| status(404, "Provider not found"))
            })
        }

        fn create_appointment(&self, request: BookingRequest) -> BoxFuture<'_, (), ApiError> {
            Box::pin(async move {
                if let Some(code) = self.failure {
                    return Err(ApiError::Status {
                        status: code,
                        message: None,
                    });
                }
                let known = self
                    .providers
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .contains_key(&request.provider_id);
                if !known {
                    return Err(status(404, "Provider not found"));
                }

                let mut appointments =
                    self.appointments.lock().unwrap_or_else(PoisonError::into_inner);
                let overlaps = appointments.iter().any(|existing| {
                    existing.provider_id == request.provider_id
                        && request.start < existing.end
                        && request.end > existing.start
                });
                if overlaps {
                    return Err(status(409, "Slot already booked"));
                }
                appointments.push(request);
                Ok(())
            })
        }
    }
}
