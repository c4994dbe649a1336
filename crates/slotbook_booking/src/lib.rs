// --- File: crates/slotbook_booking/src/lib.rs ---
pub mod client;
pub mod logic;
#[cfg(test)]
mod logic_proptest;
pub mod service;

pub use client::BookingClient;
pub use logic::{validate_booking, BookingPolicy, BookingRejection, BookingRequest};
pub use service::{HttpSchedulingService, Provider, SchedulingService};
