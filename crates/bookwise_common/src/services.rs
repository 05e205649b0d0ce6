//! Service abstractions for the booking-page API.
//!
//! The widget core only ever talks to the network through [`BookingApi`],
//! which keeps the state machine and the availability cache testable
//! against an in-memory implementation.

use chrono::NaiveDate;
use std::future::Future;
use std::pin::Pin;

use crate::error::SlotbookError;
use crate::models::{BookingRequest, BookingResult, CallType, PageRef, SlotsResponse};

/// Type alias for a boxed future that returns a Result
pub type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Operations the public booking page exposes.
///
/// Implementations must map every failure into [`SlotbookError`]; callers
/// rely on the variant to choose between retry, conflict recovery and a
/// terminal state.
pub trait BookingApi: Send + Sync {
    /// `GET /book/{username}/{shortcode}`
    fn fetch_call_type(&self, page: &PageRef) -> BoxFuture<'_, CallType, SlotbookError>;

    /// `GET /book/{username}/{shortcode}/slots?start_date=..&end_date=..`
    ///
    /// Both bounds are inclusive host-local dates.
    fn fetch_slots(
        &self,
        page: &PageRef,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> BoxFuture<'_, SlotsResponse, SlotbookError>;

    /// `POST /book/{username}/{shortcode}`
    fn create_booking(
        &self,
        page: &PageRef,
        request: BookingRequest,
    ) -> BoxFuture<'_, BookingResult, SlotbookError>;
}
