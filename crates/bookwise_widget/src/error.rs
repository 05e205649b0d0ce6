//! Error types for the widget core.

use chrono::NaiveDate;
use thiserror::Error;

use crate::machine::BookingStep;

/// Why a single host slot could not be projected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectionFailure {
    #[error("malformed wall-clock time '{0}'")]
    MalformedTime(String),
    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),
    #[error("local time cannot be placed on the timeline")]
    Unrepresentable,
}

/// Non-fatal report for a slot dropped from a projection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("slot {host_date} {host_time} dropped: {failure}")]
pub struct ProjectionWarning {
    pub host_date: NaiveDate,
    pub host_time: String,
    pub failure: ProjectionFailure,
}

/// Operations the booking state machine refuses.
///
/// Every rejection happens before any request leaves the widget.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    #[error("cannot {action} while {step:?}")]
    InvalidTransition {
        step: BookingStep,
        action: &'static str,
    },
    #[error("{date} is outside the bookable range {min_date}..={max_date}")]
    DateOutOfRange {
        date: NaiveDate,
        min_date: NaiveDate,
        max_date: NaiveDate,
    },
    #[error("no available times on {0}")]
    NoSlotsOnDate(NaiveDate),
    #[error("the chosen time is not among the offered slots")]
    UnknownSlot,
    #[error("invalid contact details: {0}")]
    InvalidContact(String),
    #[error("a booking request is already in flight")]
    SubmissionInFlight,
    #[error("the widget has been unmounted")]
    Unmounted,
}
