// Declare modules within this crate
pub mod bounds;
pub mod cache;
pub mod error;
pub mod machine;
pub mod models;
pub mod projector;
#[cfg(test)]
mod projector_proptest;
pub mod service;
pub mod widget;

// Re-export the types a host application needs to embed the widget
pub use cache::{AvailabilityCache, DateRange, FetchOutcome};
pub use error::{BookingError, ProjectionFailure, ProjectionWarning};
pub use machine::{BookingStateMachine, BookingStep, MachineOptions, Notice, SubmitOutcome};
pub use models::{BookingDraft, BookingWindow, ContactFields, HostSlotMap, ProjectedSlot, VisitorSlotMap};
pub use service::HttpBookingApi;
pub use widget::{SchedulingWidget, WidgetPhase};
