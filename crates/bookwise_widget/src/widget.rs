//! Composition root: one widget instance per embedded booking page.

use bookwise_common::error::{config_error, SlotbookError};
use bookwise_common::logging::log_result;
use bookwise_common::models::{CallType, PageRef};
use bookwise_common::services::BookingApi;
use bookwise_config::{AppConfig, WidgetConfig};
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::bounds::today_in;
use crate::cache::AvailabilityCache;
use crate::error::BookingError;
use crate::machine::{BookingStateMachine, MachineOptions};
use crate::projector::parse_time_zone;
use crate::service::HttpBookingApi;

/// What the widget shows as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum WidgetPhase {
    Loading,
    Ready,
    /// The page does not exist. Terminal.
    NotFound,
    /// The host disabled booking. Terminal.
    Unavailable,
    /// Loading failed; `mount` may be called again.
    Failed(String),
    Unmounted,
}

impl WidgetPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WidgetPhase::NotFound | WidgetPhase::Unavailable | WidgetPhase::Unmounted
        )
    }
}

pub struct SchedulingWidget<A: BookingApi + ?Sized> {
    api: Arc<A>,
    page: PageRef,
    visitor_time_zone: String,
    config: WidgetConfig,
    phase: WidgetPhase,
    call_type: Option<CallType>,
    machine: Option<BookingStateMachine<A>>,
}

impl SchedulingWidget<HttpBookingApi> {
    /// Builds an HTTP-backed widget from the loaded configuration.
    ///
    /// The visitor zone must be configured explicitly.
    pub fn from_config(config: &AppConfig, page: PageRef) -> Result<Self, SlotbookError> {
        let visitor_time_zone = config
            .widget
            .visitor_time_zone
            .clone()
            .ok_or_else(|| config_error("widget.visitor_time_zone is not set"))?;
        let api = HttpBookingApi::from_config(&config.api)?;
        Ok(Self::new(
            Arc::new(api),
            page,
            visitor_time_zone,
            config.widget.clone(),
        ))
    }
}

impl<A: BookingApi + ?Sized> SchedulingWidget<A> {
    pub fn new(
        api: Arc<A>,
        page: PageRef,
        visitor_time_zone: impl Into<String>,
        config: WidgetConfig,
    ) -> Self {
        Self {
            api,
            page,
            visitor_time_zone: visitor_time_zone.into(),
            config,
            phase: WidgetPhase::Loading,
            call_type: None,
            machine: None,
        }
    }

    pub fn phase(&self) -> &WidgetPhase {
        &self.phase
    }

    pub fn page(&self) -> &PageRef {
        &self.page
    }

    pub fn call_type(&self) -> Option<&CallType> {
        self.call_type.as_ref()
    }

    pub fn machine(&self) -> Option<&BookingStateMachine<A>> {
        self.machine.as_ref()
    }

    pub fn machine_mut(&mut self) -> Option<&mut BookingStateMachine<A>> {
        self.machine.as_mut()
    }

    /// Loads the call type and the first visible range, using today's date
    /// on the visitor's clock.
    pub async fn mount(&mut self) -> Result<&WidgetPhase, BookingError> {
        let visitor_tz = match parse_time_zone(&self.visitor_time_zone) {
            Ok(tz) => tz,
            Err(failure) => {
                error!("Cannot mount booking widget: {}", failure);
                self.phase = WidgetPhase::Failed(failure.to_string());
                return Ok(&self.phase);
            }
        };
        self.mount_on(today_in(visitor_tz)).await
    }

    /// [`Self::mount`] with an explicit visitor-local current date.
    pub async fn mount_on(&mut self, today: NaiveDate) -> Result<&WidgetPhase, BookingError> {
        if self.phase == WidgetPhase::Unmounted {
            return Err(BookingError::Unmounted);
        }
        if self.phase.is_terminal() || self.phase == WidgetPhase::Ready {
            return Ok(&self.phase);
        }
        if let Err(failure) = parse_time_zone(&self.visitor_time_zone) {
            self.phase = WidgetPhase::Failed(failure.to_string());
            return Ok(&self.phase);
        }

        self.phase = WidgetPhase::Loading;
        info!("Mounting booking widget for {}", self.page);

        let fetched = log_result(
            self.api.fetch_call_type(&self.page).await,
            "Call type loaded",
            "Call type could not be loaded",
        );
        let call_type = match fetched {
            Ok(call_type) => call_type,
            Err(err) => {
                self.phase = phase_for_error(&err);
                return Ok(&self.phase);
            }
        };

        let cache = Arc::new(AvailabilityCache::new(
            Arc::clone(&self.api),
            self.page.clone(),
        ));
        let mut machine = BookingStateMachine::new(
            Arc::clone(&self.api),
            cache,
            self.page.clone(),
            &call_type,
            self.visitor_time_zone.clone(),
            today,
            MachineOptions::from(&self.config),
        );

        let window = machine.window();
        if window.is_empty() {
            warn!(
                "Booking window for {} is empty ({}..={})",
                self.page, window.min_date, window.max_date
            );
        } else {
            let end = window
                .min_date
                .checked_add_days(Days::new(u64::from(self.config.initial_range_days)))
                .unwrap_or(window.max_date)
                .min(window.max_date);
            machine.on_visible_range_change(window.min_date, end).await?;
        }

        self.call_type = Some(call_type);
        self.machine = Some(machine);
        self.phase = WidgetPhase::Ready;
        Ok(&self.phase)
    }

    /// Tears the widget down; in-flight responses are discarded.
    pub fn unmount(&mut self) {
        if let Some(machine) = self.machine.as_mut() {
            machine.unmount();
        }
        self.phase = WidgetPhase::Unmounted;
    }
}

fn phase_for_error(err: &SlotbookError) -> WidgetPhase {
    if !err.is_terminal() {
        return WidgetPhase::Failed(err.to_string());
    }
    match err {
        SlotbookError::ResourceNotFound(_) => WidgetPhase::NotFound,
        _ => WidgetPhase::Unavailable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_for_error() {
        assert_eq!(
            phase_for_error(&SlotbookError::from_status(404, "gone")),
            WidgetPhase::NotFound
        );
        assert_eq!(
            phase_for_error(&SlotbookError::from_status(403, "paused")),
            WidgetPhase::Unavailable
        );
        for err in [
            SlotbookError::from_status(409, "taken"),
            SlotbookError::from_status(500, "boom"),
            config_error("missing base url"),
        ] {
            let phase = phase_for_error(&err);
            assert_eq!(phase, WidgetPhase::Failed(err.to_string()));
            assert!(!phase.is_terminal());
        }
    }
}
