//! The booking flow: date -> time -> contact form -> submission -> confirmation.
//!
//! The machine owns the [`BookingDraft`] for one booking attempt. It reads
//! availability only through [`AvailabilityCache`] and shows it to the
//! visitor through the projector. The request it submits carries the host's
//! own date and time of the chosen slot, never the visitor-local label.
//!
//! Async operations come in two halves where ordering matters:
//! [`BookingStateMachine::begin_submit`] moves to `Submitting` and hands out
//! the request, [`BookingStateMachine::finish_submit`] consumes the answer.
//! [`BookingStateMachine::submit`] drives both against the API.

use bookwise_common::error::SlotbookError;
use bookwise_common::models::{BookingRequest, BookingResult, BookingSettings, CallType, PageRef};
use bookwise_common::services::BookingApi;
use bookwise_config::{TimeFormat, WidgetConfig};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::bounds::bounds_for_settings;
use crate::cache::AvailabilityCache;
use crate::error::{BookingError, ProjectionWarning};
use crate::models::{
    parse_wall_clock, BookingDraft, BookingWindow, ContactFields, ProjectedSlot, VisitorSlotMap,
};
use crate::projector::project_with_format;

/// Steps of the booking flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BookingStep {
    SelectingDate,
    SelectingTime,
    FillingForm,
    Submitting,
    Confirmed,
}

/// Inline message for the visitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Notice {
    /// The chosen slot was booked by someone else.
    SlotUnavailable,
    /// Submission failed; contact details are kept for a retry.
    SubmissionFailed(String),
    /// Availability could not be loaded; previously shown slots remain.
    AvailabilityFailed(String),
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::SlotUnavailable => {
                "That time is no longer available. Please pick another time.".to_string()
            }
            Notice::SubmissionFailed(reason) => {
                format!("Your booking could not be completed: {}. Please try again.", reason)
            }
            Notice::AvailabilityFailed(reason) => {
                format!("Available times could not be loaded: {}", reason)
            }
        }
    }
}

/// How a submission ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Confirmed,
    /// 409: back to date selection; `host_date` is the date to re-fetch.
    Conflict { host_date: NaiveDate },
    /// Any other failure: back to the form.
    Failed,
}

/// Behaviour knobs taken from [`WidgetConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineOptions {
    pub fallback_max_days: u32,
    pub time_format: TimeFormat,
    pub auto_select_first_date: bool,
}

impl Default for MachineOptions {
    fn default() -> Self {
        Self::from(&WidgetConfig::default())
    }
}

impl From<&WidgetConfig> for MachineOptions {
    fn from(config: &WidgetConfig) -> Self {
        Self {
            fallback_max_days: config.default_max_days_ahead,
            time_format: config.time_format,
            auto_select_first_date: config.auto_select_first_date,
        }
    }
}

pub struct BookingStateMachine<A: BookingApi + ?Sized> {
    api: Arc<A>,
    cache: Arc<AvailabilityCache<A>>,
    page: PageRef,
    host_time_zone: String,
    settings: BookingSettings,
    options: MachineOptions,

    step: BookingStep,
    draft: BookingDraft,
    window: BookingWindow,
    visitor_slots: VisitorSlotMap,
    selected_visitor_date: Option<NaiveDate>,
    time_options: Vec<ProjectedSlot>,
    warnings: Vec<ProjectionWarning>,
    notice: Option<Notice>,
    result: Option<BookingResult>,

    auto_advanced: bool,
    visitor_interacted: bool,
    unmounted: bool,
}

impl<A: BookingApi + ?Sized> BookingStateMachine<A> {
    /// Creates a machine in `SelectingDate` with an empty draft.
    ///
    /// `today` is the visitor's current date; it anchors the booking window.
    pub fn new(
        api: Arc<A>,
        cache: Arc<AvailabilityCache<A>>,
        page: PageRef,
        call_type: &CallType,
        visitor_time_zone: impl Into<String>,
        today: NaiveDate,
        options: MachineOptions,
    ) -> Self {
        let window = bounds_for_settings(today, &call_type.settings, options.fallback_max_days);
        Self {
            api,
            cache,
            page,
            host_time_zone: call_type.host_timezone.clone(),
            settings: call_type.settings,
            options,
            step: BookingStep::SelectingDate,
            draft: BookingDraft::new(visitor_time_zone),
            window,
            visitor_slots: VisitorSlotMap::new(),
            selected_visitor_date: None,
            time_options: Vec::new(),
            warnings: Vec::new(),
            notice: None,
            result: None,
            auto_advanced: false,
            visitor_interacted: false,
            unmounted: false,
        }
    }

    // --- Accessors ---

    pub fn step(&self) -> BookingStep {
        self.step
    }

    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    pub fn window(&self) -> BookingWindow {
        self.window
    }

    pub fn visitor_slots(&self) -> &VisitorSlotMap {
        &self.visitor_slots
    }

    /// Visitor-local date whose times are loaded into view.
    pub fn selected_visitor_date(&self) -> Option<NaiveDate> {
        self.selected_visitor_date
    }

    /// Slots offered for [`Self::selected_visitor_date`].
    pub fn time_options(&self) -> &[ProjectedSlot] {
        &self.time_options
    }

    /// Visitor-local dates inside the booking window that have slots.
    pub fn selectable_dates(&self) -> Vec<NaiveDate> {
        self.visitor_slots
            .iter()
            .filter(|(date, slots)| !slots.is_empty() && self.window.contains(*date))
            .map(|(date, _)| date)
            .collect()
    }

    /// Slots dropped by the last projection.
    pub fn warnings(&self) -> &[ProjectionWarning] {
        &self.warnings
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn result(&self) -> Option<&BookingResult> {
        self.result.as_ref()
    }

    pub fn cache(&self) -> &Arc<AvailabilityCache<A>> {
        &self.cache
    }

    pub fn is_unmounted(&self) -> bool {
        self.unmounted
    }

    // --- Window ---

    /// Recomputes the booking window for a new current date.
    pub fn refresh_window(&mut self, today: NaiveDate) {
        self.window = bounds_for_settings(today, &self.settings, self.options.fallback_max_days);
        debug!(
            "Booking window {}..={}",
            self.window.min_date, self.window.max_date
        );
    }

    /// Replaces the host's notice/lookahead settings.
    pub fn update_settings(&mut self, settings: BookingSettings, today: NaiveDate) {
        self.settings = settings;
        self.refresh_window(today);
    }

    // --- Availability ---

    /// Re-projects the cached host slots and refreshes the view.
    ///
    /// The first time slots show up, and only if the visitor has not chosen
    /// anything yet, the earliest bookable date is selected automatically.
    pub fn apply_availability(&mut self) {
        let host_slots = self.cache.slot_map();
        let projection = project_with_format(
            &host_slots,
            &self.host_time_zone,
            &self.draft.visitor_timezone,
            self.options.time_format,
        );
        if !projection.warnings.is_empty() {
            warn!(
                "{} slots could not be shown in {}",
                projection.warnings.len(),
                self.draft.visitor_timezone
            );
        }
        self.visitor_slots = projection.slots;
        self.warnings = projection.warnings;

        if let Some(date) = self.selected_visitor_date {
            self.time_options = self.visitor_slots.slots_on(date).to_vec();
            if self.step == BookingStep::SelectingTime && self.time_options.is_empty() {
                self.transition(BookingStep::SelectingDate);
            }
        }

        self.maybe_auto_advance();
    }

    fn maybe_auto_advance(&mut self) {
        if !self.options.auto_select_first_date
            || self.auto_advanced
            || self.visitor_interacted
            || self.step != BookingStep::SelectingDate
            || self.selected_visitor_date.is_some()
        {
            return;
        }
        let window = self.window;
        if let Some(date) = self
            .visitor_slots
            .earliest_date_where(|d| window.contains(d))
        {
            info!("Auto-selecting earliest available date {}", date);
            self.auto_advanced = true;
            self.load_date(date);
        }
    }

    /// The calendar now shows `start..=end`.
    ///
    /// Leaves time/form selection (but keeps contact details), then fetches
    /// the range. An in-flight submission or a confirmed booking is not
    /// interrupted. Fetch failures become a [`Notice`]; cached slots stay.
    pub async fn on_visible_range_change(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(), BookingError> {
        self.ensure_mounted()?;
        if matches!(
            self.step,
            BookingStep::SelectingTime | BookingStep::FillingForm
        ) {
            self.clear_selection();
            self.transition(BookingStep::SelectingDate);
        }

        let cache = Arc::clone(&self.cache);
        let fetched = cache.on_visible_range_change(start, end).await;
        self.ensure_mounted()?;
        match fetched {
            Ok(outcome) => {
                debug!("Visible range {}..={}: {:?}", start, end, outcome);
                if matches!(self.notice, Some(Notice::AvailabilityFailed(_))) {
                    self.notice = None;
                }
                self.apply_availability();
            }
            Err(error) => {
                self.notice = Some(Notice::AvailabilityFailed(error.to_string()));
            }
        }
        Ok(())
    }

    // --- Selection ---

    /// The visitor picks a visitor-local date.
    ///
    /// Rejected, without touching the network, when the date lies outside
    /// the booking window or has no slots.
    pub fn select_date(&mut self, date: NaiveDate) -> Result<(), BookingError> {
        self.ensure_mounted()?;
        self.ensure_step(
            &[BookingStep::SelectingDate, BookingStep::SelectingTime],
            "select a date",
        )?;
        if !self.window.contains(date) {
            return Err(BookingError::DateOutOfRange {
                date,
                min_date: self.window.min_date,
                max_date: self.window.max_date,
            });
        }
        if self.visitor_slots.slots_on(date).is_empty() {
            return Err(BookingError::NoSlotsOnDate(date));
        }
        self.visitor_interacted = true;
        self.load_date(date);
        Ok(())
    }

    /// The visitor picks one of [`Self::time_options`].
    ///
    /// Records the slot's host-local date and time in the draft.
    pub fn select_slot(&mut self, slot: &ProjectedSlot) -> Result<(), BookingError> {
        self.ensure_mounted()?;
        self.ensure_step(&[BookingStep::SelectingTime], "select a time")?;
        let chosen = self
            .time_options
            .iter()
            .find(|o| o.host_date == slot.host_date && o.host_time == slot.host_time)
            .ok_or(BookingError::UnknownSlot)?;

        self.draft.selected_date = Some(chosen.host_date);
        self.draft.selected_time = Some(chosen.host_time.clone());
        self.visitor_interacted = true;
        self.transition(BookingStep::FillingForm);
        Ok(())
    }

    /// One step back: form -> time, time -> date.
    pub fn back(&mut self) -> Result<(), BookingError> {
        self.ensure_mounted()?;
        match self.step {
            BookingStep::FillingForm => {
                self.draft.selected_date = None;
                self.draft.selected_time = None;
                self.transition(BookingStep::SelectingTime);
            }
            BookingStep::SelectingTime => {
                self.transition(BookingStep::SelectingDate);
            }
            step => {
                return Err(BookingError::InvalidTransition {
                    step,
                    action: "go back",
                })
            }
        }
        self.visitor_interacted = true;
        Ok(())
    }

    /// Replaces the contact details of the draft.
    pub fn set_contact(&mut self, contact: ContactFields) -> Result<(), BookingError> {
        self.ensure_mounted()?;
        self.ensure_step(&[BookingStep::FillingForm], "edit contact details")?;
        self.draft.contact = contact;
        Ok(())
    }

    // --- Submission ---

    /// Validates the draft, moves to `Submitting` and returns the request to send.
    ///
    /// Only one submission may be in flight per draft; a second call before
    /// [`Self::finish_submit`] fails with [`BookingError::SubmissionInFlight`].
    pub fn begin_submit(&mut self) -> Result<BookingRequest, BookingError> {
        self.ensure_mounted()?;
        if self.step == BookingStep::Submitting {
            return Err(BookingError::SubmissionInFlight);
        }
        self.ensure_step(&[BookingStep::FillingForm], "submit")?;
        self.draft
            .contact
            .validate()
            .map_err(BookingError::InvalidContact)?;
        if let Some(date) = self.selected_visitor_date {
            if !self.window.contains(date) {
                return Err(BookingError::DateOutOfRange {
                    date,
                    min_date: self.window.min_date,
                    max_date: self.window.max_date,
                });
            }
        }

        let (Some(host_date), Some(host_time)) =
            (self.draft.selected_date, self.draft.selected_time.as_deref())
        else {
            return Err(BookingError::UnknownSlot);
        };
        let wall_clock = parse_wall_clock(host_time).ok_or(BookingError::UnknownSlot)?;
        let start_datetime = host_date
            .and_time(wall_clock)
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string();

        let contact = &self.draft.contact;
        let request = BookingRequest {
            start_datetime,
            timezone: self.draft.visitor_timezone.clone(),
            name: contact.name.trim().to_string(),
            email: contact.email.trim().to_string(),
            phone: non_blank(contact.phone.as_deref()),
            notes: non_blank(contact.notes.as_deref()),
        };

        self.notice = None;
        self.transition(BookingStep::Submitting);
        Ok(request)
    }

    /// Consumes the answer to the request handed out by [`Self::begin_submit`].
    pub fn finish_submit(
        &mut self,
        response: Result<BookingResult, SlotbookError>,
    ) -> Result<SubmitOutcome, BookingError> {
        self.ensure_mounted()?;
        self.ensure_step(&[BookingStep::Submitting], "finish a submission")?;

        match response {
            Ok(result) => {
                info!(
                    "Booking confirmed: {}",
                    result
                        .id
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| "(no id)".to_string())
                );
                self.result = Some(result);
                self.transition(BookingStep::Confirmed);
                Ok(SubmitOutcome::Confirmed)
            }
            Err(SlotbookError::SlotConflict(message)) => {
                info!("Slot conflict: {}", message);
                let host_date = self
                    .draft
                    .selected_date
                    .ok_or(BookingError::UnknownSlot)?;
                self.draft.selected_time = None;
                self.time_options.clear();
                self.notice = Some(Notice::SlotUnavailable);
                self.transition(BookingStep::SelectingDate);
                Ok(SubmitOutcome::Conflict { host_date })
            }
            Err(error) => {
                warn!("Booking submission failed: {}", error);
                self.notice = Some(Notice::SubmissionFailed(error.to_string()));
                self.transition(BookingStep::FillingForm);
                Ok(SubmitOutcome::Failed)
            }
        }
    }

    /// Submits the draft and handles the answer, including conflict recovery.
    ///
    /// On a conflict only the affected host date is re-fetched.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, BookingError> {
        let request = self.begin_submit()?;
        let api = Arc::clone(&self.api);
        let response = api.create_booking(&self.page, request).await;
        let outcome = self.finish_submit(response)?;

        if let SubmitOutcome::Conflict { host_date } = outcome {
            self.refetch_date(host_date).await?;
        }
        Ok(outcome)
    }

    /// Re-fetches one host-local date and re-projects.
    pub async fn refetch_date(&mut self, host_date: NaiveDate) -> Result<(), BookingError> {
        self.ensure_mounted()?;
        let cache = Arc::clone(&self.cache);
        let fetched = cache.refresh_date(host_date).await;
        self.ensure_mounted()?;
        match fetched {
            Ok(_) => self.apply_availability(),
            Err(error) => warn!("Re-fetching {} failed: {}", host_date, error),
        }
        Ok(())
    }

    // --- Lifecycle ---

    /// Starts a fresh draft after a confirmed booking.
    pub fn start_new_draft(&mut self) -> Result<(), BookingError> {
        self.ensure_mounted()?;
        self.ensure_step(&[BookingStep::Confirmed], "start a new booking")?;
        self.draft = BookingDraft::new(self.draft.visitor_timezone.clone());
        self.selected_visitor_date = None;
        self.time_options.clear();
        self.result = None;
        self.notice = None;
        self.transition(BookingStep::SelectingDate);
        Ok(())
    }

    /// Discards the draft and abandons every in-flight fetch.
    pub fn unmount(&mut self) {
        if self.unmounted {
            return;
        }
        self.cache.close();
        self.draft = BookingDraft::new(self.draft.visitor_timezone.clone());
        self.unmounted = true;
        debug!("Booking widget unmounted");
    }

    // --- Internals ---

    fn load_date(&mut self, date: NaiveDate) {
        self.selected_visitor_date = Some(date);
        self.time_options = self.visitor_slots.slots_on(date).to_vec();
        self.draft.selected_date = None;
        self.draft.selected_time = None;
        if self.notice == Some(Notice::SlotUnavailable) {
            self.notice = None;
        }
        self.transition(BookingStep::SelectingTime);
    }

    fn clear_selection(&mut self) {
        self.selected_visitor_date = None;
        self.time_options.clear();
        self.draft.selected_date = None;
        self.draft.selected_time = None;
    }

    fn transition(&mut self, to: BookingStep) {
        if self.step != to {
            debug!("Booking step {:?} -> {:?}", self.step, to);
            self.step = to;
        }
    }

    fn ensure_mounted(&self) -> Result<(), BookingError> {
        if self.unmounted {
            Err(BookingError::Unmounted)
        } else {
            Ok(())
        }
    }

    fn ensure_step(&self, allowed: &[BookingStep], action: &'static str) -> Result<(), BookingError> {
        if allowed.contains(&self.step) {
            Ok(())
        } else {
            Err(BookingError::InvalidTransition {
                step: self.step,
                action,
            })
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
