//! Host-local availability for the dates the calendar has shown.
//!
//! The cache is the only writer of the [`HostSlotMap`]. It turns raw
//! `slots` responses into the normalized map and merges them in, so a
//! narrower fetch never discards dates cached by an earlier, wider one.
//!
//! Fetches may overlap and resolve in any order. Every request draws a token
//! from one monotonic counter. A range response is dropped once a newer range
//! has been requested, and each date remembers the token of the response that
//! last wrote it, so a response never overwrites a date written by a newer
//! request. Once the cache is closed every late response is dropped.

use bookwise_common::error::SlotbookError;
use bookwise_common::models::{PageRef, SlotsResponse, WireSlot};
use bookwise_common::services::BookingApi;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::models::HostSlotMap;

/// Inclusive range of host-local dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Builds a range, swapping the bounds if they arrive reversed.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

/// Handle for one issued fetch; hand it back to [`AvailabilityCache::complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    token: u64,
    range: DateRange,
    visible: bool,
}

impl FetchTicket {
    pub fn range(&self) -> DateRange {
        self.range
    }
}

/// What happened to a fetch response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// `written` dates were updated; `skipped` already held newer data.
    Applied { written: usize, skipped: usize },
    /// Every date in the response had been written by a newer request.
    Stale,
    /// The cache was closed before the response arrived.
    Closed,
}

impl FetchOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, FetchOutcome::Applied { written, .. } if *written > 0)
    }
}

#[derive(Debug, Default)]
struct CacheState {
    slots: HostSlotMap,
    written_at: BTreeMap<NaiveDate, u64>,
    latest_range_token: u64,
    visible_range: Option<DateRange>,
    closed: bool,
}

pub struct AvailabilityCache<A: BookingApi + ?Sized> {
    api: Arc<A>,
    page: PageRef,
    state: Mutex<CacheState>,
    next_token: AtomicU64,
}

impl<A: BookingApi + ?Sized> AvailabilityCache<A> {
    pub fn new(api: Arc<A>, page: PageRef) -> Self {
        Self {
            api,
            page,
            state: Mutex::new(CacheState::default()),
            next_token: AtomicU64::new(1),
        }
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetches and merges availability for a newly visible calendar range.
    ///
    /// A failure leaves previously cached data untouched. Failures of a
    /// request that a newer range request has already superseded are
    /// reported as [`FetchOutcome::Stale`] instead.
    pub async fn on_visible_range_change(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchOutcome, SlotbookError> {
        let ticket = self.begin_range_fetch(start, end);
        let range = ticket.range();
        let response = self.api.fetch_slots(&self.page, range.start, range.end).await;

        match response {
            Ok(response) => Ok(self.complete(ticket, response)),
            Err(error) => {
                let superseded = {
                    let state = self.state();
                    state.closed || ticket.token < state.latest_range_token
                };
                if superseded {
                    debug!("Ignoring failure of superseded fetch {:?}: {}", range, error);
                    return Ok(FetchOutcome::Stale);
                }
                warn!("Availability fetch for {:?} failed: {}", range, error);
                Err(error)
            }
        }
    }

    /// Re-fetches a single host-local date, overwriting only that date.
    pub async fn refresh_date(&self, date: NaiveDate) -> Result<FetchOutcome, SlotbookError> {
        let ticket = self.begin_date_fetch(date);
        info!("Refreshing availability for {}", date);
        let response = self.api.fetch_slots(&self.page, date, date).await?;
        Ok(self.complete(ticket, response))
    }

    /// Registers a range fetch and makes it the latest visible range.
    pub fn begin_range_fetch(&self, start: NaiveDate, end: NaiveDate) -> FetchTicket {
        let range = DateRange::new(start, end);
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        state.latest_range_token = token;
        state.visible_range = Some(range);
        debug!("Range fetch #{} issued for {:?}", token, range);
        FetchTicket {
            token,
            range,
            visible: true,
        }
    }

    /// Registers a single-date fetch. The visible range is unchanged.
    pub fn begin_date_fetch(&self, date: NaiveDate) -> FetchTicket {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        FetchTicket {
            token,
            range: DateRange::single(date),
            visible: false,
        }
    }

    /// Merges a response into the cache.
    ///
    /// Every date of the ticket's range is replaced by the response (dates
    /// missing from it become empty) unless a newer request already wrote
    /// it. Dates outside the range are left alone. A range response whose
    /// range has since been replaced by a newer one is dropped entirely.
    pub fn complete(&self, ticket: FetchTicket, response: SlotsResponse) -> FetchOutcome {
        let fetched = normalize(response, ticket.range);
        let mut state = self.state();
        if state.closed {
            debug!("Dropping fetch #{}: cache closed", ticket.token);
            return FetchOutcome::Closed;
        }
        if ticket.visible && ticket.token < state.latest_range_token {
            debug!(
                "Dropping fetch #{}: range #{} requested since",
                ticket.token, state.latest_range_token
            );
            return FetchOutcome::Stale;
        }

        let (mut written, mut skipped) = (0, 0);
        for date in ticket.range.days() {
            if state.written_at.get(&date).is_some_and(|t| *t > ticket.token) {
                skipped += 1;
                continue;
            }
            match fetched.get(&date) {
                Some(times) => state.slots.set_day(date, times.iter().cloned()),
                None => {
                    state.slots.remove_day(date);
                }
            }
            state.written_at.insert(date, ticket.token);
            written += 1;
        }

        if written == 0 && skipped > 0 {
            debug!("Dropping fetch #{}: superseded by newer data", ticket.token);
            return FetchOutcome::Stale;
        }
        debug!(
            "Fetch #{} applied: {} dates written, {} skipped",
            ticket.token, written, skipped
        );
        FetchOutcome::Applied { written, skipped }
    }

    /// Snapshot of the cached host-local slots.
    pub fn slot_map(&self) -> HostSlotMap {
        self.state().slots.clone()
    }

    pub fn visible_range(&self) -> Option<DateRange> {
        self.state().visible_range
    }

    /// Forgets all cached dates. In-flight responses still land afterwards.
    pub fn invalidate(&self) {
        let mut state = self.state();
        state.slots = HostSlotMap::new();
        state.written_at.clear();
    }

    /// Abandons all in-flight fetches; later responses are discarded.
    pub fn close(&self) {
        self.state().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}

/// Normalizes a wire response into host-local dates and `HH:MM` labels.
///
/// Unparseable dates, dates outside the requested range and slots flagged
/// unavailable are dropped here; repeated dates are merged.
fn normalize(response: SlotsResponse, range: DateRange) -> BTreeMap<NaiveDate, Vec<String>> {
    let mut days: BTreeMap<NaiveDate, Vec<String>> = BTreeMap::new();
    for day in response.days {
        let Ok(date) = NaiveDate::parse_from_str(day.date.trim(), "%Y-%m-%d") else {
            warn!("Ignoring availability for malformed date '{}'", day.date);
            continue;
        };
        if !range.contains(date) {
            debug!("Ignoring availability for {} outside {:?}", date, range);
            continue;
        }
        days.entry(date)
            .or_default()
            .extend(day.slots.into_iter().filter_map(WireSlot::into_time));
    }
    days
}
