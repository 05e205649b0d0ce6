//! HTTP implementation of the booking-page API.
//!
//! [`HttpBookingApi`] talks to the public `/book/{username}/{shortcode}`
//! endpoints with `reqwest` and maps every failure into [`SlotbookError`].
//! The [`mock`] module provides an in-memory host calendar with the same
//! interface.

use bookwise_common::error::{config_error, SlotbookError};
use bookwise_common::http::client::{create_client, DEFAULT_TIMEOUT_SECS, HTTP_CLIENT};
use bookwise_common::http::error_from_response;
use bookwise_common::models::{
    BookingRequest, BookingResult, CallType, PageRef, SlotsQuery, SlotsResponse,
};
use bookwise_common::services::{BookingApi, BoxFuture};
use bookwise_config::ApiConfig;
use chrono::NaiveDate;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

/// `BookingApi` over HTTP.
#[derive(Clone)]
pub struct HttpBookingApi {
    client: Client,
    base_url: String,
}

impl HttpBookingApi {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Uses the process-wide client with default timeout.
    pub fn with_shared_client(base_url: impl Into<String>) -> Self {
        Self::new(HTTP_CLIENT.clone(), base_url)
    }

    /// Builds a client with the configured timeout and user agent.
    pub fn from_config(config: &ApiConfig) -> Result<Self, SlotbookError> {
        if config.base_url.trim().is_empty() {
            return Err(config_error("api.base_url must not be empty"));
        }
        let client = create_client(
            config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            config.user_agent.as_deref(),
        )
        .map_err(|e| config_error(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self::new(client, config.base_url.clone()))
    }

    fn url(&self, page: &PageRef, suffix: &str) -> String {
        format!("{}{}{}", self.base_url, page.path(), suffix)
    }
}

/// Decodes a success body or maps the status onto the error taxonomy.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, SlotbookError> {
    let status = response.status();
    info!("Response received with status: {}", status);

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(error_from_response(status.as_u16(), &body));
    }

    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

impl BookingApi for HttpBookingApi {
    fn fetch_call_type(&self, page: &PageRef) -> BoxFuture<'_, CallType, SlotbookError> {
        let url = self.url(page, "");
        Box::pin(async move {
            debug!("GET {}", url);
            let response = self.client.get(&url).send().await?;
            read_json(response).await
        })
    }

    fn fetch_slots(
        &self,
        page: &PageRef,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> BoxFuture<'_, SlotsResponse, SlotbookError> {
        let url = self.url(page, "/slots");
        let query = SlotsQuery {
            start_date,
            end_date,
        };
        Box::pin(async move {
            debug!("GET {} ({} to {})", url, start_date, end_date);
            let response = self.client.get(&url).query(&query).send().await?;
            read_json(response).await
        })
    }

    fn create_booking(
        &self,
        page: &PageRef,
        request: BookingRequest,
    ) -> BoxFuture<'_, BookingResult, SlotbookError> {
        let url = self.url(page, "");
        Box::pin(async move {
            debug!("POST {} start_datetime={}", url, request.start_datetime);
            let response = self.client.post(&url).json(&request).send().await?;
            read_json(response).await
        })
    }
}

pub mod mock {
    //! In-memory booking page for tests and demos.

    use super::*;
    use bookwise_common::models::{BookingId, BookingSettings, HostInfo, SlotDay, WireSlot};
    use chrono::NaiveDateTime;
    use crate::models::parse_wall_clock;
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::{Mutex, MutexGuard, PoisonError};
    use std::time::Duration;

    /// A call received by [`MockBookingApi`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ApiCall {
        CallType(PageRef),
        Slots {
            page: PageRef,
            start_date: NaiveDate,
            end_date: NaiveDate,
        },
        Booking {
            page: PageRef,
            request: BookingRequest,
        },
    }

    /// Mock booking page backed by a host calendar held in memory.
    ///
    /// Booking a slot removes it; booking a slot that is not (or no longer)
    /// in the calendar answers with [`SlotbookError::SlotConflict`], the
    /// same way the real endpoint answers 409.
    pub struct MockBookingApi {
        call_type: Mutex<Result<CallType, SlotbookError>>,
        host_days: Mutex<BTreeMap<NaiveDate, Vec<WireSlot>>>,
        booking_outcomes: Mutex<VecDeque<Result<BookingResult, SlotbookError>>>,
        slot_failures: Mutex<VecDeque<SlotbookError>>,
        slot_delays: Mutex<VecDeque<Duration>>,
        calls: Mutex<Vec<ApiCall>>,
        next_id: AtomicI64,
    }

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Call type of a host in `host_timezone` with the given limits.
    pub fn sample_call_type(host_timezone: &str, settings: BookingSettings) -> CallType {
        CallType {
            name: "Intro call".to_string(),
            description: Some("30 minutes to get to know each other".to_string()),
            duration_minutes: 30,
            host: HostInfo {
                name: "Ada Host".to_string(),
                username: Some("ada".to_string()),
                avatar_url: None,
            },
            host_timezone: host_timezone.to_string(),
            settings,
        }
    }

    impl MockBookingApi {
        /// Create a new mock booking page.
        pub fn new(call_type: CallType) -> Self {
            Self {
                call_type: Mutex::new(Ok(call_type)),
                host_days: Mutex::new(BTreeMap::new()),
                booking_outcomes: Mutex::new(VecDeque::new()),
                slot_failures: Mutex::new(VecDeque::new()),
                slot_delays: Mutex::new(VecDeque::new()),
                calls: Mutex::new(Vec::new()),
                next_id: AtomicI64::new(1),
            }
        }

        /// Mock page for a host with no notice and the default lookahead.
        pub fn for_host(host_timezone: &str) -> Self {
            Self::new(sample_call_type(host_timezone, BookingSettings::default()))
        }

        /// Builder form of [`MockBookingApi::set_day`].
        pub fn with_day(self, date: NaiveDate, times: &[&str]) -> Self {
            self.set_day(date, times);
            self
        }

        /// Replaces the host's slots on `date`.
        pub fn set_day(&self, date: NaiveDate, times: &[&str]) {
            let slots = times.iter().map(|t| WireSlot::Bare(t.to_string())).collect();
            lock(&self.host_days).insert(date, slots);
        }

        /// Replaces the host's slots on `date` with raw wire slots.
        pub fn set_wire_day(&self, date: NaiveDate, slots: Vec<WireSlot>) {
            lock(&self.host_days).insert(date, slots);
        }

        /// Removes one slot, as if another visitor had booked it.
        pub fn take_slot(&self, date: NaiveDate, time: &str) {
            if let Some(slots) = lock(&self.host_days).get_mut(&date) {
                slots.retain(|slot| slot.clone().into_time().as_deref() != Some(time));
            }
        }

        /// Makes every metadata fetch fail with `error`.
        pub fn fail_call_type(&self, error: SlotbookError) {
            *lock(&self.call_type) = Err(error);
        }

        /// Answers the next booking with `outcome` instead of checking the calendar.
        pub fn push_booking_outcome(&self, outcome: Result<BookingResult, SlotbookError>) {
            lock(&self.booking_outcomes).push_back(outcome);
        }

        /// Fails the next slot fetch with `error`.
        pub fn fail_next_slot_fetch(&self, error: SlotbookError) {
            lock(&self.slot_failures).push_back(error);
        }

        /// Delays the response of the next slot fetch.
        pub fn delay_next_slot_fetch(&self, delay: Duration) {
            lock(&self.slot_delays).push_back(delay);
        }

        pub fn calls(&self) -> Vec<ApiCall> {
            lock(&self.calls).clone()
        }

        /// `(start_date, end_date)` of every slot fetch, in call order.
        pub fn slot_fetches(&self) -> Vec<(NaiveDate, NaiveDate)> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    ApiCall::Slots {
                        start_date,
                        end_date,
                        ..
                    } => Some((start_date, end_date)),
                    _ => None,
                })
                .collect()
        }

        /// Every booking request received, in call order.
        pub fn booking_requests(&self) -> Vec<BookingRequest> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    ApiCall::Booking { request, .. } => Some(request),
                    _ => None,
                })
                .collect()
        }

        pub fn clear_calls(&self) {
            lock(&self.calls).clear();
        }

        fn record(&self, call: ApiCall) {
            lock(&self.calls).push(call);
        }

        fn book_from_calendar(&self, request: &BookingRequest) -> Result<BookingResult, SlotbookError> {
            let start = NaiveDateTime::parse_from_str(&request.start_datetime, "%Y-%m-%dT%H:%M:%S")
                .map_err(|e| SlotbookError::from_status(400, format!("invalid start_datetime: {}", e)))?;
            let date = start.date();
            let time = start.time();

            let mut days = lock(&self.host_days);
            let slots = days.get_mut(&date).ok_or_else(|| {
                SlotbookError::SlotConflict("Slot no longer available".to_string())
            })?;
            let before = slots.len();
            slots.retain(|slot| {
                slot.clone()
                    .into_time()
                    .and_then(|label| parse_wall_clock(&label))
                    != Some(time)
            });
            if slots.len() == before {
                return Err(SlotbookError::SlotConflict(
                    "Slot no longer available".to_string(),
                ));
            }

            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            Ok(BookingResult {
                id: Some(BookingId::Number(id)),
                meeting_link: Some(format!("https://meet.example.com/{}", id)),
                extra: serde_json::Map::new(),
            })
        }
    }

    impl BookingApi for MockBookingApi {
        fn fetch_call_type(&self, page: &PageRef) -> BoxFuture<'_, CallType, SlotbookError> {
            self.record(ApiCall::CallType(page.clone()));
            let outcome = lock(&self.call_type).clone();
            Box::pin(async move { outcome })
        }

        fn fetch_slots(
            &self,
            page: &PageRef,
            start_date: NaiveDate,
            end_date: NaiveDate,
        ) -> BoxFuture<'_, SlotsResponse, SlotbookError> {
            self.record(ApiCall::Slots {
                page: page.clone(),
                start_date,
                end_date,
            });
            let delay = lock(&self.slot_delays).pop_front();
            let failure = lock(&self.slot_failures).pop_front();

            Box::pin(async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                if let Some(error) = failure {
                    return Err(error);
                }
                // read the calendar when the response "arrives"
                let days = lock(&self.host_days)
                    .range(start_date..=end_date)
                    .map(|(date, slots)| SlotDay {
                        date: date.format("%Y-%m-%d").to_string(),
                        slots: slots.clone(),
                    })
                    .collect();
                Ok(SlotsResponse { days })
            })
        }

        fn create_booking(
            &self,
            page: &PageRef,
            request: BookingRequest,
        ) -> BoxFuture<'_, BookingResult, SlotbookError> {
            self.record(ApiCall::Booking {
                page: page.clone(),
                request: request.clone(),
            });
            let scripted = lock(&self.booking_outcomes).pop_front();
            Box::pin(async move {
                match scripted {
                    Some(outcome) => outcome,
                    None => self.book_from_calendar(&request),
                }
            })
        }
    }
}
