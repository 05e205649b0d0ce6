//! Wire models for the public booking-page API.
//!
//! These types mirror the JSON exchanged with `/book/{username}/{shortcode}`
//! and its `slots` sub-resource. They are deliberately lenient on input:
//! anything the server may send in more than one shape is captured here and
//! normalized later, at the availability cache boundary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{validation_error, SlotbookError};

/// Identifies one public booking page: a host and one of their call types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRef {
    pub username: String,
    pub shortcode: String,
}

impl PageRef {
    pub fn new(
        username: impl Into<String>,
        shortcode: impl Into<String>,
    ) -> Result<Self, SlotbookError> {
        let username = username.into();
        let shortcode = shortcode.into();
        if username.trim().is_empty() || shortcode.trim().is_empty() {
            return Err(validation_error("username and shortcode must not be empty"));
        }
        Ok(Self {
            username,
            shortcode,
        })
    }

    /// `/book/{username}/{shortcode}`
    pub fn path(&self) -> String {
        format!("/book/{}/{}", self.username, self.shortcode)
    }
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.username, self.shortcode)
    }
}

/// Public profile of the host owning a booking page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostInfo {
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Host-configured notice and lookahead limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BookingSettings {
    #[serde(default)]
    pub min_notice_hours: Option<u32>,
    #[serde(default)]
    pub max_days_ahead: Option<u32>,
}

impl BookingSettings {
    /// The lookahead in days; zero or absent falls back to `fallback`.
    pub fn effective_max_days_ahead(&self, fallback: u32) -> u32 {
        match self.max_days_ahead {
            Some(days) if days > 0 => days,
            _ => fallback,
        }
    }

    pub fn effective_min_notice_hours(&self) -> u32 {
        self.min_notice_hours.unwrap_or(0)
    }
}

/// Call-type metadata returned by `GET /book/{username}/{shortcode}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallType {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(alias = "duration")]
    pub duration_minutes: u32,
    pub host: HostInfo,
    /// IANA identifier of the zone the host authored availability in.
    #[serde(alias = "timezone")]
    pub host_timezone: String,
    #[serde(default, alias = "booking_settings")]
    pub settings: BookingSettings,
}

/// One slot as it appears on the wire: a bare `"HH:MM"` or an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireSlot {
    Bare(String),
    Detailed {
        #[serde(alias = "start")]
        time: String,
        #[serde(default)]
        available: Option<bool>,
    },
}

impl WireSlot {
    /// The host-local wall-clock label, or `None` if the slot is marked unavailable.
    pub fn into_time(self) -> Option<String> {
        match self {
            WireSlot::Bare(time) => Some(time),
            WireSlot::Detailed {
                available: Some(false),
                ..
            } => None,
            WireSlot::Detailed { time, .. } => Some(time),
        }
    }
}

/// One host-local day of availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDay {
    pub date: String, // YYYY-MM-DD, host-local
    #[serde(default)]
    pub slots: Vec<WireSlot>,
}

/// Response of `GET /book/{username}/{shortcode}/slots`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlotsResponse {
    #[serde(default)]
    pub days: Vec<SlotDay>,
}

/// Query string of the slots endpoint.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SlotsQuery {
    #[serde(with = "iso_date")]
    pub start_date: NaiveDate,
    #[serde(with = "iso_date")]
    pub end_date: NaiveDate,
}

mod iso_date {
    use chrono::NaiveDate;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format("%Y-%m-%d"))
    }
}

/// Body of `POST /book/{username}/{shortcode}`.
///
/// `start_datetime` is host-local wall-clock time without an offset;
/// `timezone` is the visitor's zone and is informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub start_datetime: String,
    pub timezone: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Booking identifiers come back as numbers from some deployments, strings from others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BookingId {
    Number(i64),
    Text(String),
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingId::Number(n) => write!(f, "{}", n),
            BookingId::Text(s) => f.write_str(s),
        }
    }
}

/// Confirmation record returned after a successful booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingResult {
    #[serde(default)]
    pub id: Option<BookingId>,
    #[serde(default, alias = "meeting_url")]
    pub meeting_link: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_type_accepts_aliases_and_missing_settings() {
        let call_type: CallType = serde_json::from_value(json!({
            "name": "Intro call",
            "duration": 30,
            "host": { "name": "Ada" },
            "timezone": "America/New_York"
        }))
        .unwrap();

        assert_eq!(call_type.duration_minutes, 30);
        assert_eq!(call_type.host_timezone, "America/New_York");
        assert_eq!(call_type.settings, BookingSettings::default());
    }

    #[test]
    fn test_effective_max_days_ahead_falls_back_on_zero_or_absent() {
        let absent = BookingSettings::default();
        let zero = BookingSettings {
            min_notice_hours: None,
            max_days_ahead: Some(0),
        };
        let set = BookingSettings {
            min_notice_hours: Some(24),
            max_days_ahead: Some(14),
        };
        assert_eq!(absent.effective_max_days_ahead(60), 60);
        assert_eq!(zero.effective_max_days_ahead(60), 60);
        assert_eq!(set.effective_max_days_ahead(60), 14);
        assert_eq!(set.effective_min_notice_hours(), 24);
    }

    #[test]
    fn test_slots_response_accepts_mixed_slot_shapes() {
        let response: SlotsResponse = serde_json::from_value(json!({
            "days": [
                { "date": "2024-01-10", "slots": ["09:00", { "time": "10:00" }, { "start": "11:00", "available": false }] }
            ]
        }))
        .unwrap();

        let times: Vec<Option<String>> = response.days[0]
            .slots
            .iter()
            .cloned()
            .map(WireSlot::into_time)
            .collect();
        assert_eq!(
            times,
            vec![Some("09:00".to_string()), Some("10:00".to_string()), None]
        );
    }

    #[test]
    fn test_booking_request_omits_absent_optionals() {
        let request = BookingRequest {
            start_datetime: "2024-01-10T20:00:00".to_string(),
            timezone: "Asia/Tokyo".to_string(),
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
            phone: None,
            notes: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("phone").is_none());
        assert!(value.get("notes").is_none());
        assert_eq!(value["start_datetime"], "2024-01-10T20:00:00");
    }

    #[test]
    fn test_booking_result_keeps_unknown_fields() {
        let result: BookingResult = serde_json::from_value(json!({
            "id": 42,
            "meeting_url": "https://meet.example.com/abc",
            "status": "confirmed"
        }))
        .unwrap();
        assert_eq!(result.id, Some(BookingId::Number(42)));
        assert_eq!(
            result.meeting_link.as_deref(),
            Some("https://meet.example.com/abc")
        );
        assert_eq!(result.extra["status"], "confirmed");
    }

    #[test]
    fn test_page_ref_rejects_blank_parts() {
        assert!(PageRef::new("ada", " ").is_err());
        let page = PageRef::new("ada", "intro").unwrap();
        assert_eq!(page.path(), "/book/ada/intro");
    }
}
