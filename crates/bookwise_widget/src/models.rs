use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Format of host-local wall-clock slot labels.
pub const WALL_CLOCK_FORMAT: &str = "%H:%M";

/// Parses a host-local `HH:MM` label.
pub fn parse_wall_clock(time: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(time.trim(), WALL_CLOCK_FORMAT).ok()
}

/// Rewrites a parseable label as zero-padded `HH:MM`; others are returned unchanged.
fn canonical_label(time: String) -> String {
    match parse_wall_clock(&time) {
        Some(parsed) => parsed.format(WALL_CLOCK_FORMAT).to_string(),
        None => time,
    }
}

// --- Host-local availability ---

/// Host-local availability: calendar date -> wall-clock `HH:MM` labels.
///
/// Each date appears once and its labels are unique and kept sorted by time.
/// Parseable labels are stored zero-padded, so `9:00` and `09:00` are one slot.
/// Labels that do not parse as times are kept (sorted last) so the projector
/// can report them instead of losing them silently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HostSlotMap {
    days: BTreeMap<NaiveDate, Vec<String>>,
}

impl HostSlotMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the slots of `date`. An empty list removes the date.
    pub fn set_day<I, S>(&mut self, date: NaiveDate, times: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut times: Vec<String> = times
            .into_iter()
            .map(|t| canonical_label(t.into()))
            .collect();
        times.sort_by_cached_key(|t| {
            let parsed = parse_wall_clock(t);
            (parsed.is_none(), parsed, t.clone())
        });
        times.dedup();
        if times.is_empty() {
            self.days.remove(&date);
        } else {
            self.days.insert(date, times);
        }
    }

    /// Adds one slot to `date`, keeping the day sorted and unique.
    pub fn insert(&mut self, date: NaiveDate, time: impl Into<String>) {
        let mut times = self.days.remove(&date).unwrap_or_default();
        times.push(time.into());
        self.set_day(date, times);
    }

    pub fn remove_day(&mut self, date: NaiveDate) -> Option<Vec<String>> {
        self.days.remove(&date)
    }

    pub fn day(&self, date: NaiveDate) -> Option<&[String]> {
        self.days.get(&date).map(Vec::as_slice)
    }

    pub fn contains(&self, date: NaiveDate, time: &str) -> bool {
        self.day(date)
            .is_some_and(|times| times.iter().any(|t| t == time))
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &[String])> {
        self.days.iter().map(|(d, t)| (*d, t.as_slice()))
    }

    /// Number of distinct dates.
    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Total number of slots across all dates.
    pub fn slot_count(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }
}

impl<S: Into<String>> FromIterator<(NaiveDate, S)> for HostSlotMap {
    fn from_iter<T: IntoIterator<Item = (NaiveDate, S)>>(iter: T) -> Self {
        let mut map = HostSlotMap::new();
        for (date, time) in iter {
            map.insert(date, time);
        }
        map
    }
}

// --- Visitor-local projection ---

/// One host slot as the visitor sees it.
///
/// `host_date` / `host_time` are passed through untouched and are the only
/// values ever sent back to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectedSlot {
    pub host_date: NaiveDate,
    pub host_time: String,
    /// Absolute instant of the slot; used for ordering only.
    pub visitor_instant: DateTime<Utc>,
    pub visitor_time_display: String,
}

/// Visitor-local date -> slots, each day sorted by `visitor_instant`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VisitorSlotMap {
    days: BTreeMap<NaiveDate, Vec<ProjectedSlot>>,
}

impl VisitorSlotMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, visitor_date: NaiveDate, slot: ProjectedSlot) {
        self.days.entry(visitor_date).or_default().push(slot);
    }

    pub(crate) fn sort_days(&mut self) {
        for slots in self.days.values_mut() {
            // stable: equal instants keep host order
            slots.sort_by_key(|s| s.visitor_instant);
        }
    }

    pub fn slots_on(&self, date: NaiveDate) -> &[ProjectedSlot] {
        self.days.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &[ProjectedSlot])> {
        self.days.iter().map(|(d, s)| (*d, s.as_slice()))
    }

    /// Earliest visitor date satisfying `accept`.
    pub fn earliest_date_where(&self, accept: impl Fn(NaiveDate) -> bool) -> Option<NaiveDate> {
        self.days
            .iter()
            .find(|(date, slots)| !slots.is_empty() && accept(**date))
            .map(|(date, _)| *date)
    }

    /// Finds the projected slot carrying the given host-local values.
    pub fn find(&self, host_date: NaiveDate, host_time: &str) -> Option<(NaiveDate, &ProjectedSlot)> {
        self.days.iter().find_map(|(date, slots)| {
            slots
                .iter()
                .find(|s| s.host_date == host_date && s.host_time == host_time)
                .map(|s| (*date, s))
        })
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn slot_count(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }
}

// --- Booking window ---

/// Inclusive range of bookable calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BookingWindow {
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
}

impl BookingWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.min_date <= date && date <= self.max_date
    }

    /// True when the notice period reaches past the lookahead.
    pub fn is_empty(&self) -> bool {
        self.min_date > self.max_date
    }
}

// --- Booking draft ---

/// Contact details the visitor enters in the form step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContactFields {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

impl ContactFields {
    /// Checks the fields the booking endpoint requires.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is required".to_string());
        }
        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(())
            }
            _ => Err(format!("'{}' is not a valid email address", email)),
        }
    }
}

/// State of one booking attempt. Owned by the state machine only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingDraft {
    /// Host-local date of the chosen slot.
    pub selected_date: Option<NaiveDate>,
    /// Host-local `HH:MM` of the chosen slot.
    pub selected_time: Option<String>,
    pub visitor_timezone: String,
    pub contact: ContactFields,
}

impl BookingDraft {
    pub fn new(visitor_timezone: impl Into<String>) -> Self {
        Self {
            selected_date: None,
            selected_time: None,
            visitor_timezone: visitor_timezone.into(),
            contact: ContactFields::default(),
        }
    }
}
