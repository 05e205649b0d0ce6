use bookwise_common::models::BookingSettings;
use chrono::{Days, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::models::BookingWindow;

/// Computes the inclusive range of selectable dates.
///
/// `min_date` is `today` plus the notice period rounded up to whole days;
/// `max_date` is `today` plus the lookahead. When the notice reaches past the
/// lookahead the window is empty (`min_date > max_date`).
pub fn compute_bounds(today: NaiveDate, min_notice_hours: u32, max_days_ahead: u32) -> BookingWindow {
    let notice_days = u64::from(min_notice_hours.div_ceil(24));
    BookingWindow {
        min_date: add_days(today, notice_days),
        max_date: add_days(today, u64::from(max_days_ahead)),
    }
}

/// [`compute_bounds`] for host settings, resolving an absent or zero
/// lookahead to `fallback_max_days`.
pub fn bounds_for_settings(
    today: NaiveDate,
    settings: &BookingSettings,
    fallback_max_days: u32,
) -> BookingWindow {
    compute_bounds(
        today,
        settings.effective_min_notice_hours(),
        settings.effective_max_days_ahead(fallback_max_days),
    )
}

/// The current calendar date on the visitor's wall clock.
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

// Saturates at the end of chrono's calendar instead of panicking.
fn add_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX)
}
