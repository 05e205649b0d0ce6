//! Projection of host-local availability into the visitor's timezone.
//!
//! A host slot is a wall-clock label (`2024-01-10`, `20:00`) that only means
//! something in the host's zone. Projection places it on the absolute
//! timeline and reads it back on the visitor's wall clock, which may move it
//! to a different calendar day. The host values ride along unchanged so the
//! booking request never has to reverse the conversion.

use bookwise_config::TimeFormat;
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::{ProjectionFailure, ProjectionWarning};
use crate::models::{parse_wall_clock, HostSlotMap, ProjectedSlot, VisitorSlotMap};

/// Longest run of non-existent local time searched when rounding forward.
/// Real gaps are one hour, rarely 30 minutes, and once a whole day.
const MAX_GAP_MINUTES: i64 = 26 * 60;

/// Result of one projection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    pub slots: VisitorSlotMap,
    /// One entry per host slot that had to be dropped.
    pub warnings: Vec<ProjectionWarning>,
}

/// Resolves an IANA timezone identifier.
pub fn parse_time_zone(id: &str) -> Result<Tz, ProjectionFailure> {
    Tz::from_str(id.trim()).map_err(|_| ProjectionFailure::UnknownTimezone(id.to_string()))
}

/// Projects host-local slots into the visitor's timezone with 24-hour labels.
pub fn project(host_slots: &HostSlotMap, host_zone: &str, visitor_zone: &str) -> Projection {
    project_with_format(host_slots, host_zone, visitor_zone, TimeFormat::TwentyFourHour)
}

/// Projects host-local slots into the visitor's timezone.
///
/// Every well-formed host slot yields exactly one [`ProjectedSlot`], bucketed
/// under the visitor-local date of its instant (the host date when both
/// zones are the same); buckets are sorted by
/// instant. Slots that cannot be projected are dropped and reported in
/// [`Projection::warnings`]; they never abort the rest of the pass. An
/// unknown zone therefore drops every slot, each with its own warning.
pub fn project_with_format(
    host_slots: &HostSlotMap,
    host_zone: &str,
    visitor_zone: &str,
    format: TimeFormat,
) -> Projection {
    let mut projection = Projection::default();

    let zones = parse_time_zone(host_zone)
        .and_then(|host| parse_time_zone(visitor_zone).map(|visitor| (host, visitor)));
    let (host_tz, visitor_tz) = match zones {
        Ok(zones) => zones,
        Err(failure) => {
            warn!(
                "Cannot project {} slots from {} to {}: {}",
                host_slots.slot_count(),
                host_zone,
                visitor_zone,
                failure
            );
            for (host_date, times) in host_slots.iter() {
                for host_time in times {
                    projection.warnings.push(ProjectionWarning {
                        host_date,
                        host_time: host_time.clone(),
                        failure: failure.clone(),
                    });
                }
            }
            return projection;
        }
    };

    for (host_date, times) in host_slots.iter() {
        for host_time in times {
            match project_slot(host_tz, visitor_tz, host_date, host_time, format) {
                Ok((visitor_date, slot)) => projection.slots.push(visitor_date, slot),
                Err(failure) => {
                    let warning = ProjectionWarning {
                        host_date,
                        host_time: host_time.clone(),
                        failure,
                    };
                    warn!("{}", warning);
                    projection.warnings.push(warning);
                }
            }
        }
    }
    projection.slots.sort_days();

    debug!(
        "Projected {} host slots on {} days into {} slots on {} days ({} -> {}, {} dropped)",
        host_slots.slot_count(),
        host_slots.len(),
        projection.slots.slot_count(),
        projection.slots.len(),
        host_zone,
        visitor_zone,
        projection.warnings.len()
    );
    projection
}

fn project_slot(
    host_tz: Tz,
    visitor_tz: Tz,
    host_date: NaiveDate,
    host_time: &str,
    format: TimeFormat,
) -> Result<(NaiveDate, ProjectedSlot), ProjectionFailure> {
    let wall_clock = parse_wall_clock(host_time)
        .ok_or_else(|| ProjectionFailure::MalformedTime(host_time.to_string()))?;
    let instant = host_instant(host_tz, host_date, wall_clock)?;
    let visitor_local = instant.with_timezone(&visitor_tz);
    // Same zone: keep the host's date even when a skipped day rounds the instant past it.
    let visitor_date = if host_tz == visitor_tz {
        host_date
    } else {
        visitor_local.date_naive()
    };

    Ok((
        visitor_date,
        ProjectedSlot {
            host_date,
            host_time: host_time.to_string(),
            visitor_instant: instant,
            visitor_time_display: format_wall_clock(&visitor_local, format),
        },
    ))
}

/// Places a host-local wall-clock time on the absolute timeline.
///
/// * Unique local times map to their instant.
/// * Repeated local times (clocks turned back) take the earlier instant.
/// * Skipped local times (clocks turned forward) round forward to the first
///   instant after the gap, i.e. the transition itself: `02:30` on a
///   `02:00 -> 03:00` spring-forward day becomes `03:00` after the change.
pub fn host_instant(
    tz: Tz,
    date: NaiveDate,
    time: NaiveTime,
) -> Result<DateTime<Utc>, ProjectionFailure> {
    let naive = date.and_time(time);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(local) => Ok(local.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => round_forward(tz, naive),
    }
}

fn round_forward(tz: Tz, naive: NaiveDateTime) -> Result<DateTime<Utc>, ProjectionFailure> {
    (1..=MAX_GAP_MINUTES)
        .find_map(|minutes| {
            let candidate = naive.checked_add_signed(Duration::minutes(minutes))?;
            tz.from_local_datetime(&candidate).earliest()
        })
        .map(|local| local.with_timezone(&Utc))
        .ok_or(ProjectionFailure::Unrepresentable)
}

/// Renders a visitor-local time label.
pub fn format_wall_clock<Z: TimeZone>(local: &DateTime<Z>, format: TimeFormat) -> String
where
    Z::Offset: std::fmt::Display,
{
    match format {
        TimeFormat::TwentyFourHour => local.format("%H:%M").to_string(),
        TimeFormat::TwelveHour => local.format("%-I:%M %p").to_string(),
    }
}
