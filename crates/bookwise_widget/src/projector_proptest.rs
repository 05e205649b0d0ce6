#[cfg(test)]
mod tests {
    use crate::models::HostSlotMap;
    use crate::projector::{parse_time_zone, project};
    use chrono::{Days, NaiveDate, NaiveTime, TimeZone};
    use proptest::prelude::*;

    const ZONES: &[&str] = &[
        "UTC",
        "America/New_York",
        "America/Los_Angeles",
        "America/St_Johns",
        "Europe/Zurich",
        "Asia/Kolkata",
        "Asia/Kathmandu",
        "Asia/Tokyo",
        "Australia/Lord_Howe",
        "Pacific/Chatham",
        "Pacific/Kiritimati",
    ];

    // Builds a host map from (day offset, [(hour, quarter)]) tuples starting at 2024-01-01
    fn build_host_map(days: &[(u64, Vec<(u32, u32)>)]) -> HostSlotMap {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut map = HostSlotMap::new();
        for (offset, times) in days {
            let date = base.checked_add_days(Days::new(*offset)).unwrap();
            map.set_day(
                date,
                times
                    .iter()
                    .map(|(hour, quarter)| format!("{:02}:{:02}", hour, quarter * 15)),
            );
        }
        map
    }

    fn host_days() -> impl Strategy<Value = Vec<(u64, Vec<(u32, u32)>)>> {
        prop::collection::vec(
            (0..366u64, prop::collection::vec((0..24u32, 0..4u32), 1..8)),
            0..12,
        )
    }

    proptest! {
        // Every well-formed host slot shows up exactly once for the visitor
        #[test]
        fn test_projection_conserves_slots(
            days in host_days(),
            host_zone in prop::sample::select(ZONES),
            visitor_zone in prop::sample::select(ZONES),
        ) {
            let host = build_host_map(&days);
            let projection = project(&host, host_zone, visitor_zone);

            prop_assert!(projection.warnings.is_empty());
            prop_assert_eq!(projection.slots.slot_count(), host.slot_count());

            for (_, slots) in projection.slots.iter() {
                prop_assert!(slots.windows(2).all(|w| w[0].visitor_instant <= w[1].visitor_instant));
                for slot in slots {
                    prop_assert!(host.contains(slot.host_date, &slot.host_time));
                }
            }
        }

        // Projecting into the host's own zone changes neither dates nor order
        #[test]
        fn test_same_zone_projection_is_identity(
            days in host_days(),
            zone in prop::sample::select(ZONES),
        ) {
            let host = build_host_map(&days);
            let tz = parse_time_zone(zone).unwrap();
            let projection = project(&host, zone, zone);

            prop_assert_eq!(
                projection.slots.dates().collect::<Vec<_>>(),
                host.dates().collect::<Vec<_>>()
            );
            for (day, times) in host.iter() {
                let projected = projection.slots.slots_on(day);
                let host_times: Vec<&str> = projected.iter().map(|s| s.host_time.as_str()).collect();
                prop_assert_eq!(host_times, times);

                for slot in projected {
                    let wall_clock = NaiveTime::parse_from_str(&slot.host_time, "%H:%M").unwrap();
                    // times skipped by a DST gap are shown at the transition instead
                    if tz.from_local_datetime(&day.and_time(wall_clock)).earliest().is_some() {
                        prop_assert_eq!(&slot.visitor_time_display, &slot.host_time);
                    }
                }
            }
        }
    }
}
