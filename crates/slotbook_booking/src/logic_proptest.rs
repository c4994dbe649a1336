#[cfg(test)]
mod tests {
    use crate::logic::{validate_booking, BookingPolicy, BookingRejection};
    use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
    use chrono_tz::Tz;
    use proptest::prelude::*;

    // May 2025 has no DST transition in Zurich, so every wall-clock minute exists.
    fn base_now(offset_minutes: i64, seconds: u32) -> DateTime<Tz> {
        let time_zone = Tz::Europe__Zurich;
        time_zone.with_ymd_and_hms(2025, 5, 10, 0, 0, seconds).unwrap()
            + Duration::minutes(offset_minutes)
    }

    // Wall-clock fields for a candidate start `delta_minutes` from `now`'s minute.
    fn fields(now: &DateTime<Tz>, delta_minutes: i64) -> (String, String, DateTime<Utc>) {
        let floored = now.with_second(0).unwrap() + Duration::minutes(delta_minutes);
        (
            floored.format("%Y-%m-%d").to_string(),
            floored.format("%H:%M").to_string(),
            floored.with_timezone(&Utc),
        )
    }

    proptest! {
        #[test]
        fn test_outcome_follows_window_rules(
            now_offset in 0..(3 * 24 * 60i64),
            now_seconds in 0..60u32,
            delta in -(2 * 24 * 60i64)..(2 * 24 * 60i64),
            lead in 0..180i64,
            duration in 1..240i64,
        ) {
            let now = base_now(now_offset, now_seconds);
            let policy = BookingPolicy {
                lead_time: Duration::minutes(lead),
                duration: Duration::minutes(duration),
            };
            let (date, time, expected_start) = fields(&now, delta);
            let now_utc = now.with_timezone(&Utc);

            let result = validate_booking("prov", &date, &time, &now, &policy);

            if expected_start <= now_utc {
                prop_assert_eq!(result, Err(BookingRejection::PastTime));
            } else if now_utc > expected_start - policy.lead_time {
                prop_assert_eq!(result, Err(BookingRejection::TooLateToBook { lead_minutes: lead }));
            } else {
                let request = result.unwrap();
                prop_assert_eq!(request.start, expected_start);
                prop_assert_eq!(request.end, expected_start + policy.duration);
                prop_assert!(now_utc <= request.start - policy.lead_time);
            }
        }

        #[test]
        fn test_accepted_start_has_zero_seconds(
            now_offset in 0..(24 * 60i64),
            delta in 31..(24 * 60i64),
        ) {
            let now = base_now(now_offset, 0);
            let (date, time, _) = fields(&now, delta);
            let request = validate_booking("prov", &date, &time, &now, &BookingPolicy::default()).unwrap();
            prop_assert_eq!(request.start.second(), 0);
            prop_assert_eq!(request.end - request.start, Duration::minutes(60));
        }
    }
}
