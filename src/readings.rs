//! Timestamp normalization and time bucketing
//!
//! The portal reports readings with epoch timestamps that already encode the
//! district's local wall-clock time: decoding one as UTC yields the local
//! hour, not the real instant. This module reinterprets those timestamps into
//! true UTC instants and assigns instants to aggregation buckets using local
//! wall-clock arithmetic, so bucket boundaries stay correct across DST
//! transitions.

use crate::error::{NaiadError, Result};
use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone,
             Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One raw reading as fetched from the portal.
///
/// `ts` carries the portal's wall-clock encoding (see module docs); `values`
/// maps metric names to their readings, with `None` for metrics the portal
/// reported as null for that interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    /// Epoch seconds, local wall-clock encoded as if UTC
    pub ts: i64,

    /// Metric name to value; `None` when the portal reported null
    pub values: BTreeMap<String, Option<f64>>,
}

impl RawReading {
    /// Build a reading from a timestamp and `(metric, value)` pairs
    pub fn new<I>(ts: i64, values: I) -> Self
    where
        I: IntoIterator<Item = (String, Option<f64>)>,
    {
        Self {
            ts,
            values: values.into_iter().collect(),
        }
    }

    /// Value of one metric, flattened: absent and null are both `None`
    pub fn metric(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied().flatten()
    }
}

/// Aggregation bucket width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// Convert a portal timestamp into a true UTC instant.
///
/// The raw value is read as UTC seconds, which produces the local wall-clock
/// time; that naive value is then reinterpreted in `zone` and converted back
/// to UTC. Getting this wrong shifts every bucket assignment by the zone's
/// UTC offset.
pub fn normalize_timestamp(raw_ts: i64, zone: Tz) -> Result<DateTime<Utc>> {
    let wall = DateTime::from_timestamp(raw_ts, 0)
        .ok_or_else(|| NaiadError::validation("ts", "timestamp out of range"))?
        .naive_utc();
    Ok(resolve_local(wall, zone)?.with_timezone(&Utc))
}

/// Start of the bucket containing `instant`, computed in `zone`.
///
/// Weeks start on Monday (ISO convention). Truncation happens on the local
/// wall clock and the result is converted back to UTC, so a bucket on a DST
/// transition day keeps its local boundary even though its UTC width differs.
pub fn bucket_start(instant: DateTime<Utc>, zone: Tz, granularity: Granularity) -> Result<DateTime<Utc>> {
    let local = instant.with_timezone(&zone);
    let date = local.date_naive();

    let wall = match granularity {
        Granularity::Hourly => date.and_hms_opt(local.hour(), 0, 0),
        Granularity::Daily => date.and_hms_opt(0, 0, 0),
        Granularity::Weekly => {
            let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
            monday.and_hms_opt(0, 0, 0)
        }
        Granularity::Monthly => date.with_day(1).and_then(|d| d.and_hms_opt(0, 0, 0)),
        Granularity::Yearly => {
            NaiveDate::from_ymd_opt(date.year(), 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
        }
    }
    .ok_or_else(|| NaiadError::validation("instant", "bucket start out of range"))?;

    Ok(resolve_local(wall, zone)?.with_timezone(&Utc))
}

/// Resolve a naive local wall-clock value to a zoned instant.
///
/// Ambiguous times (clocks rolled back) take the earliest mapping; times
/// skipped by a forward transition resolve one hour later.
fn resolve_local(wall: NaiveDateTime, zone: Tz) -> Result<DateTime<Tz>> {
    match zone.from_local_datetime(&wall) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        LocalResult::None => zone
            .from_local_datetime(&(wall + Duration::hours(1)))
            .earliest()
            .ok_or_else(|| {
                NaiadError::validation("ts", &format!("unresolvable local time {}", wall))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::{Denver, New_York};
    use chrono_tz::Tz::UTC;

    fn wall_ts(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> i64 {
        // Portal encoding: the local wall clock stored as if it were UTC
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap().timestamp()
    }

    #[test]
    fn normalize_reinterprets_wall_clock() {
        // 12:00 on the wall in New York (EST, UTC-5) is 17:00 UTC
        let instant = normalize_timestamp(wall_ts(2024, 1, 15, 12, 0), New_York).unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2024, 1, 15, 17, 0, 0).unwrap());
    }

    #[test]
    fn normalize_skipped_hour_resolves_forward() {
        // 02:30 does not exist in Denver on 2024-03-10; resolves to 03:30 MDT
        let instant = normalize_timestamp(wall_ts(2024, 3, 10, 2, 30), Denver).unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2024, 3, 10, 9, 30, 0).unwrap());
    }

    #[test]
    fn normalize_ambiguous_hour_takes_earliest() {
        // 01:30 occurs twice in Denver on 2024-11-03; earliest is MDT (UTC-6)
        let instant = normalize_timestamp(wall_ts(2024, 11, 3, 1, 30), Denver).unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2024, 11, 3, 7, 30, 0).unwrap());
    }

    #[test]
    fn hourly_bucket_is_stable_across_spring_forward() {
        // 01:30 local on the spring-forward day buckets to 01:00 local (08:00 UTC)
        let instant = normalize_timestamp(wall_ts(2024, 3, 10, 1, 30), Denver).unwrap();
        let start = bucket_start(instant, Denver, Granularity::Hourly).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap());
    }

    #[test]
    fn bucket_truncation_per_granularity() {
        // Wednesday 2024-03-13 10:17 UTC
        let instant = Utc.with_ymd_and_hms(2024, 3, 13, 10, 17, 42).unwrap();

        let hour = bucket_start(instant, UTC, Granularity::Hourly).unwrap();
        assert_eq!(hour, Utc.with_ymd_and_hms(2024, 3, 13, 10, 0, 0).unwrap());

        let day = bucket_start(instant, UTC, Granularity::Daily).unwrap();
        assert_eq!(day, Utc.with_ymd_and_hms(2024, 3, 13, 0, 0, 0).unwrap());

        let week = bucket_start(instant, UTC, Granularity::Weekly).unwrap();
        assert_eq!(week, Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap());

        let month = bucket_start(instant, UTC, Granularity::Monthly).unwrap();
        assert_eq!(month, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());

        let year = bucket_start(instant, UTC, Granularity::Yearly).unwrap();
        assert_eq!(year, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn bucket_start_is_idempotent() {
        let instant = Utc.with_ymd_and_hms(2024, 6, 1, 13, 45, 10).unwrap();
        for granularity in [
            Granularity::Hourly,
            Granularity::Daily,
            Granularity::Weekly,
            Granularity::Monthly,
            Granularity::Yearly,
        ] {
            let once = bucket_start(instant, Denver, granularity).unwrap();
            let twice = bucket_start(once, Denver, granularity).unwrap();
            assert_eq!(once, twice, "{:?}", granularity);
        }
    }

    #[test]
    fn daily_bucket_in_zone_differs_from_utc_midnight() {
        // 02:00 UTC is still the previous day in Denver
        let instant = Utc.with_ymd_and_hms(2024, 6, 15, 2, 0, 0).unwrap();
        let start = bucket_start(instant, Denver, Granularity::Daily).unwrap();
        // Denver midnight on the 14th is 06:00 UTC
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 14, 6, 0, 0).unwrap());
    }
}
