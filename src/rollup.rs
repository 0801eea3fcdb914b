//! Bucket rollup statistics
//!
//! Groups normalized readings into aggregation buckets and computes per-bucket
//! sum, mean and a running cumulative sum that resets at period boundaries.
//! Shares the normalization and bucketing rules with the reconciler so both
//! sides of a cycle agree on what "new" means.

use crate::error::Result;
use crate::readings::{Granularity, RawReading, bucket_start, normalize_timestamp};
use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// One aggregated statistics row for a (series, bucket) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketRecord {
    /// Series key
    pub series: String,

    /// UTC instant of the bucket's local start
    pub bucket_start: DateTime<Utc>,

    /// Sum of the non-null metric values in the bucket
    pub sum: f64,

    /// Arithmetic mean of the non-null metric values, 0 when empty
    pub mean: f64,

    /// Running total, reset at period boundaries
    pub cumulative_sum: f64,

    /// When the running total last reset
    pub reset_at: DateTime<Utc>,
}

/// A bucket under construction: its start, boundary flag and collected values
#[derive(Debug)]
struct BucketSlot {
    start: DateTime<Utc>,
    on_boundary: bool,
    values: Vec<f64>,
}

/// Aggregate an ordered fetch batch into new bucket records.
///
/// Buckets at or before `last_known_bucket_start` are dropped; the running
/// total seeds from `seed_cumulative_sum` (the last committed bucket's
/// cumulative sum) and resets to the bucket's own sum whenever the bucket's
/// local wall-clock start sits on a period boundary.
pub fn aggregate(
    series: &str,
    readings: &[RawReading],
    metric_key: &str,
    granularity: Granularity,
    zone: Tz,
    last_known_bucket_start: Option<DateTime<Utc>>,
    seed_cumulative_sum: f64,
) -> Result<Vec<BucketRecord>> {
    // Input is ts-ordered, so grouping consecutive rows covers whole buckets.
    let mut slots: Vec<BucketSlot> = Vec::new();
    for reading in readings {
        let instant = normalize_timestamp(reading.ts, zone)?;
        let start = bucket_start(instant, zone, granularity)?;

        match slots.last_mut() {
            Some(slot) if slot.start == start => {
                if let Some(v) = reading.metric(metric_key) {
                    slot.values.push(v);
                }
            }
            _ => {
                let mut values = Vec::new();
                if let Some(v) = reading.metric(metric_key) {
                    values.push(v);
                }
                slots.push(BucketSlot {
                    start,
                    on_boundary: on_period_boundary(start, zone, granularity),
                    values,
                });
            }
        }
    }

    if let Some(cursor) = last_known_bucket_start {
        slots.retain(|slot| slot.start > cursor);
    }

    Ok(fold_buckets(series, slots, seed_cumulative_sum))
}

/// Fold bucket slots into records, carrying the running total
fn fold_buckets(series: &str, slots: Vec<BucketSlot>, seed: f64) -> Vec<BucketRecord> {
    let mut running = seed;
    slots
        .into_iter()
        .map(|slot| {
            let sum: f64 = slot.values.iter().sum();
            let mean = if slot.values.is_empty() {
                0.0
            } else {
                sum / slot.values.len() as f64
            };
            running = if slot.on_boundary { sum } else { running + sum };
            BucketRecord {
                series: series.to_string(),
                bucket_start: slot.start,
                sum,
                mean,
                cumulative_sum: running,
                reset_at: slot.start,
            }
        })
        .collect()
}

/// Whether a bucket's local start sits on its period boundary.
///
/// Hourly series reset at the local top of the hour, daily series at local
/// midnight. A daily bucket whose local start is not midnight (the day a
/// forward DST transition lands on it) keeps accumulating. Wider
/// granularities never reset.
fn on_period_boundary(start: DateTime<Utc>, zone: Tz, granularity: Granularity) -> bool {
    let local = start.with_timezone(&zone);
    match granularity {
        Granularity::Hourly => local.minute() == 0,
        Granularity::Daily => local.hour() == 0,
        _ => false,
    }
}
