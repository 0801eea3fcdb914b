//! Incremental point reconciliation
//!
//! The portal returns a year-plus of history on every fetch, so most of each
//! batch has already been committed. This module merges a fetched batch
//! against the last committed point of a series and produces only the new
//! point records, keeping the previous-point chain unbroken across cycles.

use crate::error::Result;
use crate::readings::{RawReading, normalize_timestamp};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Value smoothing applied while reconciling a series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Smoothing {
    /// Emit the raw metric value
    None,

    /// Emit the minimum of the last N raw values seen. Used for the computed
    /// leak series, where a transient usage spike must not register as the
    /// leak baseline.
    MinOfLastN(usize),
}

/// State of a stored point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointValue {
    /// A real reading
    Number(f64),

    /// Host wrote the point while the feed state was unknown
    Unknown,

    /// Host wrote the point while the feed was unavailable
    Unavailable,
}

impl PointValue {
    /// Whether this is a real numeric reading
    pub fn is_number(&self) -> bool {
        matches!(self, PointValue::Number(_))
    }
}

/// Identifier/value pair referencing an already-persisted point.
///
/// Carried instead of a live reference so the chain survives the prior
/// record having been persisted in an earlier process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointRef {
    /// When the referenced point was observed
    pub observed_at: DateTime<Utc>,

    /// The referenced point's value
    pub value: f64,
}

/// One append-only point record for a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    /// Series key, e.g. "hourly_water_consumption"
    pub series: String,

    /// Point state
    pub value: PointValue,

    /// True UTC instant of the reading
    pub observed_at: DateTime<Utc>,

    /// Reference to the prior point in the same series
    pub previous: Option<PointRef>,
}

impl PointRecord {
    /// Reference to this record, for chaining the next one
    pub fn as_ref_pair(&self) -> Option<PointRef> {
        match self.value {
            PointValue::Number(value) => Some(PointRef {
                observed_at: self.observed_at,
                value,
            }),
            _ => None,
        }
    }
}

/// Merge an ordered fetch batch against the series cursor.
///
/// Readings at or before `last_known_ts` are skipped without stopping the
/// scan (batches can interleave stale rows with fresh ones). Readings whose
/// `metric_key` is null or absent contribute nothing, not even to the
/// smoothing window. Each emitted record's `previous` is the previously
/// emitted record, seeded by `previous_point` so the chain continues from
/// the prior cycle.
pub fn reconcile(
    series: &str,
    readings: &[RawReading],
    metric_key: &str,
    zone: Tz,
    last_known_ts: Option<DateTime<Utc>>,
    previous_point: Option<PointRef>,
    smoothing: Smoothing,
) -> Result<Vec<PointRecord>> {
    let mut out = Vec::new();
    let mut window: Vec<f64> = Vec::new();
    let mut previous = previous_point;

    for reading in readings {
        let observed_at = normalize_timestamp(reading.ts, zone)?;

        if let Some(cursor) = last_known_ts
            && observed_at <= cursor
        {
            continue;
        }

        let Some(raw) = reading.metric(metric_key) else {
            continue;
        };

        let value = match smoothing {
            Smoothing::None => raw,
            Smoothing::MinOfLastN(n) => {
                // Window holds the last N raw values; min taken after append.
                window.push(raw);
                if window.len() > n {
                    window.remove(0);
                }
                window.iter().copied().fold(f64::INFINITY, f64::min)
            }
        };

        let record = PointRecord {
            series: series.to_string(),
            value: PointValue::Number(value),
            observed_at,
            previous,
        };
        previous = record.as_ref_pair();
        out.push(record);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Tz::UTC;

    const HOUR: i64 = 3600;
    const T0: i64 = 1_700_000_400; // aligned to an hour boundary

    fn batch(values: &[Option<f64>]) -> Vec<RawReading> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                RawReading::new(T0 + i as i64 * HOUR, [("gallons".to_string(), *v)])
            })
            .collect()
    }

    fn emitted_values(records: &[PointRecord]) -> Vec<f64> {
        records
            .iter()
            .map(|r| match r.value {
                PointValue::Number(v) => v,
                _ => f64::NAN,
            })
            .collect()
    }

    #[test]
    fn emits_raw_values_without_smoothing() {
        let readings = batch(&[Some(2.0), Some(3.0), Some(5.0)]);
        let records =
            reconcile("s", &readings, "gallons", UTC, None, None, Smoothing::None).unwrap();
        assert_eq!(emitted_values(&records), vec![2.0, 3.0, 5.0]);
    }

    #[test]
    fn min_of_last_n_window_semantics() {
        let readings = batch(&[
            Some(10.0),
            Some(8.0),
            Some(6.0),
            Some(4.0),
            Some(2.0),
            Some(20.0),
        ]);
        let records = reconcile(
            "s",
            &readings,
            "gallons",
            UTC,
            None,
            None,
            Smoothing::MinOfLastN(5),
        )
        .unwrap();
        // After the 6th append the window is {8,6,4,2,20}, so the min stays 2
        assert_eq!(emitted_values(&records), vec![10.0, 8.0, 6.0, 4.0, 2.0, 2.0]);
    }

    #[test]
    fn null_metrics_skip_emission_and_window() {
        let readings = batch(&[Some(9.0), None, Some(3.0)]);
        let records = reconcile(
            "s",
            &readings,
            "gallons",
            UTC,
            None,
            None,
            Smoothing::MinOfLastN(2),
        )
        .unwrap();
        // The null row neither emits nor widens the window: {9}, then {9,3}
        assert_eq!(emitted_values(&records), vec![9.0, 3.0]);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn cursor_skips_stale_rows_without_stopping() {
        let readings = batch(&[Some(1.0), Some(2.0), Some(3.0), Some(4.0)]);
        let cursor = normalize_timestamp(T0 + HOUR, UTC).unwrap();
        let records = reconcile(
            "s",
            &readings,
            "gallons",
            UTC,
            Some(cursor),
            None,
            Smoothing::None,
        )
        .unwrap();
        assert_eq!(emitted_values(&records), vec![3.0, 4.0]);
        // All emitted timestamps sit strictly after the cursor
        assert!(records.iter().all(|r| r.observed_at > cursor));
    }

    #[test]
    fn previous_chain_is_seeded_and_unbroken() {
        let seed = PointRef {
            observed_at: chrono::Utc.timestamp_opt(T0 - HOUR, 0).unwrap(),
            value: 7.0,
        };
        let readings = batch(&[Some(1.0), Some(2.0)]);
        let records = reconcile(
            "s",
            &readings,
            "gallons",
            UTC,
            None,
            Some(seed),
            Smoothing::None,
        )
        .unwrap();

        assert_eq!(records[0].previous, Some(seed));
        assert_eq!(records[1].previous, records[0].as_ref_pair());
    }

    #[test]
    fn empty_batch_emits_nothing() {
        let records = reconcile("s", &[], "gallons", UTC, None, None, Smoothing::None).unwrap();
        assert!(records.is_empty());
    }
}
