//! Series catalog
//!
//! Static table of the output series Naiad maintains, keyed by the portal
//! stream that feeds them. Each entry names the portal metric it reads, the
//! unit and statistic kind it exports, and any value smoothing applied
//! during reconciliation.

use crate::readings::Granularity;
use crate::reconcile::Smoothing;
use crate::store::SeriesMetadata;

/// Number of raw values the computed-leak smoothing window holds
pub const LEAK_WINDOW: usize = 5;

/// Portal data stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Hourly consumption readings
    Hourly,

    /// Daily consumption plus weather readings
    Daily,
}

impl StreamKind {
    /// Stable lowercase name, used in logs and cycle outcomes
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Hourly => "hourly",
            StreamKind::Daily => "daily",
        }
    }

    /// Bucket width the stream aggregates into
    pub fn granularity(&self) -> Granularity {
        match self {
            StreamKind::Hourly => Granularity::Hourly,
            StreamKind::Daily => Granularity::Daily,
        }
    }

    /// All streams, in processing order
    pub fn all() -> &'static [StreamKind] {
        &[StreamKind::Hourly, StreamKind::Daily]
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit of measurement for a series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Gallons,
    Fahrenheit,
    InchesPerDay,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Gallons => "gal",
            Unit::Fahrenheit => "°F",
            Unit::InchesPerDay => "in/d",
        }
    }
}

/// How a series' statistics behave over time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatisticKind {
    /// Accumulating quantity; buckets carry a meaningful running sum
    Total,

    /// Instantaneous quantity; only the mean is meaningful
    Measurement,
}

/// One output series definition
#[derive(Debug, Clone)]
pub struct SeriesSpec {
    /// Stable series key
    pub key: &'static str,

    /// Human-readable name
    pub name: &'static str,

    /// Stream that feeds the series
    pub stream: StreamKind,

    /// Metric name in the portal payload
    pub metric_key: &'static str,

    /// Exported unit
    pub unit: Unit,

    /// Statistic behavior
    pub statistic: StatisticKind,

    /// Suggested display precision
    pub display_precision: u8,

    /// Value smoothing applied during reconciliation
    pub smoothing: Smoothing,
}

/// All series Naiad maintains
pub const SERIES: &[SeriesSpec] = &[
    SeriesSpec {
        key: "hourly_water_consumption",
        name: "Hourly Water Consumption",
        stream: StreamKind::Hourly,
        metric_key: "gallons",
        unit: Unit::Gallons,
        statistic: StatisticKind::Total,
        display_precision: 2,
        smoothing: Smoothing::None,
    },
    SeriesSpec {
        key: "hourly_water_leak",
        name: "Hourly Water Leak",
        stream: StreamKind::Hourly,
        metric_key: "leak_gallons",
        unit: Unit::Gallons,
        statistic: StatisticKind::Total,
        display_precision: 2,
        smoothing: Smoothing::None,
    },
    SeriesSpec {
        key: "hourly_water_leak_computed",
        name: "Hourly Water Leak (Computed)",
        stream: StreamKind::Hourly,
        metric_key: "gallons",
        unit: Unit::Gallons,
        statistic: StatisticKind::Total,
        display_precision: 2,
        smoothing: Smoothing::MinOfLastN(LEAK_WINDOW),
    },
    SeriesSpec {
        key: "daily_water_consumption",
        name: "Daily Water Consumption",
        stream: StreamKind::Daily,
        metric_key: "consumption",
        unit: Unit::Gallons,
        statistic: StatisticKind::Total,
        display_precision: 2,
        smoothing: Smoothing::None,
    },
    SeriesSpec {
        key: "daily_temperature",
        name: "Daily Temperature",
        stream: StreamKind::Daily,
        metric_key: "temperature",
        unit: Unit::Fahrenheit,
        statistic: StatisticKind::Measurement,
        display_precision: 2,
        smoothing: Smoothing::None,
    },
    SeriesSpec {
        key: "daily_precipitation",
        name: "Daily Precipitation",
        stream: StreamKind::Daily,
        metric_key: "precipitation",
        unit: Unit::InchesPerDay,
        statistic: StatisticKind::Measurement,
        display_precision: 2,
        smoothing: Smoothing::None,
    },
];

/// Series fed by one stream, in catalog order
pub fn series_for_stream(stream: StreamKind) -> impl Iterator<Item = &'static SeriesSpec> {
    SERIES.iter().filter(move |spec| spec.stream == stream)
}

impl SeriesSpec {
    /// External statistic identifier
    pub fn statistic_id(&self) -> String {
        format!("sensor.{}", self.key)
    }

    /// Metadata exported with this series' statistics
    pub fn metadata(&self) -> SeriesMetadata {
        SeriesMetadata {
            statistic_id: self.statistic_id(),
            name: self.name.to_string(),
            unit: self.unit.as_str().to_string(),
            has_mean: true,
            has_sum: self.statistic == StatisticKind::Total,
            source: "naiad".to_string(),
        }
    }
}
