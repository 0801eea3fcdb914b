//! Point and statistics stores
//!
//! The coordinator treats storage as two narrow interfaces: an append-only
//! point store with a cursor query, and a statistics store keyed by bucket
//! start. `JsonStore` is the bundled implementation, a single JSON document
//! on disk holding both tables; the stores are the sole source of truth for
//! cursors, so every cycle re-reads them instead of caching.

use crate::error::Result;
use crate::logging::get_logger;
use crate::reconcile::PointRecord;
use crate::rollup::BucketRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Descriptive metadata exported alongside a series' statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesMetadata {
    /// External statistic identifier, e.g. "sensor.hourly_water_consumption"
    pub statistic_id: String,

    /// Human-readable name
    pub name: String,

    /// Unit of measurement
    pub unit: String,

    /// Whether buckets carry a meaningful mean
    pub has_mean: bool,

    /// Whether buckets carry a meaningful running sum
    pub has_sum: bool,

    /// Producer tag
    pub source: String,
}

/// Append-only point storage
#[async_trait]
pub trait PointStore: Send + Sync {
    /// Last stored point for a series, if any
    async fn last_point(&self, series: &str) -> Result<Option<PointRecord>>;

    /// Append a batch of points
    async fn insert_points(&self, points: &[PointRecord]) -> Result<()>;

    /// Remove points a host wrote in the Unknown/Unavailable states;
    /// returns how many were removed
    async fn delete_invalid(&self, series: &str) -> Result<usize>;
}

/// Aggregated statistics storage
#[async_trait]
pub trait StatisticsStore: Send + Sync {
    /// Last stored bucket for a series, if any
    async fn last_bucket(&self, series: &str) -> Result<Option<BucketRecord>>;

    /// Append a batch of buckets, refreshing the series metadata
    async fn insert_buckets(&self, metadata: &SeriesMetadata, buckets: &[BucketRecord])
    -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StatisticsTable {
    metadata: Option<SeriesMetadata>,
    buckets: Vec<BucketRecord>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    points: BTreeMap<String, Vec<PointRecord>>,
    statistics: BTreeMap<String, StatisticsTable>,
}

/// JSON file-backed implementation of both stores
pub struct JsonStore {
    file_path: Option<PathBuf>,
    state: Mutex<StoreState>,
    logger: crate::logging::StructuredLogger,
}

impl JsonStore {
    /// Open or create a store at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let logger = get_logger("store");
        let path = path.as_ref().to_path_buf();

        let state = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            let state = serde_json::from_str(&contents)?;
            logger.info(&format!("Loaded store from {}", path.display()));
            state
        } else {
            logger.info("No store file found, starting empty");
            StoreState::default()
        };

        Ok(Self {
            file_path: Some(path),
            state: Mutex::new(state),
            logger,
        })
    }

    /// Create a store that lives only in memory
    pub fn in_memory() -> Self {
        Self {
            file_path: None,
            state: Mutex::new(StoreState::default()),
            logger: get_logger("store"),
        }
    }

    fn persist(&self, state: &StoreState) -> Result<()> {
        if let Some(path) = &self.file_path {
            let contents = serde_json::to_string_pretty(state)?;
            std::fs::write(path, contents)?;
            self.logger.debug("Saved store to disk");
        }
        Ok(())
    }
}

#[async_trait]
impl PointStore for JsonStore {
    async fn last_point(&self, series: &str) -> Result<Option<PointRecord>> {
        let state = self.state.lock().await;
        Ok(state.points.get(series).and_then(|rows| rows.last()).cloned())
    }

    async fn insert_points(&self, points: &[PointRecord]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let mut state = self.state.lock().await;
        for point in points {
            state
                .points
                .entry(point.series.clone())
                .or_default()
                .push(point.clone());
        }
        self.persist(&state)
    }

    async fn delete_invalid(&self, series: &str) -> Result<usize> {
        let mut state = self.state.lock().await;
        let removed = match state.points.get_mut(series) {
            Some(rows) => {
                let before = rows.len();
                rows.retain(|row| row.value.is_number());
                before - rows.len()
            }
            None => 0,
        };
        if removed > 0 {
            self.logger
                .debug(&format!("Removed {} invalid points from {}", removed, series));
            self.persist(&state)?;
        }
        Ok(removed)
    }
}

#[async_trait]
impl StatisticsStore for JsonStore {
    async fn last_bucket(&self, series: &str) -> Result<Option<BucketRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .statistics
            .get(series)
            .and_then(|table| table.buckets.last())
            .cloned())
    }

    async fn insert_buckets(
        &self,
        metadata: &SeriesMetadata,
        buckets: &[BucketRecord],
    ) -> Result<()> {
        if buckets.is_empty() {
            return Ok(());
        }
        let mut state = self.state.lock().await;
        for bucket in buckets {
            let table = state.statistics.entry(bucket.series.clone()).or_default();
            table.metadata = Some(metadata.clone());
            table.buckets.push(bucket.clone());
        }
        self.persist(&state)
    }
}
