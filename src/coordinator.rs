//! Update coordination
//!
//! One cycle walks every configured stream through login, fetch, state
//! rebuild and persistence. Streams fail independently: an exhausted login or
//! fetch marks that stream failed for the cycle and the others continue.
//! Cursors are re-read from the stores at the start of every cycle, so a
//! partially persisted cycle heals itself on the next run instead of
//! requiring transactional writes.

use crate::catalog::{self, StreamKind};
use crate::config::Config;
use crate::error::{NaiadError, Result};
use crate::logging::LogContext;
use crate::portal::Portal;
use crate::readings::RawReading;
use crate::reconcile::reconcile;
use crate::rollup::{BucketRecord, aggregate};
use crate::store::{PointStore, SeriesMetadata, StatisticsStore};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Phase a stream reached within one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CyclePhase {
    Authenticating,
    Fetching,
    RebuildingState,
    Persisting,
    Done,
    Failed,
}

/// Per-stream result of one cycle
#[derive(Debug, Clone, Serialize)]
pub struct StreamOutcome {
    /// Phase the stream reached
    pub phase: CyclePhase,

    /// New points persisted for the stream's series
    pub points_written: usize,

    /// New buckets persisted for the stream's series
    pub buckets_written: usize,

    /// The portal rejected the credentials; caller should trigger re-auth
    pub reauth_required: bool,

    /// Failure description, if the stream failed
    pub error: Option<String>,
}

impl StreamOutcome {
    fn starting() -> Self {
        Self {
            phase: CyclePhase::Authenticating,
            points_written: 0,
            buckets_written: 0,
            reauth_required: false,
            error: None,
        }
    }

    fn fail(&mut self, error: &NaiadError) {
        self.phase = CyclePhase::Failed;
        self.reauth_required = matches!(error, NaiadError::Auth { .. });
        self.error = Some(error.to_string());
    }
}

/// Result of one full cycle, exposed to the layer above
#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    /// Correlation id, also present in the cycle's log lines
    pub cycle_id: String,

    /// Outcome per stream name
    pub streams: HashMap<String, StreamOutcome>,
}

/// Drives fetch-reconcile-aggregate-persist cycles for one portal account
pub struct UsageCoordinator<P: Portal> {
    portal: P,
    points: Arc<dyn PointStore>,
    statistics: Arc<dyn StatisticsStore>,
    account: String,
    password: String,
    zone: Tz,
    max_attempts: u32,
    retry_delay: Duration,
    logger: crate::logging::StructuredLogger,
}

impl<P: Portal> UsageCoordinator<P> {
    /// Create a coordinator for the configured account
    pub fn new(
        portal: P,
        points: Arc<dyn PointStore>,
        statistics: Arc<dyn StatisticsStore>,
        config: &Config,
    ) -> Result<Self> {
        let zone: Tz = config
            .timezone
            .parse()
            .map_err(|_| NaiadError::config(format!("Invalid timezone: {}", config.timezone)))?;

        let context =
            LogContext::new("coordinator").with_account(config.portal.username.clone());

        Ok(Self {
            portal,
            points,
            statistics,
            account: config.portal.username.clone(),
            password: config.portal.password.clone(),
            zone,
            max_attempts: config.update.max_attempts,
            retry_delay: Duration::from_secs_f64(config.update.retry_delay_secs),
            logger: crate::logging::get_logger_with_context(context),
        })
    }

    /// Run one full update cycle across all streams.
    ///
    /// Returns the per-cycle result keyed by account; stream failures are
    /// recorded in the outcome, not raised.
    pub async fn run_cycle(&mut self) -> Result<HashMap<String, CycleOutcome>> {
        let cycle_id = uuid::Uuid::new_v4().to_string();
        let started = std::time::Instant::now();
        self.logger.debug(&format!("Starting cycle {}", cycle_id));

        let mut streams = HashMap::new();
        for stream in StreamKind::all() {
            let outcome = self.process_stream(*stream).await;
            if let Some(err) = &outcome.error {
                self.logger
                    .warn(&format!("Stream {} failed this cycle: {}", stream, err));
            }
            streams.insert(stream.as_str().to_string(), outcome);
        }

        self.logger.info(&format!(
            "Cycle {} finished in {:.1?}",
            cycle_id,
            started.elapsed()
        ));

        let outcome = CycleOutcome { cycle_id, streams };
        Ok(HashMap::from([(self.account.clone(), outcome)]))
    }

    async fn process_stream(&mut self, stream: StreamKind) -> StreamOutcome {
        let mut outcome = StreamOutcome::starting();

        if let Err(e) = self.login_with_retry().await {
            self.logger
                .error(&format!("Failed to log in to the portal: {}", e));
            outcome.fail(&e);
            return outcome;
        }

        outcome.phase = CyclePhase::Fetching;
        let readings = match self.fetch_with_retry(stream).await {
            Ok(readings) => readings,
            Err(e) => {
                self.logger
                    .error(&format!("Failed to fetch {} data: {}", stream, e));
                outcome.fail(&e);
                return outcome;
            }
        };

        outcome.phase = CyclePhase::RebuildingState;
        match self.rebuild_and_persist(stream, &readings, &mut outcome).await {
            Ok(()) => outcome.phase = CyclePhase::Done,
            Err(e) => {
                self.logger
                    .error(&format!("Stream {} store update failed: {}", stream, e));
                outcome.fail(&e);
            }
        }
        outcome
    }

    async fn login_with_retry(&mut self) -> Result<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.portal.login(&self.account, &self.password).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    self.logger
                        .debug(&format!("Login attempt {} failed: {}", attempt, e));
                    sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_with_retry(&mut self, stream: StreamKind) -> Result<Vec<RawReading>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.portal.fetch(stream).await {
                Ok(readings) => return Ok(readings),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    self.logger
                        .debug(&format!("Fetch attempt {} failed: {}", attempt, e));
                    sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Rebuild every series fed by `stream` from its cursors, then bulk-write.
    async fn rebuild_and_persist(
        &mut self,
        stream: StreamKind,
        readings: &[RawReading],
        outcome: &mut StreamOutcome,
    ) -> Result<()> {
        let mut new_points = Vec::new();
        let mut new_buckets: Vec<(SeriesMetadata, Vec<BucketRecord>)> = Vec::new();

        for spec in catalog::series_for_stream(stream) {
            self.points.delete_invalid(spec.key).await?;

            let last = self.points.last_point(spec.key).await?;
            let last_ts = last.as_ref().map(|p| p.observed_at);
            let previous = last.as_ref().and_then(|p| p.as_ref_pair());
            let points = reconcile(
                spec.key,
                readings,
                spec.metric_key,
                self.zone,
                last_ts,
                previous,
                spec.smoothing,
            )?;

            let last_bucket = self.statistics.last_bucket(spec.key).await?;
            let bucket_cursor = last_bucket.as_ref().map(|b| b.bucket_start);
            let seed = last_bucket.map_or(0.0, |b| b.cumulative_sum);
            let buckets = aggregate(
                spec.key,
                readings,
                spec.metric_key,
                stream.granularity(),
                self.zone,
                bucket_cursor,
                seed,
            )?;

            self.logger.debug(&format!(
                "Series {}: {} new points, {} new buckets",
                spec.key,
                points.len(),
                buckets.len()
            ));

            new_points.extend(points);
            if !buckets.is_empty() {
                new_buckets.push((spec.metadata(), buckets));
            }
        }

        outcome.phase = CyclePhase::Persisting;

        self.points.insert_points(&new_points).await?;
        outcome.points_written = new_points.len();

        for (metadata, buckets) in &new_buckets {
            self.statistics.insert_buckets(metadata, buckets).await?;
            outcome.buckets_written += buckets.len();
        }

        Ok(())
    }
}
