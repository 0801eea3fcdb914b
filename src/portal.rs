//! WaterSmart portal client
//!
//! This module logs into a district's WaterSmart web portal and fetches the
//! hourly and daily usage charts. Sessions are cookie-based; a login is good
//! for the handful of requests one update cycle makes. The portal returns a
//! year-plus of history on every fetch, so responses are large but cheap to
//! reconcile thanks to cursor filtering downstream.

use crate::catalog::StreamKind;
use crate::config::PortalConfig;
use crate::error::{NaiadError, Result};
use crate::logging::get_logger;
use crate::readings::RawReading;
use std::collections::BTreeMap;
use std::time::Duration;

/// Districts served by WaterSmart, mapped to their portal subdomain
pub const PROVIDERS: &[(&str, &str)] = &[
    ("castaiclake", "Castaic Lake Water Agency"),
    ("cityofsacramento", "City of Sacramento"),
    ("ebmud", "East Bay Municipal Utility District"),
    ("lvmwd", "Las Virgenes Municipal Water District"),
    ("mnwd", "Moulton Niguel Water District"),
    ("scvwater", "Santa Clarita Valley Water Agency"),
];

/// Resolve a district display name to its portal subdomain
pub fn provider_slug(district: &str) -> Option<&'static str> {
    PROVIDERS
        .iter()
        .find(|(_, name)| name.eq_ignore_ascii_case(district.trim()))
        .map(|(slug, _)| *slug)
}

/// Login/fetch interface presented by the portal
#[async_trait::async_trait]
pub trait Portal: Send {
    /// Establish a session for the account
    async fn login(&mut self, username: &str, password: &str) -> Result<()>;

    /// Fetch one stream's readings, ordered by timestamp ascending
    async fn fetch(&mut self, stream: StreamKind) -> Result<Vec<RawReading>>;
}

/// HTTP client for one district's portal
pub struct PortalClient {
    base_url: String,
    http: reqwest::Client,
    logger: crate::logging::StructuredLogger,
}

impl PortalClient {
    /// Create a client for the configured district
    pub fn new(config: &PortalConfig) -> Result<Self> {
        let slug = provider_slug(&config.district).ok_or_else(|| {
            NaiadError::config(format!("Unknown water district: {}", config.district))
        })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .cookie_store(true)
            .build()?;

        Ok(Self {
            base_url: format!("https://{}.watersmart.com", slug),
            http,
            logger: get_logger("portal"),
        })
    }

    fn chart_endpoint(stream: StreamKind) -> &'static str {
        match stream {
            StreamKind::Hourly => "index.php/rest/v1/Chart/RealTimeChart?version=2",
            StreamKind::Daily => "index.php/rest/v1/Chart/DailyUsageChart",
        }
    }
}

#[async_trait::async_trait]
impl Portal for PortalClient {
    async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        let url = format!("{}/index.php/welcome/login?forceEmail=true", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "email": username, "password": password }))
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(NaiadError::auth(format!(
                "Portal rejected credentials for {}",
                username
            )));
        }
        if !status.is_success() {
            return Err(NaiadError::fetch(format!("Login failed: HTTP {}", status)));
        }

        let body: serde_json::Value = resp.json().await?;
        if let Some(err) = body.get("error").and_then(|e| e.as_str()) {
            return Err(NaiadError::auth(format!("Portal login error: {}", err)));
        }

        self.logger.debug("Portal session established");
        Ok(())
    }

    async fn fetch(&mut self, stream: StreamKind) -> Result<Vec<RawReading>> {
        let url = format!("{}/{}", self.base_url, Self::chart_endpoint(stream));
        let resp = self.http.get(&url).send().await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(NaiadError::auth("Portal session expired".to_string()));
        }
        if !status.is_success() {
            return Err(NaiadError::fetch(format!(
                "Fetch {} failed: HTTP {}",
                stream, status
            )));
        }

        let body: serde_json::Value = resp.json().await?;
        let readings = parse_series(&body)?;
        self.logger.debug(&format!(
            "Fetched {} {} readings",
            readings.len(),
            stream
        ));
        Ok(readings)
    }
}

/// Parse a chart payload into readings.
///
/// Rows without a usable timestamp are dropped; non-numeric fields other
/// than the timestamp are ignored so cosmetic payload additions don't break
/// the feed. Output is sorted by timestamp ascending.
fn parse_series(body: &serde_json::Value) -> Result<Vec<RawReading>> {
    let series = body
        .get("data")
        .and_then(|d| d.get("series"))
        .and_then(|s| s.as_array())
        .ok_or_else(|| NaiadError::data_shape("Chart payload has no data.series array"))?;

    let mut readings = Vec::with_capacity(series.len());
    for entry in series {
        let Some(row) = entry.as_object() else {
            continue;
        };
        let Some(ts) = row.get("read_datetime").and_then(|v| v.as_i64()) else {
            continue;
        };

        let mut values: BTreeMap<String, Option<f64>> = BTreeMap::new();
        for (key, value) in row {
            if key == "read_datetime" {
                continue;
            }
            if value.is_null() {
                values.insert(key.clone(), None);
            } else if let Some(n) = value.as_f64() {
                values.insert(key.clone(), Some(n));
            }
        }

        readings.push(RawReading { ts, values });
    }

    readings.sort_by_key(|r| r.ts);
    Ok(readings)
}
