//! Telemetry uplink: location batches to the management server.

use crate::config::UplinkConfig;
use crate::device::TelemetryUplink;
use crate::emergency::LocationSample;
use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Posts location batches as JSON to
/// `{base_url}/rest/public/locations/{project}/{device}`.
pub struct HttpUplink {
    client: reqwest::Client,
    base_url: url::Url,
}

impl HttpUplink {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = url::Url::parse(base_url)
            .with_context(|| format!("invalid uplink base URL `{base_url}`"))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, base_url })
    }

    pub fn endpoint(&self, project: &str, device_id: &str) -> anyhow::Result<url::Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("uplink base URL cannot be a base"))?
            .pop_if_empty()
            .extend(["rest", "public", "locations", project, device_id]);
        Ok(url)
    }
}

#[async_trait]
impl TelemetryUplink for HttpUplink {
    async fn send_locations(
        &self,
        project: &str,
        device_id: &str,
        samples: &[LocationSample],
    ) -> anyhow::Result<()> {
        let url = self.endpoint(project, device_id)?;
        let response = self.client.post(url).json(samples).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("location upload failed ({status}): {body}");
        }
        tracing::debug!(count = samples.len(), "locations uploaded");
        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Writes batches to the log only. Used when no server is configured.
pub struct LogUplink;

#[async_trait]
impl TelemetryUplink for LogUplink {
    async fn send_locations(
        &self,
        project: &str,
        device_id: &str,
        samples: &[LocationSample],
    ) -> anyhow::Result<()> {
        for sample in samples {
            tracing::info!(
                project,
                device_id,
                lat = sample.lat,
                lon = sample.lon,
                ts = sample.timestamp_ms,
                "location"
            );
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Pick the uplink from `[uplink]`.
pub fn create_uplink(config: &UplinkConfig) -> anyhow::Result<Arc<dyn TelemetryUplink>> {
    match config.base_url.as_deref().map(str::trim) {
        Some(base) if !base.is_empty() => Ok(Arc::new(HttpUplink::new(
            base,
            Duration::from_secs(config.timeout_secs),
        )?)),
        _ => Ok(Arc::new(LogUplink)),
    }
}
