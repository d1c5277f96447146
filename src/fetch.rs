//! Retrying telemetry fetch-and-decode collaborator.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use std::time::Duration;
use tracing::warn;

use crate::telemetry::TelemetrySnapshot;

/// Fetches the telemetry feed and decodes it into snapshots, assigning
/// monotonically increasing sequence numbers. The sequence only advances on
/// a successful fetch-and-decode, so a failed cycle leaves no hole of its
/// own; holes seen downstream mean the feed itself was missed.
pub struct SnapshotFetcher {
    client: reqwest::Client,
    url: String,
    retries: u32,
    retry_delay: Duration,
    next_sequence: u64,
}

impl SnapshotFetcher {
    pub fn new(url: String, retries: u32, retry_delay: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            retries: retries.max(1),
            retry_delay,
            next_sequence: 1,
        }
    }

    /// The sequence number the next successful fetch will carry.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Fetch and decode one snapshot, retrying the download with a fixed
    /// delay between attempts.
    pub async fn fetch(&mut self) -> Result<TelemetrySnapshot> {
        let body = self.download().await?;
        let snapshot = TelemetrySnapshot::from_json(self.next_sequence, Utc::now(), &body)
            .context("Failed to decode telemetry snapshot")?;
        self.next_sequence += 1;
        Ok(snapshot)
    }

    async fn download(&self) -> Result<String> {
        let mut last_error = None;
        for attempt in 1..=self.retries {
            match self.try_download().await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    warn!(
                        "Error downloading telemetry (attempt {}/{}): {}",
                        attempt, self.retries, e
                    );
                    last_error = Some(e);
                    if attempt < self.retries {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow!("telemetry download failed")))
    }

    async fn try_download(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", self.url))?
            .error_for_status()
            .context("Telemetry feed returned an error status")?;
        response.text().await.context("Failed to read feed body")
    }
}
