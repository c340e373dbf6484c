//! Realtime telemetry store client
//!
//! The band publishes its latest emergency snapshot to a Firebase-style
//! realtime database under `patient{id}/alert`. Reading that node is the
//! only interaction this service has with the store: no writes, no
//! subscriptions, just a GET per subject per poll cycle.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::models::VitalSnapshot;
use crate::types::{DispatchError, Result};

/// Read seam over the telemetry store, mockable in tests.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Latest snapshot for one subject, `None` when the node is empty
    /// (device off or never seen).
    async fn fetch_snapshot(&self, user_id: i64) -> Result<Option<VitalSnapshot>>;
}

/// HTTP client for a Firebase realtime database REST endpoint.
pub struct FirebaseTelemetry {
    client: Client,
    base_url: String,
}

impl FirebaseTelemetry {
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(4))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TelemetryStore for FirebaseTelemetry {
    async fn fetch_snapshot(&self, user_id: i64) -> Result<Option<VitalSnapshot>> {
        let url = format!("{}/patient{}/alert.json", self.base_url, user_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DispatchError::Telemetry(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DispatchError::Telemetry(format!(
                "telemetry store returned {} for {}",
                response.status(),
                url
            )));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DispatchError::Telemetry(e.to_string()))?;

        // Firebase returns literal null for an absent node
        if value.is_null() {
            return Ok(None);
        }

        let snapshot: VitalSnapshot = serde_json::from_value(value)
            .map_err(|e| DispatchError::Telemetry(format!("malformed snapshot: {}", e)))?;

        Ok(Some(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_deserializes_band_payload() {
        let raw = r#"{"type":"HIGH_TEMP","value":39.5,"timestamp":1704100000,"lat":12.90,"lon":77.60}"#;
        let snap: VitalSnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snap.alert_type, "HIGH_TEMP");
        assert_eq!(snap.timestamp, 1_704_100_000);
        assert_eq!(snap.lat, 12.90);
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let t = FirebaseTelemetry::new("https://example.firebaseio.com/".to_string());
        assert_eq!(t.base_url, "https://example.firebaseio.com");
    }
}
