//! Domain types shared across the pipeline, storage, and API layers

use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// Latest emergency snapshot for one subject, as published by the band
/// to the realtime store. `timestamp` is seconds since epoch.
#[derive(Debug, Clone, Deserialize)]
pub struct VitalSnapshot {
    #[serde(rename = "type")]
    pub alert_type: String,
    pub value: f64,
    pub timestamp: i64,
    pub lat: f64,
    pub lon: f64,
}

/// Vital-breach category carried on an alert.
///
/// Unknown codes from the band are preserved as `Other` rather than dropped,
/// so a firmware update adding a category does not lose events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertType {
    HighTemp,
    LowTemp,
    HighBpm,
    LowBpm,
    LowSpo2,
    Other(String),
}

impl AlertType {
    pub fn from_code(code: &str) -> Self {
        match code {
            "HIGH_TEMP" => AlertType::HighTemp,
            "LOW_TEMP" => AlertType::LowTemp,
            "HIGH_BPM" => AlertType::HighBpm,
            "LOW_BPM" => AlertType::LowBpm,
            "LOW_SPO2" => AlertType::LowSpo2,
            other => AlertType::Other(other.to_string()),
        }
    }

    pub fn as_code(&self) -> &str {
        match self {
            AlertType::HighTemp => "HIGH_TEMP",
            AlertType::LowTemp => "LOW_TEMP",
            AlertType::HighBpm => "HIGH_BPM",
            AlertType::LowBpm => "LOW_BPM",
            AlertType::LowSpo2 => "LOW_SPO2",
            AlertType::Other(code) => code,
        }
    }

    /// Human-readable form used in notification bodies ("HIGH TEMP").
    pub fn label(&self) -> String {
        self.as_code().replace('_', " ")
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Derived lifecycle status of an alert. Served wins over Assigned,
/// Assigned over Pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Pending,
    Assigned,
    Served,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Pending => "pending",
            AlertStatus::Assigned => "assigned",
            AlertStatus::Served => "served",
        }
    }
}

/// Monitored subject, as the poller sees it.
#[derive(Debug, Clone, Serialize)]
pub struct UserRef {
    pub id: i64,
    pub name: String,
    pub expo_push_token: Option<String>,
}

/// Hospital row. Coordinates and push token are nullable - both are filled
/// in by the hospital's own registration flow.
#[derive(Debug, Clone, Serialize)]
pub struct Hospital {
    pub id: i64,
    pub hospital_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub expo_push_token: Option<String>,
}

/// Input for admitting an alert into the ledger.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub user_id: i64,
    pub alert_type: AlertType,
    pub alert_value: f64,
    pub alert_time: String,
    pub gps_lat: f64,
    pub gps_lon: f64,
}

/// Ledger row joined with derived status and, where known, the responsible
/// hospital. Field names match what the mobile clients consume.
#[derive(Debug, Clone, Serialize)]
pub struct AlertWithStatus {
    pub id: i64,
    pub alert_type: String,
    pub alert_value: f64,
    pub alert_time: String,
    pub gps_lat: f64,
    pub gps_lon: f64,
    pub status: AlertStatus,
    pub hospital_name: Option<String>,
    pub hosp_lat: Option<f64>,
    pub hosp_lon: Option<f64>,
}

/// Live assignment as shown on a hospital's dispatch board.
#[derive(Debug, Clone, Serialize)]
pub struct LiveAssignment {
    pub assignment_id: i64,
    pub alert_id: i64,
    pub user_name: String,
    pub alert_type: String,
    pub alert_value: f64,
    pub alert_time: String,
    pub gps_lat: f64,
    pub gps_lon: f64,
    pub created_at: String,
}

/// Permanent record of a served alert.
#[derive(Debug, Clone, Serialize)]
pub struct ServedAlert {
    pub id: i64,
    pub alert_id: i64,
    pub user_name: String,
    pub alert_type: String,
    pub alert_value: f64,
    pub alert_time: String,
    pub served_at: String,
}

/// What `serve` hands back on success, read inside the same transaction
/// that removes the assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedOutcome {
    pub alert_id: i64,
    pub user_id: i64,
    pub hospital_id: i64,
}

/// Render an epoch-seconds timestamp in the deployment's local offset.
/// Returns `None` for timestamps outside chrono's representable range.
pub fn localize_epoch(secs: i64, tz: &FixedOffset) -> Option<String> {
    let dt = DateTime::<Utc>::from_timestamp(secs, 0)?;
    Some(dt.with_timezone(tz).format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Current wall-clock time in the deployment's local offset.
pub fn now_localized(tz: &FixedOffset) -> String {
    Utc::now().with_timezone(tz).format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_type_round_trips_known_codes() {
        assert_eq!(AlertType::from_code("HIGH_TEMP"), AlertType::HighTemp);
        assert_eq!(AlertType::HighTemp.as_code(), "HIGH_TEMP");
        assert_eq!(AlertType::LowSpo2.label(), "LOW SPO2");
    }

    #[test]
    fn alert_type_preserves_unknown_codes() {
        let t = AlertType::from_code("SEIZURE");
        assert_eq!(t, AlertType::Other("SEIZURE".to_string()));
        assert_eq!(t.as_code(), "SEIZURE");
    }

    #[test]
    fn localize_epoch_applies_offset() {
        // +05:30
        let tz = FixedOffset::east_opt(330 * 60).unwrap();
        // 2024-01-01 00:00:00 UTC -> 05:30 local
        let s = localize_epoch(1_704_067_200, &tz).unwrap();
        assert_eq!(s, "2024-01-01 05:30:00");
    }
}
