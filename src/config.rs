//! Configuration for vitalwatch
//!
//! CLI arguments and environment variable handling using clap.

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::FixedOffset;
use clap::Parser;

use crate::types::{DispatchError, Result};

/// vitalwatch - emergency vitals dispatch service
#[derive(Parser, Debug, Clone)]
#[command(name = "vitalwatch")]
#[command(about = "Polls wearable telemetry, records emergency alerts, and dispatches them to the nearest hospital")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// Path to the SQLite database file
    #[arg(long, env = "DATABASE_PATH", default_value = "vitalwatch.db")]
    pub database_path: PathBuf,

    /// Base URL of the realtime telemetry store
    #[arg(
        long,
        env = "TELEMETRY_URL",
        default_value = "https://healthcareband-default-rtdb.firebaseio.com"
    )]
    pub telemetry_url: String,

    /// Seconds between poll cycles
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value = "5")]
    pub poll_interval_secs: u64,

    /// UTC offset, in minutes, used to localize alert timestamps
    #[arg(long, env = "TZ_OFFSET_MINUTES", default_value = "330")]
    pub tz_offset_minutes: i32,

    /// Push gateway endpoint
    #[arg(
        long,
        env = "PUSH_ENDPOINT",
        default_value = "https://exp.host/--/api/v2/push/send"
    )]
    pub push_endpoint: String,

    /// Maximum queued outbound notifications
    #[arg(long, env = "PUSH_QUEUE_SIZE", default_value = "256")]
    pub push_queue_size: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(DispatchError::Config(
                "POLL_INTERVAL_SECS must be at least 1".to_string(),
            ));
        }
        if self.push_queue_size == 0 {
            return Err(DispatchError::Config(
                "PUSH_QUEUE_SIZE must be at least 1".to_string(),
            ));
        }
        if self.telemetry_url.is_empty() {
            return Err(DispatchError::Config("TELEMETRY_URL must be set".to_string()));
        }
        self.tz()?;
        Ok(())
    }

    /// Fixed offset used for localizing timestamps.
    pub fn tz(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.tz_offset_minutes * 60).ok_or_else(|| {
            DispatchError::Config(format!(
                "TZ_OFFSET_MINUTES out of range: {}",
                self.tz_offset_minutes
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from(["vitalwatch"])
    }

    #[test]
    fn defaults_are_valid() {
        let args = base_args();
        assert!(args.validate().is_ok());
        assert_eq!(args.poll_interval_secs, 5);
    }

    #[test]
    fn zero_interval_rejected() {
        let mut args = base_args();
        args.poll_interval_secs = 0;
        assert!(args.validate().is_err());
    }

    #[test]
    fn absurd_tz_offset_rejected() {
        let mut args = base_args();
        args.tz_offset_minutes = 100_000;
        assert!(args.validate().is_err());
    }
}
