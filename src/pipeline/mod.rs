//! The poll-admit-match-notify pipeline
//!
//! One periodic task: each tick fetches the latest snapshot per monitored
//! subject, admits fresh ones into the ledger, assigns the nearest hospital,
//! and queues notifications for both parties. A cycle always runs to
//! completion before the next tick fires, and no failure inside a cycle is
//! allowed to stop the loop.

pub mod dedup;
pub mod matcher;

use std::sync::Arc;
use std::time::Duration;

use chrono::FixedOffset;
use serde_json::json;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::db::{Admission, DispatchDb};
use crate::models::{localize_epoch, now_localized, AlertType, NewAlert, UserRef};
use crate::notify::Notifier;
use crate::telemetry::TelemetryStore;
use dedup::{Freshness, LastSeenTracker};

pub struct Pipeline {
    db: Arc<DispatchDb>,
    telemetry: Arc<dyn TelemetryStore>,
    notifier: Notifier,
    tracker: LastSeenTracker,
    interval: Duration,
    tz: FixedOffset,
}

impl Pipeline {
    pub fn new(
        db: Arc<DispatchDb>,
        telemetry: Arc<dyn TelemetryStore>,
        notifier: Notifier,
        interval: Duration,
        tz: FixedOffset,
    ) -> Self {
        Self {
            db,
            telemetry,
            notifier,
            tracker: LastSeenTracker::new(),
            interval,
            tz,
        }
    }

    /// Run poll cycles forever. Cycles never overlap: the next tick waits
    /// for the current cycle to finish.
    pub async fn run(mut self) {
        info!(interval_secs = self.interval.as_secs(), "pipeline started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.cycle().await;
        }
    }

    /// One full poll cycle over the subject roster. Public so tests can
    /// drive cycles deterministically.
    pub async fn cycle(&mut self) {
        let users = match self.db.list_users() {
            Ok(users) => users,
            Err(e) => {
                warn!(error = %e, "failed to list monitored subjects, skipping cycle");
                return;
            }
        };

        for user in users {
            self.poll_subject(&user).await;
        }
    }

    async fn poll_subject(&mut self, user: &UserRef) {
        let snapshot = match self.telemetry.fetch_snapshot(user.id).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return,
            Err(e) => {
                // Absorbed: the next tick retries
                warn!(user_id = user.id, error = %e, "telemetry fetch failed");
                return;
            }
        };

        match self.tracker.observe(user.id, snapshot.timestamp) {
            Freshness::Fresh => {}
            Freshness::Duplicate => {
                // Timestamp equality is the only dedup signal; a distinct
                // second event in the same second is lost here.
                warn!(
                    user_id = user.id,
                    timestamp = snapshot.timestamp,
                    "snapshot timestamp equals last admitted, discarding"
                );
                return;
            }
            Freshness::Stale => {
                debug!(user_id = user.id, timestamp = snapshot.timestamp, "stale snapshot");
                return;
            }
        }

        let Some(alert_time) = localize_epoch(snapshot.timestamp, &self.tz) else {
            warn!(
                user_id = user.id,
                timestamp = snapshot.timestamp,
                "snapshot timestamp out of range, dropping"
            );
            return;
        };

        let alert = NewAlert {
            user_id: user.id,
            alert_type: AlertType::from_code(&snapshot.alert_type),
            alert_value: snapshot.value,
            alert_time,
            gps_lat: snapshot.lat,
            gps_lon: snapshot.lon,
        };

        match self.db.admit_alert(&alert) {
            Ok(Admission::Admitted(alert_id)) => {
                info!(
                    alert_id,
                    user_id = user.id,
                    alert_type = %alert.alert_type,
                    "alert admitted"
                );
                self.dispatch(alert_id, user, &alert);
            }
            Ok(Admission::AlreadyExists) => {
                warn!(
                    user_id = user.id,
                    alert_time = %alert.alert_time,
                    "alert already admitted for this timestamp"
                );
            }
            Err(e) => {
                // No retry, no dead-letter: the event is dropped
                error!(user_id = user.id, error = %e, "failed to record alert, dropping event");
            }
        }
    }

    /// Match an admitted alert to the nearest hospital, persist the
    /// assignment, and queue notifications for both parties.
    fn dispatch(&self, alert_id: i64, user: &UserRef, alert: &NewAlert) {
        let hospitals = match self.db.list_hospitals() {
            Ok(hospitals) => hospitals,
            Err(e) => {
                warn!(alert_id, error = %e, "failed to list hospitals, alert stays pending");
                return;
            }
        };

        let Some(hospital) = matcher::nearest(&hospitals, alert.gps_lat, alert.gps_lon) else {
            warn!(alert_id, "no hospital with known coordinates, alert stays pending");
            return;
        };

        let created_at = now_localized(&self.tz);
        if let Err(e) = self.db.create_assignment(alert_id, user.id, hospital.id, &created_at) {
            error!(alert_id, hospital_id = hospital.id, error = %e, "failed to create assignment");
            return;
        }

        info!(
            alert_id,
            hospital_id = hospital.id,
            hospital = %hospital.hospital_name,
            "alert assigned"
        );

        let label = alert.alert_type.label();
        self.notifier.enqueue(
            user.expo_push_token.as_deref(),
            &format!("{} ALERT", label),
            format!(
                "Reading {} at {}. {} has been notified.",
                alert.alert_value, alert.alert_time, hospital.hospital_name
            ),
            json!({ "alertId": alert_id }),
        );
        self.notifier.enqueue(
            hospital.expo_push_token.as_deref(),
            "EMERGENCY ASSIGNMENT",
            format!(
                "{} - patient {}: {} at {}",
                label, user.name, alert.alert_value, alert.alert_time
            ),
            json!({
                "alertId": alert_id,
                "lat": alert.gps_lat,
                "lon": alert.gps_lon,
            }),
        );
    }
}
