//! Alert ledger operations
//!
//! The ledger is append-only: rows are inserted by admission and never
//! updated or deleted. Status is derived at query time from the presence of
//! served / assignment rows.

use rusqlite::{params, Connection, ErrorCode};
use tracing::debug;

use crate::models::{AlertStatus, AlertWithStatus, NewAlert};
use crate::types::Result;

/// Outcome of an admission attempt. A duplicate (user_id, alert_time) is an
/// expected, non-error outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Admitted(i64),
    AlreadyExists,
}

pub fn admit_alert(conn: &Connection, alert: &NewAlert) -> Result<Admission> {
    let inserted = conn.execute(
        "INSERT INTO alerts (user_id, alert_type, alert_value, alert_time, gps_lat, gps_lon)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            alert.user_id,
            alert.alert_type.as_code(),
            alert.alert_value,
            alert.alert_time,
            alert.gps_lat,
            alert.gps_lon
        ],
    );

    match inserted {
        Ok(_) => {
            let id = conn.last_insert_rowid();
            debug!(alert_id = id, user_id = alert.user_id, "alert admitted");
            Ok(Admission::Admitted(id))
        }
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            Ok(Admission::AlreadyExists)
        }
        Err(e) => Err(e.into()),
    }
}

/// Ledger rows for one subject, newest first, with derived status and the
/// responsible hospital where one is known. Served wins over Assigned wins
/// over Pending.
pub fn alerts_for_user(conn: &Connection, user_id: i64) -> Result<Vec<AlertWithStatus>> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.alert_type, a.alert_value, a.alert_time, a.gps_lat, a.gps_lon,
                CASE
                    WHEN s.id IS NOT NULL THEN 'served'
                    WHEN asg.id IS NOT NULL THEN 'assigned'
                    ELSE 'pending'
                END AS status,
                h.hospital_name, h.latitude, h.longitude
         FROM alerts a
         LEFT JOIN served_alerts s ON s.alert_id = a.id
         LEFT JOIN assignments asg ON asg.alert_id = a.id
         LEFT JOIN hospitals h ON h.id = COALESCE(s.hospital_id, asg.hospital_id)
         WHERE a.user_id = ?
         ORDER BY a.id DESC",
    )?;

    let rows = stmt
        .query_map(params![user_id], |row| {
            let status: String = row.get(6)?;
            Ok(AlertWithStatus {
                id: row.get(0)?,
                alert_type: row.get(1)?,
                alert_value: row.get(2)?,
                alert_time: row.get(3)?,
                gps_lat: row.get(4)?,
                gps_lon: row.get(5)?,
                status: match status.as_str() {
                    "served" => AlertStatus::Served,
                    "assigned" => AlertStatus::Assigned,
                    _ => AlertStatus::Pending,
                },
                hospital_name: row.get(7)?,
                hosp_lat: row.get(8)?,
                hosp_lon: row.get(9)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DispatchDb;
    use crate::models::AlertType;

    fn sample(user_id: i64, alert_time: &str) -> NewAlert {
        NewAlert {
            user_id,
            alert_type: AlertType::HighTemp,
            alert_value: 39.5,
            alert_time: alert_time.to_string(),
            gps_lat: 12.90,
            gps_lon: 77.60,
        }
    }

    #[test]
    fn each_distinct_timestamp_admits_exactly_once() {
        let db = DispatchDb::open_in_memory().unwrap();
        db.insert_user(1001, "Asha").unwrap();

        let first = db.admit_alert(&sample(1001, "2024-01-01 10:00:00")).unwrap();
        assert!(matches!(first, Admission::Admitted(_)));

        // Re-delivery of the identical snapshot is absorbed
        for _ in 0..3 {
            let dup = db.admit_alert(&sample(1001, "2024-01-01 10:00:00")).unwrap();
            assert_eq!(dup, Admission::AlreadyExists);
        }

        let second = db.admit_alert(&sample(1001, "2024-01-01 10:05:00")).unwrap();
        assert!(matches!(second, Admission::Admitted(_)));

        assert_eq!(db.alerts_for_user(1001).unwrap().len(), 2);
    }

    #[test]
    fn same_timestamp_different_users_do_not_collide() {
        let db = DispatchDb::open_in_memory().unwrap();
        db.insert_user(1001, "Asha").unwrap();
        db.insert_user(1002, "Ravi").unwrap();

        assert!(matches!(
            db.admit_alert(&sample(1001, "2024-01-01 10:00:00")).unwrap(),
            Admission::Admitted(_)
        ));
        assert!(matches!(
            db.admit_alert(&sample(1002, "2024-01-01 10:00:00")).unwrap(),
            Admission::Admitted(_)
        ));
    }

    #[test]
    fn alerts_are_listed_newest_first_with_pending_status() {
        let db = DispatchDb::open_in_memory().unwrap();
        db.insert_user(1001, "Asha").unwrap();

        db.admit_alert(&sample(1001, "2024-01-01 10:00:00")).unwrap();
        db.admit_alert(&sample(1001, "2024-01-01 11:00:00")).unwrap();

        let rows = db.alerts_for_user(1001).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].alert_time, "2024-01-01 11:00:00");
        assert_eq!(rows[0].status, AlertStatus::Pending);
        assert!(rows[0].hospital_name.is_none());
    }
}
