//! Assignment lifecycle operations
//!
//! An assignment is the live binding of an alert to the hospital responsible
//! for it. Serving moves the binding into `served_alerts` and deletes the
//! assignment row inside one transaction; the delete is the sole guard
//! against double-serve, so a concurrent second call finds nothing and
//! reports not-found cleanly.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::models::{LiveAssignment, ServedAlert, ServedOutcome};
use crate::types::Result;

pub fn create_assignment(
    conn: &Connection,
    alert_id: i64,
    user_id: i64,
    hospital_id: i64,
    created_at: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO assignments (alert_id, user_id, hospital_id, created_at)
         VALUES (?, ?, ?, ?)",
        params![alert_id, user_id, hospital_id, created_at],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Assigned -> Served inside one transaction.
///
/// Read the assignment by id (scoped to the calling hospital); absent means
/// missing or already served and nothing is written. Present: copy it into
/// the served ledger, delete it, commit.
pub fn serve_assignment(
    conn: &mut Connection,
    assignment_id: i64,
    hospital_id: i64,
    served_at: &str,
) -> Result<Option<ServedOutcome>> {
    let tx = conn.transaction()?;

    let outcome = tx
        .query_row(
            "SELECT alert_id, user_id, hospital_id FROM assignments
             WHERE id = ? AND hospital_id = ?",
            params![assignment_id, hospital_id],
            |row| {
                Ok(ServedOutcome {
                    alert_id: row.get(0)?,
                    user_id: row.get(1)?,
                    hospital_id: row.get(2)?,
                })
            },
        )
        .optional()?;

    let Some(outcome) = outcome else {
        return Ok(None);
    };

    tx.execute(
        "INSERT INTO served_alerts (alert_id, user_id, hospital_id, served_at)
         VALUES (?, ?, ?, ?)",
        params![outcome.alert_id, outcome.user_id, outcome.hospital_id, served_at],
    )?;
    tx.execute(
        "DELETE FROM assignments WHERE id = ?",
        params![assignment_id],
    )?;
    tx.commit()?;

    debug!(assignment_id, alert_id = outcome.alert_id, "assignment served");
    Ok(Some(outcome))
}

/// Live assignments for one hospital's dispatch board, newest first.
pub fn live_assignments(conn: &Connection, hospital_id: i64) -> Result<Vec<LiveAssignment>> {
    let mut stmt = conn.prepare(
        "SELECT asg.id, asg.alert_id, u.name, a.alert_type, a.alert_value, a.alert_time,
                a.gps_lat, a.gps_lon, asg.created_at
         FROM assignments asg
         JOIN alerts a ON a.id = asg.alert_id
         JOIN users u ON u.id = asg.user_id
         WHERE asg.hospital_id = ?
         ORDER BY asg.id DESC",
    )?;

    let rows = stmt
        .query_map(params![hospital_id], |row| {
            Ok(LiveAssignment {
                assignment_id: row.get(0)?,
                alert_id: row.get(1)?,
                user_name: row.get(2)?,
                alert_type: row.get(3)?,
                alert_value: row.get(4)?,
                alert_time: row.get(5)?,
                gps_lat: row.get(6)?,
                gps_lon: row.get(7)?,
                created_at: row.get(8)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Served history for one hospital, newest first.
pub fn served_alerts(conn: &Connection, hospital_id: i64) -> Result<Vec<ServedAlert>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.alert_id, u.name, a.alert_type, a.alert_value, a.alert_time, s.served_at
         FROM served_alerts s
         JOIN alerts a ON a.id = s.alert_id
         JOIN users u ON u.id = s.user_id
         WHERE s.hospital_id = ?
         ORDER BY s.id DESC",
    )?;

    let rows = stmt
        .query_map(params![hospital_id], |row| {
            Ok(ServedAlert {
                id: row.get(0)?,
                alert_id: row.get(1)?,
                user_name: row.get(2)?,
                alert_type: row.get(3)?,
                alert_value: row.get(4)?,
                alert_time: row.get(5)?,
                served_at: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Admission, DispatchDb};
    use crate::models::{AlertStatus, AlertType, NewAlert};

    fn seeded_db() -> (DispatchDb, i64) {
        let db = DispatchDb::open_in_memory().unwrap();
        db.insert_user(1001, "Asha").unwrap();
        db.insert_hospital(2001, "City General", Some(12.91), Some(77.61)).unwrap();

        let admission = db
            .admit_alert(&NewAlert {
                user_id: 1001,
                alert_type: AlertType::HighTemp,
                alert_value: 39.5,
                alert_time: "2024-01-01 10:00:00".to_string(),
                gps_lat: 12.90,
                gps_lon: 77.60,
            })
            .unwrap();
        let Admission::Admitted(alert_id) = admission else {
            panic!("expected admission");
        };
        (db, alert_id)
    }

    #[test]
    fn serve_moves_assignment_to_history_exactly_once() {
        let (db, alert_id) = seeded_db();
        let assignment_id = db
            .create_assignment(alert_id, 1001, 2001, "2024-01-01 10:00:01")
            .unwrap();

        let first = db
            .serve_assignment(assignment_id, 2001, "2024-01-01 10:30:00")
            .unwrap();
        assert_eq!(
            first,
            Some(ServedOutcome {
                alert_id,
                user_id: 1001,
                hospital_id: 2001,
            })
        );

        // Second serve finds nothing and writes nothing
        let second = db
            .serve_assignment(assignment_id, 2001, "2024-01-01 10:31:00")
            .unwrap();
        assert_eq!(second, None);

        assert!(db.live_assignments(2001).unwrap().is_empty());
        let served = db.served_alerts(2001).unwrap();
        assert_eq!(served.len(), 1);
        assert_eq!(served[0].alert_id, alert_id);
        assert_eq!(served[0].served_at, "2024-01-01 10:30:00");
    }

    #[test]
    fn serve_is_scoped_to_the_owning_hospital() {
        let (db, alert_id) = seeded_db();
        let assignment_id = db
            .create_assignment(alert_id, 1001, 2001, "2024-01-01 10:00:01")
            .unwrap();

        // Wrong hospital: not found, state untouched
        let result = db
            .serve_assignment(assignment_id, 9999, "2024-01-01 10:30:00")
            .unwrap();
        assert_eq!(result, None);
        assert_eq!(db.live_assignments(2001).unwrap().len(), 1);
        assert!(db.served_alerts(2001).unwrap().is_empty());
    }

    #[test]
    fn derived_status_follows_the_lifecycle() {
        let (db, alert_id) = seeded_db();

        assert_eq!(db.alerts_for_user(1001).unwrap()[0].status, AlertStatus::Pending);

        let assignment_id = db
            .create_assignment(alert_id, 1001, 2001, "2024-01-01 10:00:01")
            .unwrap();
        let row = &db.alerts_for_user(1001).unwrap()[0];
        assert_eq!(row.status, AlertStatus::Assigned);
        assert_eq!(row.hospital_name.as_deref(), Some("City General"));

        db.serve_assignment(assignment_id, 2001, "2024-01-01 10:30:00")
            .unwrap();
        let row = &db.alerts_for_user(1001).unwrap()[0];
        assert_eq!(row.status, AlertStatus::Served);
        // Hospital identity survives the serve via the served row
        assert_eq!(row.hospital_name.as_deref(), Some("City General"));
    }

    #[test]
    fn live_board_joins_alert_and_user() {
        let (db, alert_id) = seeded_db();
        db.create_assignment(alert_id, 1001, 2001, "2024-01-01 10:00:01")
            .unwrap();

        let board = db.live_assignments(2001).unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].user_name, "Asha");
        assert_eq!(board[0].alert_type, "HIGH_TEMP");
        assert_eq!(board[0].gps_lat, 12.90);
    }
}
