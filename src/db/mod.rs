//! SQLite storage layer for the dispatch pipeline
//!
//! One connection behind a mutex, WAL mode for concurrent readers. All
//! pipeline and API storage calls go through [`DispatchDb`]; the per-table
//! operations live in their own modules.
//!
//! ## Tables
//!
//! - `users` - monitored subjects (roster + push token)
//! - `alerts` - append-only alert ledger, UNIQUE(user_id, alert_time)
//! - `hospitals` - care providers with optional coordinates and push token
//! - `assignments` - live alert-to-hospital bindings, removed on serve
//! - `served_alerts` - permanent served history

pub mod alerts;
pub mod assignments;
pub mod hospitals;
pub mod schema;
pub mod users;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::models::{
    AlertWithStatus, Hospital, LiveAssignment, NewAlert, ServedAlert, ServedOutcome, UserRef,
};
use crate::types::{DispatchError, Result};

pub use alerts::Admission;

/// SQLite database handle shared by the pipeline task and the HTTP handlers.
pub struct DispatchDb {
    conn: Mutex<Connection>,
}

impl DispatchDb {
    /// Open or create the dispatch database
    pub fn open(db_path: &Path) -> Result<Self> {
        info!("Opening SQLite database at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // WAL keeps serve requests readable while the poll cycle writes
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        debug!("Opening in-memory SQLite database");

        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;

        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.with_conn(|conn| schema::init_schema(conn))
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DispatchError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&conn)
    }

    fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| DispatchError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&mut conn)
    }

    // === users ===

    /// Roster of monitored subjects, polled every cycle.
    pub fn list_users(&self) -> Result<Vec<UserRef>> {
        self.with_conn(users::list_users)
    }

    pub fn insert_user(&self, id: i64, name: &str) -> Result<()> {
        self.with_conn(|conn| users::insert_user(conn, id, name))
    }

    /// Last-write-wins notification-address update. Returns false when the
    /// user id is unknown.
    pub fn set_user_push_token(&self, id: i64, token: &str) -> Result<bool> {
        self.with_conn(|conn| users::set_push_token(conn, id, token))
    }

    // === hospitals ===

    pub fn list_hospitals(&self) -> Result<Vec<Hospital>> {
        self.with_conn(hospitals::list_hospitals)
    }

    pub fn insert_hospital(
        &self,
        id: i64,
        name: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<()> {
        self.with_conn(|conn| hospitals::insert_hospital(conn, id, name, latitude, longitude))
    }

    pub fn set_hospital_push_token(&self, id: i64, token: &str) -> Result<bool> {
        self.with_conn(|conn| hospitals::set_push_token(conn, id, token))
    }

    // === alerts ===

    /// Admit an alert into the ledger. A duplicate (user_id, alert_time) is
    /// reported as [`Admission::AlreadyExists`], not an error.
    pub fn admit_alert(&self, alert: &NewAlert) -> Result<Admission> {
        self.with_conn(|conn| alerts::admit_alert(conn, alert))
    }

    /// Ledger rows for one subject with derived status, newest first.
    pub fn alerts_for_user(&self, user_id: i64) -> Result<Vec<AlertWithStatus>> {
        self.with_conn(|conn| alerts::alerts_for_user(conn, user_id))
    }

    // === assignments ===

    pub fn create_assignment(
        &self,
        alert_id: i64,
        user_id: i64,
        hospital_id: i64,
        created_at: &str,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            assignments::create_assignment(conn, alert_id, user_id, hospital_id, created_at)
        })
    }

    /// Assigned -> Served. `None` when no live assignment matches; in that
    /// case nothing is written.
    pub fn serve_assignment(
        &self,
        assignment_id: i64,
        hospital_id: i64,
        served_at: &str,
    ) -> Result<Option<ServedOutcome>> {
        self.with_conn_mut(|conn| {
            assignments::serve_assignment(conn, assignment_id, hospital_id, served_at)
        })
    }

    pub fn live_assignments(&self, hospital_id: i64) -> Result<Vec<LiveAssignment>> {
        self.with_conn(|conn| assignments::live_assignments(conn, hospital_id))
    }

    pub fn served_alerts(&self, hospital_id: i64) -> Result<Vec<ServedAlert>> {
        self.with_conn(|conn| assignments::served_alerts(conn, hospital_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_schema_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dispatch.db");

        let db = DispatchDb::open(&path).unwrap();
        db.insert_user(1001, "Asha").unwrap();
        drop(db);

        // Reopen: schema init must be idempotent and data must survive
        let db = DispatchDb::open(&path).unwrap();
        let users = db.list_users().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].name, "Asha");
    }

    #[test]
    fn push_token_updates_are_last_write_wins() {
        let db = DispatchDb::open_in_memory().unwrap();
        db.insert_user(1001, "Asha").unwrap();

        assert!(db.set_user_push_token(1001, "ExponentPushToken[a]").unwrap());
        assert!(db.set_user_push_token(1001, "ExponentPushToken[b]").unwrap());

        let users = db.list_users().unwrap();
        assert_eq!(
            users[0].expo_push_token.as_deref(),
            Some("ExponentPushToken[b]")
        );

        // Unknown id is reported, not an error
        assert!(!db.set_user_push_token(9999, "ExponentPushToken[c]").unwrap());
    }
}
