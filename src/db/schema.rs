//! Database schema definitions

use rusqlite::Connection;
use tracing::info;

use crate::types::Result;

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Creating new database schema v{}", SCHEMA_VERSION);
        create_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!(
            "Migrating schema from v{} to v{}",
            current_version, SCHEMA_VERSION
        );
        migrate_schema(conn, current_version)?;
    }

    Ok(())
}

/// Get current schema version (0 if not initialized)
fn get_schema_version(conn: &Connection) -> Result<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )?;

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?)", [version])?;
    Ok(())
}

fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(DISPATCH_SCHEMA)?;
    Ok(())
}

/// Migrate schema from older version
fn migrate_schema(conn: &Connection, _from_version: i32) -> Result<()> {
    // Migration steps go here as the schema evolves
    set_schema_version(conn, SCHEMA_VERSION)?;
    Ok(())
}

const DISPATCH_SCHEMA: &str = r#"
-- Monitored subjects. Rows are created by the external account flow;
-- this service only reads them and updates push tokens.
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    expo_push_token TEXT
);

-- Append-only alert ledger. Rows are never updated or deleted.
-- The UNIQUE constraint is the admission dedup signal: a second insert
-- for the same (user_id, alert_time) reports a conflict, not a new row.
CREATE TABLE IF NOT EXISTS alerts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    alert_type TEXT NOT NULL,
    alert_value REAL NOT NULL,
    alert_time TEXT NOT NULL,
    gps_lat REAL NOT NULL,
    gps_lon REAL NOT NULL,
    UNIQUE (user_id, alert_time),
    FOREIGN KEY (user_id) REFERENCES users(id)
);

-- Hospitals. Coordinates and push token are filled in by the hospital's
-- own registration flow; nullable until then.
CREATE TABLE IF NOT EXISTS hospitals (
    id INTEGER PRIMARY KEY,
    hospital_name TEXT NOT NULL,
    incharge_name TEXT,
    address TEXT,
    contact TEXT,
    latitude REAL,
    longitude REAL,
    expo_push_token TEXT
);

-- Live alert-to-hospital bindings. At most one per alert; the row is
-- deleted when the alert is served.
CREATE TABLE IF NOT EXISTS assignments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    alert_id INTEGER NOT NULL UNIQUE,
    user_id INTEGER NOT NULL,
    hospital_id INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (alert_id) REFERENCES alerts(id),
    FOREIGN KEY (hospital_id) REFERENCES hospitals(id)
);

-- Permanent served history.
CREATE TABLE IF NOT EXISTS served_alerts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    alert_id INTEGER NOT NULL,
    user_id INTEGER NOT NULL,
    hospital_id INTEGER NOT NULL,
    served_at TEXT NOT NULL,
    FOREIGN KEY (alert_id) REFERENCES alerts(id),
    FOREIGN KEY (hospital_id) REFERENCES hospitals(id)
);

CREATE INDEX IF NOT EXISTS idx_alerts_user ON alerts(user_id);
CREATE INDEX IF NOT EXISTS idx_assignments_hospital ON assignments(hospital_id);
CREATE INDEX IF NOT EXISTS idx_served_hospital ON served_alerts(hospital_id);
"#;
