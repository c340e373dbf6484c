//! Hospital roster operations
//!
//! Hospitals register themselves (coordinates, push token) through an
//! external flow; the pipeline reads them and the API updates push tokens.

use rusqlite::{params, Connection};

use crate::models::Hospital;
use crate::types::Result;

pub fn list_hospitals(conn: &Connection) -> Result<Vec<Hospital>> {
    let mut stmt = conn.prepare(
        "SELECT id, hospital_name, latitude, longitude, expo_push_token
         FROM hospitals ORDER BY id",
    )?;

    let hospitals = stmt
        .query_map([], |row| {
            Ok(Hospital {
                id: row.get(0)?,
                hospital_name: row.get(1)?,
                latitude: row.get(2)?,
                longitude: row.get(3)?,
                expo_push_token: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(hospitals)
}

pub fn insert_hospital(
    conn: &Connection,
    id: i64,
    name: &str,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO hospitals (id, hospital_name, latitude, longitude) VALUES (?, ?, ?, ?)",
        params![id, name, latitude, longitude],
    )?;
    Ok(())
}

/// Returns false when no row matched the id.
pub fn set_push_token(conn: &Connection, id: i64, token: &str) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE hospitals SET expo_push_token = ? WHERE id = ?",
        params![token, id],
    )?;
    Ok(changed > 0)
}
