//! Monitored-subject roster operations

use rusqlite::{params, Connection};

use crate::models::UserRef;
use crate::types::Result;

/// All monitored subjects. The poll cycle iterates this every tick, so
/// subjects added by the external account flow are picked up without a
/// restart.
pub fn list_users(conn: &Connection) -> Result<Vec<UserRef>> {
    let mut stmt = conn.prepare("SELECT id, name, expo_push_token FROM users ORDER BY id")?;

    let users = stmt
        .query_map([], |row| {
            Ok(UserRef {
                id: row.get(0)?,
                name: row.get(1)?,
                expo_push_token: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(users)
}

pub fn insert_user(conn: &Connection, id: i64, name: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, name) VALUES (?, ?)",
        params![id, name],
    )?;
    Ok(())
}

/// Returns false when no row matched the id.
pub fn set_push_token(conn: &Connection, id: i64, token: &str) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE users SET expo_push_token = ? WHERE id = ?",
        params![token, id],
    )?;
    Ok(changed > 0)
}
