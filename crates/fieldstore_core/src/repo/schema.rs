//! Schema readiness checks shared by the SQLite stores.

use crate::db::migrations::{current_user_version, latest_version};
use crate::repo::{StoreError, StoreResult};
use rusqlite::Connection;

/// Verifies `conn` is migrated and `table` carries every column in `columns`.
pub(crate) fn ensure_table_ready(
    conn: &Connection,
    table: &'static str,
    columns: &[&'static str],
) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, table)? {
        return Err(StoreError::MissingRequiredTable(table));
    }

    let present = table_columns(conn, table)?;
    if let Some(column) = columns
        .iter()
        .copied()
        .find(|column| !present.iter().any(|name| name == column))
    {
        return Err(StoreError::MissingRequiredColumn { table, column });
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get(1)?);
    }
    Ok(columns)
}
