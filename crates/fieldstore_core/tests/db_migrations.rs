use fieldstore_core::db::migrations::latest_version;
use fieldstore_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "items");
    assert_table_exists(&conn, "blobs");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fieldstore.db");

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute(
            "INSERT INTO items (id, name, template_id, branch_id, parent_id)
             VALUES ('a', 'kept', 't', 'b', 'p');",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let name: String = conn_second
        .query_row("SELECT name FROM items WHERE id = 'a';", [], |row| row.get(0))
        .unwrap();
    assert_eq!(name, "kept");
}

#[test]
fn items_fields_column_defaults_to_empty_array() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO items (id, name, template_id, branch_id, parent_id)
         VALUES ('a', 'bare', 't', 'b', 'p');",
        [],
    )
    .unwrap();

    let fields: String = conn
        .query_row("SELECT fields FROM items WHERE id = 'a';", [], |row| row.get(0))
        .unwrap();
    assert_eq!(fields, "[]");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
