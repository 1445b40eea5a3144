//! Item document store contract and SQLite implementation.
//!
//! # Responsibility
//! - Load and persist whole item documents.
//! - Answer structural projections and exact-match queries on parent and
//!   template without decoding field maps.
//!
//! # Invariants
//! - `replace_item` writes the full document in one statement.
//! - Child and template queries are served by the `parent_id` and
//!   `template_id` indexes.
//! - Query results keep document insertion order.

use crate::db::SharedConnection;
use crate::model::item::{FieldMap, FieldValueRecord, ItemId, ItemRecord, StructuralMetadata};
use crate::repo::schema::ensure_table_ready;
use crate::repo::{StoreError, StoreResult};
use log::warn;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::MutexGuard;
use uuid::Uuid;

const ITEM_COLUMNS: &[&str] = &[
    "id",
    "name",
    "template_id",
    "branch_id",
    "parent_id",
    "fields",
];

const STRUCTURE_SELECT_SQL: &str = "SELECT
    id,
    name,
    template_id,
    branch_id,
    parent_id
FROM items";

/// Document store holding one record per item.
pub trait ItemStore {
    /// Creates the `parent_id` and `template_id` indexes if missing.
    fn ensure_indexes(&self) -> StoreResult<()>;
    /// Number of stored items.
    fn count_items(&self) -> StoreResult<u64>;
    /// Whether a document with `id` exists.
    fn item_exists(&self, id: ItemId) -> StoreResult<bool>;
    /// Loads a full document, field map included.
    fn find_item(&self, id: ItemId) -> StoreResult<Option<ItemRecord>>;
    /// Loads the structural projection of one document.
    fn find_structure(&self, id: ItemId) -> StoreResult<Option<StructuralMetadata>>;
    /// Inserts a new document. Fails when `record.id` already exists.
    fn insert_item(&self, record: &ItemRecord) -> StoreResult<()>;
    /// Writes the full document, inserting it when absent.
    fn replace_item(&self, record: &ItemRecord) -> StoreResult<()>;
    /// Removes one document and returns how many were removed.
    fn remove_item(&self, id: ItemId) -> StoreResult<usize>;
    /// Ids of documents whose stored parent equals `parent_id`.
    fn find_ids_by_parent(&self, parent_id: ItemId) -> StoreResult<Vec<ItemId>>;
    /// Ids of documents whose stored template equals `template_id`.
    fn find_ids_by_template(&self, template_id: ItemId) -> StoreResult<Vec<ItemId>>;
}

/// SQLite-backed item document store.
pub struct SqliteItemStore {
    conn: SharedConnection,
}

impl SqliteItemStore {
    /// Creates a store from a migrated connection.
    pub fn try_new(conn: SharedConnection) -> StoreResult<Self> {
        {
            let guard = conn.lock().map_err(|_| StoreError::LockPoisoned)?;
            ensure_table_ready(&guard, "items", ITEM_COLUMNS)?;
        }
        Ok(Self { conn })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl ItemStore for SqliteItemStore {
    fn ensure_indexes(&self) -> StoreResult<()> {
        self.lock()?.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_items_parent_id ON items(parent_id);
             CREATE INDEX IF NOT EXISTS idx_items_template_id ON items(template_id);",
        )?;
        Ok(())
    }

    fn count_items(&self) -> StoreResult<u64> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM items;", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn item_exists(&self, id: ItemId) -> StoreResult<bool> {
        let exists: i64 = self.lock()?.query_row(
            "SELECT EXISTS(SELECT 1 FROM items WHERE id = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn find_item(&self, id: ItemId) -> StoreResult<Option<ItemRecord>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, name, template_id, branch_id, parent_id, fields
                 FROM items
                 WHERE id = ?1;",
                [id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>("fields")?,
                        read_structure_columns(row)?,
                    ))
                },
            )
            .optional()?;
        drop(conn);

        let Some((fields_json, columns)) = row else {
            return Ok(None);
        };
        let structure = columns.parse()?;
        let fields = decode_fields(structure.item_id, &fields_json)?;

        Ok(Some(ItemRecord {
            id: structure.item_id,
            name: structure.name,
            template_id: structure.template_id,
            branch_id: structure.branch_id,
            parent_id: structure.parent_id,
            fields,
        }))
    }

    fn find_structure(&self, id: ItemId) -> StoreResult<Option<StructuralMetadata>> {
        let columns = self
            .lock()?
            .query_row(
                &format!("{STRUCTURE_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                read_structure_columns,
            )
            .optional()?;
        columns.map(StructureColumns::parse).transpose()
    }

    fn insert_item(&self, record: &ItemRecord) -> StoreResult<()> {
        let fields_json = encode_fields(&record.fields)?;
        self.lock()?.execute(
            "INSERT INTO items (id, name, template_id, branch_id, parent_id, fields)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                record.id.to_string(),
                record.name.as_str(),
                record.template_id.to_string(),
                record.branch_id.to_string(),
                record.parent_id.to_string(),
                fields_json,
            ],
        )?;
        Ok(())
    }

    fn replace_item(&self, record: &ItemRecord) -> StoreResult<()> {
        let fields_json = encode_fields(&record.fields)?;
        self.lock()?.execute(
            "INSERT INTO items (id, name, template_id, branch_id, parent_id, fields)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                template_id = excluded.template_id,
                branch_id = excluded.branch_id,
                parent_id = excluded.parent_id,
                fields = excluded.fields;",
            params![
                record.id.to_string(),
                record.name.as_str(),
                record.template_id.to_string(),
                record.branch_id.to_string(),
                record.parent_id.to_string(),
                fields_json,
            ],
        )?;
        Ok(())
    }

    fn remove_item(&self, id: ItemId) -> StoreResult<usize> {
        let removed = self
            .lock()?
            .execute("DELETE FROM items WHERE id = ?1;", [id.to_string()])?;
        Ok(removed)
    }

    fn find_ids_by_parent(&self, parent_id: ItemId) -> StoreResult<Vec<ItemId>> {
        query_ids(
            &*self.lock()?,
            "SELECT id FROM items WHERE parent_id = ?1 ORDER BY rowid ASC;",
            parent_id,
        )
    }

    fn find_ids_by_template(&self, template_id: ItemId) -> StoreResult<Vec<ItemId>> {
        query_ids(
            &*self.lock()?,
            "SELECT id FROM items WHERE template_id = ?1 ORDER BY rowid ASC;",
            template_id,
        )
    }
}

/// Raw structural columns, parsed outside the rusqlite row callback.
struct StructureColumns {
    id: String,
    name: String,
    template_id: String,
    branch_id: String,
    parent_id: String,
}

impl StructureColumns {
    fn parse(self) -> StoreResult<StructuralMetadata> {
        Ok(StructuralMetadata {
            item_id: parse_uuid(&self.id, "items.id")?,
            parent_id: parse_uuid(&self.parent_id, "items.parent_id")?,
            name: self.name,
            template_id: parse_uuid(&self.template_id, "items.template_id")?,
            branch_id: parse_uuid(&self.branch_id, "items.branch_id")?,
        })
    }
}

fn read_structure_columns(row: &Row<'_>) -> rusqlite::Result<StructureColumns> {
    Ok(StructureColumns {
        id: row.get("id")?,
        name: row.get("name")?,
        template_id: row.get("template_id")?,
        branch_id: row.get("branch_id")?,
        parent_id: row.get("parent_id")?,
    })
}

fn query_ids(conn: &Connection, sql: &str, key: Uuid) -> StoreResult<Vec<ItemId>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([key.to_string()])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_uuid(&value, "items.id")?);
    }
    Ok(ids)
}

fn encode_fields(fields: &FieldMap) -> StoreResult<String> {
    serde_json::to_string(&fields.to_records())
        .map_err(|err| StoreError::InvalidData(format!("cannot encode field map: {err}")))
}

fn decode_fields(item_id: ItemId, json: &str) -> StoreResult<FieldMap> {
    let records: Vec<FieldValueRecord> = serde_json::from_str(json).map_err(|err| {
        StoreError::InvalidData(format!("invalid field map in items.fields for {item_id}: {err}"))
    })?;
    let (fields, duplicates) = FieldMap::from_records(records);
    for coordinate in duplicates {
        warn!(
            "event=field_map_duplicate module=repo status=ignored item_id={} coordinate={}",
            item_id, coordinate
        );
    }
    Ok(fields)
}

fn parse_uuid(value: &str, column: &'static str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}
