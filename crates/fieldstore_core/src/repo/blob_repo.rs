//! Blob store contract and SQLite implementation.
//!
//! # Responsibility
//! - Store opaque binary payloads addressed by blob id.
//! - Record a SHA-256 content hash and size next to every payload.
//!
//! # Invariants
//! - Blobs are keyed by `short_id(blob_id)`.
//! - Writing an existing key replaces the previous payload.

use crate::db::SharedConnection;
use crate::repo::schema::ensure_table_ready;
use crate::repo::{StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::sync::MutexGuard;
use uuid::Uuid;

const BLOB_COLUMNS: &[&str] = &["blob_key", "data", "content_hash", "size", "created_at"];

/// Metadata recorded for a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMetadata {
    pub blob_key: String,
    /// Lower-case hex SHA-256 of the payload.
    pub content_hash: String,
    pub size: u64,
}

/// Store for binary payloads referenced by item fields.
pub trait BlobStore {
    fn blob_exists(&self, blob_id: Uuid) -> StoreResult<bool>;
    fn read_blob(&self, blob_id: Uuid) -> StoreResult<Option<Vec<u8>>>;
    /// Drains `reader` and stores its bytes under `blob_id`.
    fn write_blob(&self, blob_id: Uuid, reader: &mut dyn Read) -> StoreResult<BlobMetadata>;
}

/// Renders `blob_id` as 32 upper-case hex digits without separators.
pub fn short_id(blob_id: Uuid) -> String {
    format!("{:X}", blob_id.simple())
}

/// SQLite-backed blob store.
pub struct SqliteBlobStore {
    conn: SharedConnection,
}

impl SqliteBlobStore {
    /// Creates a store from a migrated connection.
    pub fn try_new(conn: SharedConnection) -> StoreResult<Self> {
        {
            let guard = conn.lock().map_err(|_| StoreError::LockPoisoned)?;
            ensure_table_ready(&guard, "blobs", BLOB_COLUMNS)?;
        }
        Ok(Self { conn })
    }

    /// Loads stored metadata without reading the payload.
    pub fn metadata(&self, blob_id: Uuid) -> StoreResult<Option<BlobMetadata>> {
        let row = self
            .lock()?
            .query_row(
                "SELECT blob_key, content_hash, size FROM blobs WHERE blob_key = ?1;",
                [short_id(blob_id)],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(blob_key, content_hash, size)| {
            let size = u64::try_from(size).map_err(|_| {
                StoreError::InvalidData(format!("invalid size `{size}` in blobs.size"))
            })?;
            Ok(BlobMetadata {
                blob_key,
                content_hash,
                size,
            })
        })
        .transpose()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl BlobStore for SqliteBlobStore {
    fn blob_exists(&self, blob_id: Uuid) -> StoreResult<bool> {
        let exists: i64 = self.lock()?.query_row(
            "SELECT EXISTS(SELECT 1 FROM blobs WHERE blob_key = ?1);",
            [short_id(blob_id)],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn read_blob(&self, blob_id: Uuid) -> StoreResult<Option<Vec<u8>>> {
        let data = self
            .lock()?
            .query_row(
                "SELECT data FROM blobs WHERE blob_key = ?1;",
                [short_id(blob_id)],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(data)
    }

    fn write_blob(&self, blob_id: Uuid, reader: &mut dyn Read) -> StoreResult<BlobMetadata> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        let metadata = BlobMetadata {
            blob_key: short_id(blob_id),
            content_hash: hex_digest(&data),
            size: data.len() as u64,
        };

        self.lock()?.execute(
            "INSERT INTO blobs (blob_key, data, content_hash, size)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(blob_key) DO UPDATE SET
                data = excluded.data,
                content_hash = excluded.content_hash,
                size = excluded.size;",
            params![
                metadata.blob_key.as_str(),
                data,
                metadata.content_hash.as_str(),
                metadata.size as i64,
            ],
        )?;

        Ok(metadata)
    }
}

fn hex_digest(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
