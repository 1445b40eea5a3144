//! Versioned field store for tree-structured content.
//!
//! Items live as one document each; their field values fan out over
//! (language, version) coordinates. The provider serves the operation set a
//! content-management host calls, backed by SQLite.

pub mod cache;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod versioning;

pub use cache::structural_cache::{CacheSlot, StructuralCache};
pub use config::{AppConfig, ConfigError, LogSettings, ProviderConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::coordinate::{FieldCoordinate, FieldId, VersionPoint};
pub use model::item::{
    FieldMap, ItemDefinition, ItemId, ItemRecord, StructuralMetadata, CREATED_FIELD_ID,
    DEFAULT_LANGUAGE, ROOT_ITEM_ID, ROOT_ITEM_NAME, ROOT_TEMPLATE_ID, TEMPLATE_TEMPLATE_ID,
};
pub use repo::blob_repo::{short_id, BlobMetadata, BlobStore, SqliteBlobStore};
pub use repo::item_repo::{ItemStore, SqliteItemStore};
pub use repo::{StoreError, StoreResult};
pub use service::provider::{ItemChanges, ItemProvider, ProviderError, ProviderResult};
pub use service::tree_navigator::TreeNavigator;
pub use versioning::mutation::{EditSummary, FieldEdit, PropertyChanges};

/// Provider over SQLite item and blob stores sharing one connection.
pub type SqliteItemProvider = ItemProvider<SqliteItemStore, SqliteBlobStore>;

/// Opens (or creates) the database at `path` and builds a provider on it.
pub fn open_provider(
    path: impl AsRef<std::path::Path>,
    config: &ProviderConfig,
) -> ProviderResult<SqliteItemProvider> {
    let conn = db::open_db(path).map_err(StoreError::from)?;
    provider_on(db::share(conn), config)
}

/// Builds a provider on a fresh in-memory database.
pub fn open_provider_in_memory(config: &ProviderConfig) -> ProviderResult<SqliteItemProvider> {
    let conn = db::open_db_in_memory().map_err(StoreError::from)?;
    provider_on(db::share(conn), config)
}

fn provider_on(
    conn: db::SharedConnection,
    config: &ProviderConfig,
) -> ProviderResult<SqliteItemProvider> {
    let store = SqliteItemStore::try_new(conn.clone())?;
    let blobs = SqliteBlobStore::try_new(conn)?;
    ItemProvider::new(store, blobs, config)
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
