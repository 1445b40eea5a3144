use fieldstore_core::db::{open_db_in_memory, share};
use fieldstore_core::{
    ItemId, ItemProvider, ItemRecord, ItemStore, ProviderConfig, SqliteBlobStore,
    SqliteItemStore, StoreResult, StructuralMetadata, ROOT_ITEM_ID,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

/// Item store that counts structural reads reaching the database.
struct CountingStore {
    inner: SqliteItemStore,
    structure_reads: AtomicUsize,
}

impl CountingStore {
    fn structure_reads(&self) -> usize {
        self.structure_reads.load(Ordering::SeqCst)
    }
}

impl ItemStore for CountingStore {
    fn ensure_indexes(&self) -> StoreResult<()> {
        self.inner.ensure_indexes()
    }

    fn count_items(&self) -> StoreResult<u64> {
        self.inner.count_items()
    }

    fn item_exists(&self, id: ItemId) -> StoreResult<bool> {
        self.inner.item_exists(id)
    }

    fn find_item(&self, id: ItemId) -> StoreResult<Option<ItemRecord>> {
        self.inner.find_item(id)
    }

    fn find_structure(&self, id: ItemId) -> StoreResult<Option<StructuralMetadata>> {
        self.structure_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.find_structure(id)
    }

    fn insert_item(&self, record: &ItemRecord) -> StoreResult<()> {
        self.inner.insert_item(record)
    }

    fn replace_item(&self, record: &ItemRecord) -> StoreResult<()> {
        self.inner.replace_item(record)
    }

    fn remove_item(&self, id: ItemId) -> StoreResult<usize> {
        self.inner.remove_item(id)
    }

    fn find_ids_by_parent(&self, parent_id: ItemId) -> StoreResult<Vec<ItemId>> {
        self.inner.find_ids_by_parent(parent_id)
    }

    fn find_ids_by_template(&self, template_id: ItemId) -> StoreResult<Vec<ItemId>> {
        self.inner.find_ids_by_template(template_id)
    }
}

fn provider(config: &ProviderConfig) -> ItemProvider<CountingStore, SqliteBlobStore> {
    let conn = share(open_db_in_memory().unwrap());
    let store = CountingStore {
        inner: SqliteItemStore::try_new(conn.clone()).unwrap(),
        structure_reads: AtomicUsize::new(0),
    };
    let blobs = SqliteBlobStore::try_new(conn).unwrap();
    ItemProvider::new(store, blobs, config).unwrap()
}

#[test]
fn second_definition_read_is_served_from_cache() {
    let provider = provider(&ProviderConfig::default());

    let first = provider.get_item_definition(ROOT_ITEM_ID).unwrap().unwrap();
    assert_eq!(provider.store().structure_reads(), 1);

    let second = provider.get_item_definition(ROOT_ITEM_ID).unwrap().unwrap();
    assert_eq!(second, first);
    assert_eq!(provider.get_parent_id(ROOT_ITEM_ID).unwrap(), Some(Uuid::nil()));
    assert_eq!(provider.store().structure_reads(), 1);
}

#[test]
fn created_item_is_cached_without_store_read() {
    let provider = provider(&ProviderConfig::default());
    let item = Uuid::new_v4();
    provider
        .create_item(item, "fresh", Uuid::new_v4(), Some(ROOT_ITEM_ID))
        .unwrap();

    let definition = provider.get_item_definition(item).unwrap().unwrap();
    assert_eq!(definition.name, "fresh");
    assert_eq!(provider.store().structure_reads(), 0);
}

#[test]
fn deleted_item_answers_from_negative_marker() {
    let provider = provider(&ProviderConfig::default());
    let item = Uuid::new_v4();
    provider
        .create_item(item, "doomed", Uuid::new_v4(), Some(ROOT_ITEM_ID))
        .unwrap();
    provider.delete_item(item).unwrap();

    assert!(provider.get_item_definition(item).unwrap().is_none());
    assert!(provider.get_parent_id(item).unwrap().is_none());
    assert_eq!(provider.store().structure_reads(), 0);
}

#[test]
fn missing_items_are_not_cached() {
    let provider = provider(&ProviderConfig::default());
    let missing = Uuid::new_v4();

    assert!(provider.get_item_definition(missing).unwrap().is_none());
    assert!(provider.get_item_definition(missing).unwrap().is_none());
    assert_eq!(provider.store().structure_reads(), 2);
}

#[test]
fn zero_budget_disables_caching() {
    let config = ProviderConfig {
        cache_size_bytes: 0,
        ..ProviderConfig::default()
    };
    let provider = provider(&config);

    provider.get_item_definition(ROOT_ITEM_ID).unwrap();
    provider.get_item_definition(ROOT_ITEM_ID).unwrap();

    assert!(!provider.structural_cache().is_enabled());
    assert_eq!(provider.store().structure_reads(), 2);
}

#[test]
fn invalidate_on_write_forces_reload_after_version_add() {
    let config = ProviderConfig {
        invalidate_on_write: true,
        ..ProviderConfig::default()
    };
    let provider = provider(&config);
    provider.get_item_definition(ROOT_ITEM_ID).unwrap();
    assert_eq!(provider.store().structure_reads(), 1);

    provider.add_version(ROOT_ITEM_ID, "en", Some(1)).unwrap();
    provider.get_item_definition(ROOT_ITEM_ID).unwrap();

    assert_eq!(provider.store().structure_reads(), 2);
}

#[test]
fn cache_is_built_once_with_configured_budget() {
    let config = ProviderConfig {
        cache_size_bytes: 4096,
        ..ProviderConfig::default()
    };
    let provider = provider(&config);

    let first: *const _ = provider.structural_cache();
    let second: *const _ = provider.structural_cache();
    assert_eq!(first, second);
    assert_eq!(provider.structural_cache().capacity_bytes(), 4096);
}
