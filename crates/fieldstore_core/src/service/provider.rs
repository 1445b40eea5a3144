//! Item provider facade.
//!
//! # Responsibility
//! - Expose the read/write operation set a content-management host calls.
//! - Bootstrap an empty store with the well-known root item.
//! - Serve structural reads through a lazily built structural cache.
//!
//! # Invariants
//! - Existence preconditions are checked before any write.
//! - Every write persists the whole item document once.
//! - `save_item`/`add_version` leave cached structure untouched unless
//!   `invalidate_on_write` is configured; cached reads may then be stale.
//! - Store errors are propagated, never retried.

use crate::cache::structural_cache::{CacheSlot, StructuralCache};
use crate::config::{ConfigError, ProviderConfig};
use crate::model::coordinate::{FieldId, VersionPoint};
use crate::model::item::{
    ItemDefinition, ItemId, ItemRecord, StructuralMetadata, DEFAULT_LANGUAGE, ROOT_ITEM_ID,
    ROOT_ITEM_NAME, ROOT_TEMPLATE_ID,
};
use crate::repo::blob_repo::{BlobMetadata, BlobStore};
use crate::repo::item_repo::ItemStore;
use crate::repo::StoreError;
use crate::service::tree_navigator::TreeNavigator;
use crate::versioning::mutation::{apply_field_edits, apply_property_edits, FieldEdit, PropertyChanges};
use crate::versioning::resolver::{list_versions, next_version};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Read;
use uuid::Uuid;

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors from provider operations.
#[derive(Debug)]
pub enum ProviderError {
    /// Item (or declared parent) required by the operation does not exist.
    NotFound(ItemId),
    /// Item to create already exists.
    AlreadyExists(ItemId),
    /// Underlying store failed.
    StoreUnavailable(StoreError),
    /// Malformed construction argument.
    InvalidArgument(String),
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "item not found: {id}"),
            Self::AlreadyExists(id) => write!(f, "item already exists: {id}"),
            Self::StoreUnavailable(err) => write!(f, "store unavailable: {err}"),
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
        }
    }
}

impl Error for ProviderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StoreUnavailable(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ProviderError {
    fn from(value: StoreError) -> Self {
        Self::StoreUnavailable(value)
    }
}

impl From<ConfigError> for ProviderError {
    fn from(value: ConfigError) -> Self {
        Self::InvalidArgument(value.to_string())
    }
}

/// Pending changes to one item, as tracked by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemChanges {
    /// Host's current view of the item; fallback for omitted properties.
    pub current: Option<ItemDefinition>,
    /// Set when any item property changed.
    pub properties: Option<PropertyChanges>,
    pub fields: Vec<FieldEdit>,
}

impl ItemChanges {
    pub fn fields(fields: Vec<FieldEdit>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_none() && self.fields.is_empty()
    }
}

/// Versioned item provider over an item store and a blob store.
pub struct ItemProvider<S: ItemStore, B: BlobStore> {
    store: S,
    blobs: B,
    navigator: TreeNavigator,
    cache_size_bytes: u64,
    invalidate_on_write: bool,
    cache: OnceCell<StructuralCache>,
}

impl<S: ItemStore, B: BlobStore> ItemProvider<S, B> {
    /// Binds the stores, ensures indexes, and seeds an empty store with the
    /// root item.
    ///
    /// # Errors
    /// - `InvalidArgument` when the join-parent identity is malformed.
    /// - `StoreUnavailable` when indexing or bootstrap fails.
    pub fn new(store: S, blobs: B, config: &ProviderConfig) -> ProviderResult<Self> {
        let join_parent = config.join_parent()?;
        let provider = Self {
            store,
            blobs,
            navigator: TreeNavigator::new(join_parent),
            cache_size_bytes: config.cache_size_bytes,
            invalidate_on_write: config.invalidate_on_write,
            cache: OnceCell::new(),
        };

        provider.store.ensure_indexes()?;
        if let Err(err) = provider.ensure_not_empty() {
            error!(
                "event=store_bootstrap module=service status=error error={}",
                err
            );
            return Err(err);
        }
        Ok(provider)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    pub fn join_parent_id(&self) -> ItemId {
        self.navigator.join_parent()
    }

    /// Returns the structural cache, building it on first use.
    pub fn structural_cache(&self) -> &StructuralCache {
        self.cache.get_or_init(|| {
            info!(
                "event=cache_init module=service status=ok capacity_bytes={}",
                self.cache_size_bytes
            );
            StructuralCache::new(self.cache_size_bytes)
        })
    }

    /// Name, template and branch of `item_id`, if it exists.
    pub fn get_item_definition(&self, item_id: ItemId) -> ProviderResult<Option<ItemDefinition>> {
        Ok(self
            .structure(item_id)?
            .map(|structure| structure.definition()))
    }

    /// Distinct (language, version) points of `item_id`.
    pub fn get_item_versions(&self, item_id: ItemId) -> ProviderResult<Option<Vec<VersionPoint>>> {
        Ok(self
            .store
            .find_item(item_id)?
            .map(|record| list_versions(&record)))
    }

    /// Field values of `item_id` visible at `point`.
    ///
    /// When several visible slots belong to one field, the most specific slot
    /// wins; ties go to the slot stored first.
    pub fn get_item_fields(
        &self,
        item_id: ItemId,
        point: &VersionPoint,
    ) -> ProviderResult<Option<BTreeMap<FieldId, String>>> {
        let Some(record) = self.store.find_item(item_id)? else {
            return Ok(None);
        };

        let mut visible: BTreeMap<FieldId, (u8, &str)> = BTreeMap::new();
        for (coordinate, value) in record.fields.matching(point) {
            let rank = coordinate.specificity();
            let replace = visible
                .get(&coordinate.field_id())
                .map_or(true, |(current_rank, _)| rank > *current_rank);
            if replace {
                visible.insert(coordinate.field_id(), (rank, value));
            }
        }

        Ok(Some(
            visible
                .into_iter()
                .map(|(field_id, (_, value))| (field_id, value.to_string()))
                .collect(),
        ))
    }

    pub fn get_child_ids(&self, item_id: ItemId) -> ProviderResult<Vec<ItemId>> {
        Ok(self.navigator.children(&self.store, item_id)?)
    }

    /// Parent of `item_id`; top-level items report the join parent.
    pub fn get_parent_id(&self, item_id: ItemId) -> ProviderResult<Option<ItemId>> {
        Ok(self
            .structure(item_id)?
            .map(|structure| self.navigator.parent_of(&structure)))
    }

    /// Creates a bare item without versions or field values.
    ///
    /// A declared parent must exist in this store; `None` creates a top-level
    /// item.
    pub fn create_item(
        &self,
        item_id: ItemId,
        name: &str,
        template_id: ItemId,
        parent_id: Option<ItemId>,
    ) -> ProviderResult<()> {
        if self.store.item_exists(item_id)? {
            return Err(ProviderError::AlreadyExists(item_id));
        }

        if let Some(parent_id) = parent_id {
            if !self.store.item_exists(parent_id)? {
                return Err(ProviderError::NotFound(parent_id));
            }
        }

        let record = ItemRecord::new(item_id, name, template_id, parent_id);
        self.store.insert_item(&record)?;
        self.structural_cache()
            .put(item_id, CacheSlot::Present(record.structure()));

        info!(
            "event=item_create module=service status=ok item_id={} template_id={} parent_id={}",
            item_id, template_id, record.parent_id
        );
        Ok(())
    }

    /// Adds a version in `language`, branching from `base_version` when it
    /// exists, and returns the new version number.
    pub fn add_version(
        &self,
        item_id: ItemId,
        language: &str,
        base_version: Option<i32>,
    ) -> ProviderResult<i32> {
        let mut record = self
            .store
            .find_item(item_id)?
            .ok_or(ProviderError::NotFound(item_id))?;

        let base = VersionPoint::scope(Some(language), base_version);
        let number = next_version(&mut record, &base);
        self.store.replace_item(&record)?;
        self.after_write(item_id);

        info!(
            "event=version_add module=service status=ok item_id={} base={} version={}",
            item_id, base, number
        );
        Ok(number)
    }

    /// Removes `item_id`. Fails with `NotFound` unless exactly one document
    /// was removed.
    pub fn delete_item(&self, item_id: ItemId) -> ProviderResult<()> {
        let removed = self.store.remove_item(item_id)?;
        if removed != 1 {
            return Err(ProviderError::NotFound(item_id));
        }
        self.structural_cache().put(item_id, CacheSlot::Absent);

        info!(
            "event=item_delete module=service status=ok item_id={}",
            item_id
        );
        Ok(())
    }

    /// Applies property and field changes and persists the item once.
    pub fn save_item(&self, item_id: ItemId, changes: &ItemChanges) -> ProviderResult<()> {
        let mut record = self
            .store
            .find_item(item_id)?
            .ok_or(ProviderError::NotFound(item_id))?;

        if changes.is_empty() {
            return Ok(());
        }

        if let Some(properties) = &changes.properties {
            apply_property_edits(&mut record, properties, changes.current.as_ref());
        }
        let summary = apply_field_edits(&mut record.fields, &changes.fields);

        self.store.replace_item(&record)?;
        self.after_write(item_id);

        info!(
            "event=item_save module=service status=ok item_id={} properties_changed={} inserted={} updated={} removed={}",
            item_id,
            changes.properties.is_some(),
            summary.inserted,
            summary.updated,
            summary.removed
        );
        Ok(())
    }

    /// Ids of every template definition item.
    pub fn get_template_item_ids(&self) -> ProviderResult<Vec<ItemId>> {
        Ok(self.navigator.template_item_ids(&self.store)?)
    }

    pub fn get_root_id(&self) -> ItemId {
        self.navigator.root()
    }

    pub fn blob_exists(&self, blob_id: Uuid) -> ProviderResult<bool> {
        Ok(self.blobs.blob_exists(blob_id)?)
    }

    pub fn read_blob(&self, blob_id: Uuid) -> ProviderResult<Option<Vec<u8>>> {
        Ok(self.blobs.read_blob(blob_id)?)
    }

    pub fn write_blob(&self, blob_id: Uuid, reader: &mut dyn Read) -> ProviderResult<BlobMetadata> {
        let metadata = self.blobs.write_blob(blob_id, reader)?;
        info!(
            "event=blob_write module=service status=ok blob_key={} size={}",
            metadata.blob_key, metadata.size
        );
        Ok(metadata)
    }

    fn structure(&self, item_id: ItemId) -> ProviderResult<Option<StructuralMetadata>> {
        let cache = self.structural_cache();
        match cache.get(&item_id) {
            Some(CacheSlot::Present(structure)) => return Ok(Some(structure)),
            Some(CacheSlot::Absent) => return Ok(None),
            None => {}
        }

        let Some(structure) = self.store.find_structure(item_id)? else {
            return Ok(None);
        };
        cache.put(item_id, CacheSlot::Present(structure.clone()));
        Ok(Some(structure))
    }

    fn after_write(&self, item_id: ItemId) {
        if self.invalidate_on_write {
            self.structural_cache().remove(&item_id);
        }
    }

    fn ensure_not_empty(&self) -> ProviderResult<()> {
        if self.store.count_items()? > 0 {
            return Ok(());
        }

        let root = ItemRecord::new(ROOT_ITEM_ID, ROOT_ITEM_NAME, ROOT_TEMPLATE_ID, None);
        self.store.insert_item(&root)?;
        let version = self.add_version(ROOT_ITEM_ID, DEFAULT_LANGUAGE, None)?;

        info!(
            "event=store_bootstrap module=service status=ok root_id={} version={}",
            ROOT_ITEM_ID, version
        );
        Ok(())
    }
}
