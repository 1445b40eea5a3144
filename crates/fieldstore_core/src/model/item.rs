//! Stored item document and its structural projections.
//!
//! # Responsibility
//! - Define the one-document-per-item record persisted by the item store.
//! - Define the insertion-ordered field map and its wire records.
//! - Define the structural projections served from the cache.
//!
//! # Invariants
//! - Field map keys are unique by structural coordinate equality.
//! - A nil `parent_id` is the "no parent" sentinel.
//! - Field slots belong to exactly one item; maps are never shared.

use crate::model::coordinate::{FieldCoordinate, FieldId, VersionPoint};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one tree item.
pub type ItemId = Uuid;

/// Identity of the bootstrap root item.
pub const ROOT_ITEM_ID: ItemId = Uuid::from_u128(0x11111111_1111_1111_1111_111111111111);
/// Name given to the bootstrap root item.
pub const ROOT_ITEM_NAME: &str = "sitecore";
/// Template assigned to the bootstrap root item.
pub const ROOT_TEMPLATE_ID: ItemId = Uuid::from_u128(0xc6576836_910c_4a3d_ba03_c277dbd3b827);
/// Template shared by every item that is itself a template definition.
pub const TEMPLATE_TEMPLATE_ID: ItemId = Uuid::from_u128(0xab86861a_6030_46c5_b394_e8f99e8b87db);
/// Marker field seeded into every freshly allocated version.
pub const CREATED_FIELD_ID: FieldId = Uuid::from_u128(0x25bed78c_4957_4165_998a_ca1b52f67497);
/// Language used for the bootstrap root version.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Insertion-ordered map from field slot to raw string value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    entries: IndexMap<FieldCoordinate, String>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, coordinate: &FieldCoordinate) -> Option<&str> {
        self.entries.get(coordinate).map(String::as_str)
    }

    pub fn contains(&self, coordinate: &FieldCoordinate) -> bool {
        self.entries.contains_key(coordinate)
    }

    /// Inserts or overwrites one slot. An existing key keeps its position.
    ///
    /// Returns the previous value, if any.
    pub fn insert(&mut self, coordinate: FieldCoordinate, value: impl Into<String>) -> Option<String> {
        self.entries.insert(coordinate, value.into())
    }

    /// Removes one slot, preserving the order of the remaining ones.
    pub fn remove(&mut self, coordinate: &FieldCoordinate) -> Option<String> {
        self.entries.shift_remove(coordinate)
    }

    /// Iterates slots in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldCoordinate, &str)> {
        self.entries
            .iter()
            .map(|(coordinate, value)| (coordinate, value.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &FieldCoordinate> {
        self.entries.keys()
    }

    /// Iterates slots visible from `point`, in insertion order.
    pub fn matching<'a>(
        &'a self,
        point: &'a VersionPoint,
    ) -> impl Iterator<Item = (&'a FieldCoordinate, &'a str)> + 'a {
        self.iter()
            .filter(move |(coordinate, _)| coordinate.matches(point))
    }

    /// Converts the map into its persisted array form.
    pub fn to_records(&self) -> Vec<FieldValueRecord> {
        self.iter()
            .map(|(coordinate, value)| FieldValueRecord {
                field_id: coordinate.field_id(),
                language: coordinate.language().map(str::to_string),
                version: coordinate.version(),
                value: value.to_string(),
            })
            .collect()
    }

    /// Rebuilds a map from its persisted array form.
    ///
    /// Returns the map and the duplicate coordinates that were dropped; the
    /// first record for a coordinate wins.
    pub fn from_records(records: Vec<FieldValueRecord>) -> (Self, Vec<FieldCoordinate>) {
        let mut map = Self::new();
        let mut duplicates = Vec::new();
        for record in records {
            let coordinate =
                FieldCoordinate::new(record.field_id, record.language.as_deref(), record.version);
            if map.contains(&coordinate) {
                duplicates.push(coordinate);
                continue;
            }
            map.insert(coordinate, record.value);
        }
        (map, duplicates)
    }
}

impl FromIterator<(FieldCoordinate, String)> for FieldMap {
    fn from_iter<T: IntoIterator<Item = (FieldCoordinate, String)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Persisted shape of one field slot.
///
/// The map is stored as an array of these records rather than a native map so
/// that composite keys survive serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValueRecord {
    pub field_id: FieldId,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub version: Option<i32>,
    pub value: String,
}

/// Stored representation of one tree item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    pub id: ItemId,
    pub name: String,
    pub template_id: ItemId,
    /// Nil when the item was not created from a branch.
    pub branch_id: ItemId,
    /// Nil for items at the top of this store's tree.
    pub parent_id: ItemId,
    pub fields: FieldMap,
}

impl ItemRecord {
    /// Creates a bare record without any field slots.
    pub fn new(
        id: ItemId,
        name: impl Into<String>,
        template_id: ItemId,
        parent_id: Option<ItemId>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            template_id,
            branch_id: Uuid::nil(),
            parent_id: parent_id.unwrap_or_else(Uuid::nil),
            fields: FieldMap::new(),
        }
    }

    /// Returns the record without its field map.
    pub fn structure(&self) -> StructuralMetadata {
        StructuralMetadata {
            item_id: self.id,
            parent_id: self.parent_id,
            name: self.name.clone(),
            template_id: self.template_id,
            branch_id: self.branch_id,
        }
    }

    pub fn definition(&self) -> ItemDefinition {
        self.structure().definition()
    }
}

impl Display for ItemRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Structural projection of an item, cached for tree navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralMetadata {
    pub item_id: ItemId,
    pub parent_id: ItemId,
    pub name: String,
    pub template_id: ItemId,
    pub branch_id: ItemId,
}

impl StructuralMetadata {
    /// Approximate in-memory footprint, used as cache weight.
    pub fn data_length(&self) -> u64 {
        const ID_BYTES: u64 = 16;
        const ENTRY_OVERHEAD: u64 = 48;
        4 * ID_BYTES + ENTRY_OVERHEAD + self.name.len() as u64
    }

    /// Host-facing view of this item.
    pub fn definition(&self) -> ItemDefinition {
        ItemDefinition {
            id: self.item_id,
            name: self.name.clone(),
            template_id: self.template_id,
            branch_id: self.branch_id,
        }
    }
}

/// Item identity as handed back to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub id: ItemId,
    pub name: String,
    pub template_id: ItemId,
    pub branch_id: ItemId,
}

#[cfg(test)]
mod tests {
    use super::{FieldMap, FieldValueRecord, ItemRecord, ROOT_ITEM_ID};
    use crate::model::coordinate::{FieldCoordinate, VersionPoint};
    use uuid::Uuid;

    #[test]
    fn well_known_ids_render_as_expected() {
        assert_eq!(
            ROOT_ITEM_ID.to_string(),
            "11111111-1111-1111-1111-111111111111"
        );
    }

    #[test]
    fn overwrite_keeps_insertion_position() {
        let a = FieldCoordinate::new(Uuid::new_v4(), Some("en"), Some(1));
        let b = FieldCoordinate::new(Uuid::new_v4(), Some("en"), Some(1));
        let mut map = FieldMap::new();
        map.insert(a.clone(), "one");
        map.insert(b.clone(), "two");
        map.insert(a.clone(), "uno");

        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec![a.clone(), b]);
        assert_eq!(map.get(&a), Some("uno"));
    }

    #[test]
    fn from_records_keeps_first_duplicate() {
        let field = Uuid::new_v4();
        let record = |value: &str| FieldValueRecord {
            field_id: field,
            language: Some("en".to_string()),
            version: Some(1),
            value: value.to_string(),
        };

        let (map, duplicates) = FieldMap::from_records(vec![record("first"), record("second")]);
        assert_eq!(map.len(), 1);
        assert_eq!(duplicates.len(), 1);
        assert_eq!(
            map.get(&FieldCoordinate::new(field, Some("en"), Some(1))),
            Some("first")
        );
    }

    #[test]
    fn matching_filters_by_point() {
        let field = Uuid::new_v4();
        let mut map = FieldMap::new();
        map.insert(FieldCoordinate::shared(field), "shared");
        map.insert(FieldCoordinate::new(field, Some("en"), Some(1)), "en-1");
        map.insert(FieldCoordinate::new(field, Some("de"), Some(1)), "de-1");

        let point = VersionPoint::new("en", 1);
        let values: Vec<_> = map.matching(&point).map(|(_, value)| value).collect();
        assert_eq!(values, vec!["shared", "en-1"]);
    }

    #[test]
    fn new_record_uses_nil_parent_sentinel() {
        let record = ItemRecord::new(Uuid::new_v4(), "home", Uuid::new_v4(), None);
        assert!(record.parent_id.is_nil());
        assert!(record.branch_id.is_nil());
        assert!(record.fields.is_empty());
    }
}
