//! Batched field and property edits.
//!
//! # Responsibility
//! - Resolve each field edit to the slot it targets and add, update, or remove
//!   that slot.
//! - Apply item property changes with fallback to the caller's current view.
//!
//! # Invariants
//! - Updating a slot never changes its coordinate or its position.
//! - An edit targets the exact slot of its effective coordinate when that slot
//!   exists; otherwise the first visible slot of the same field.
//! - Removing a slot that does not exist is a no-op.

use crate::model::coordinate::{FieldCoordinate, FieldId, VersionPoint};
use crate::model::item::{FieldMap, ItemDefinition, ItemId, ItemRecord};
use serde::{Deserialize, Serialize};

/// One requested change to one field slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEdit {
    pub field_id: FieldId,
    pub language: Option<String>,
    pub version: Option<i32>,
    pub value: String,
    /// Remove the targeted slot instead of writing `value`.
    pub remove: bool,
    /// Field has no language axis.
    pub shared: bool,
    /// Field has no version axis.
    pub unversioned: bool,
}

impl FieldEdit {
    /// Writes `value` into `field_id` at (`language`, `version`).
    pub fn set(
        field_id: FieldId,
        language: Option<&str>,
        version: Option<i32>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field_id,
            language: language.map(str::to_string),
            version,
            value: value.into(),
            remove: false,
            shared: false,
            unversioned: false,
        }
    }

    /// Removes `field_id` at (`language`, `version`).
    pub fn remove(field_id: FieldId, language: Option<&str>, version: Option<i32>) -> Self {
        Self {
            remove: true,
            ..Self::set(field_id, language, version, String::new())
        }
    }

    /// Marks the field as shared across languages.
    pub fn shared(mut self) -> Self {
        self.shared = true;
        self
    }

    /// Marks the field as shared across versions.
    pub fn unversioned(mut self) -> Self {
        self.unversioned = true;
        self
    }

    /// Scope the edit applies to once field sharing flags are taken into account.
    pub fn effective_scope(&self) -> VersionPoint {
        let language = if self.shared {
            None
        } else {
            self.language.as_deref()
        };
        let version = if self.unversioned { None } else { self.version };
        VersionPoint::scope(language, version)
    }
}

/// Item property changes. `None` means "use the caller's current value".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyChanges {
    pub name: Option<String>,
    pub template_id: Option<ItemId>,
    pub branch_id: Option<ItemId>,
}

/// Counts of slot changes performed by one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditSummary {
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
}

impl EditSummary {
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.removed
    }
}

/// Applies `edits` in order to `fields`.
pub fn apply_field_edits(fields: &mut FieldMap, edits: &[FieldEdit]) -> EditSummary {
    let mut summary = EditSummary::default();
    for edit in edits {
        let scope = edit.effective_scope();
        let target = find_target(fields, edit.field_id, &scope);

        match (edit.remove, target) {
            (true, Some(coordinate)) => {
                fields.remove(&coordinate);
                summary.removed += 1;
            }
            (true, None) => {}
            (false, Some(coordinate)) => {
                fields.insert(coordinate, edit.value.clone());
                summary.updated += 1;
            }
            (false, None) => {
                fields.insert(FieldCoordinate::at(edit.field_id, &scope), edit.value.clone());
                summary.inserted += 1;
            }
        }
    }
    summary
}

/// Applies item property changes.
///
/// Each property takes the changed value when present, else the value from
/// `current`, else the record keeps what it has.
pub fn apply_property_edits(
    record: &mut ItemRecord,
    changes: &PropertyChanges,
    current: Option<&ItemDefinition>,
) {
    if let Some(name) = changes
        .name
        .clone()
        .or_else(|| current.map(|definition| definition.name.clone()))
    {
        record.name = name;
    }
    if let Some(template_id) = changes
        .template_id
        .or_else(|| current.map(|definition| definition.template_id))
    {
        record.template_id = template_id;
    }
    if let Some(branch_id) = changes
        .branch_id
        .or_else(|| current.map(|definition| definition.branch_id))
    {
        record.branch_id = branch_id;
    }
}

fn find_target(
    fields: &FieldMap,
    field_id: FieldId,
    scope: &VersionPoint,
) -> Option<FieldCoordinate> {
    let exact = FieldCoordinate::at(field_id, scope);
    if fields.contains(&exact) {
        return Some(exact);
    }
    fields
        .matching(scope)
        .map(|(coordinate, _)| coordinate)
        .find(|coordinate| coordinate.field_id() == field_id)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::{apply_field_edits, apply_property_edits, FieldEdit, PropertyChanges};
    use crate::model::coordinate::FieldCoordinate;
    use crate::model::item::{FieldMap, ItemDefinition, ItemRecord};
    use uuid::Uuid;

    #[test]
    fn set_inserts_then_updates_in_place() {
        let field = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut fields = FieldMap::new();

        let first = apply_field_edits(
            &mut fields,
            &[
                FieldEdit::set(field, Some("en"), Some(1), "hello"),
                FieldEdit::set(other, Some("en"), Some(1), "other"),
            ],
        );
        assert_eq!(first.inserted, 2);

        let second =
            apply_field_edits(&mut fields, &[FieldEdit::set(field, Some("en"), Some(1), "bye")]);
        assert_eq!(second.updated, 1);
        assert_eq!(second.inserted, 0);

        let keys: Vec<_> = fields.keys().cloned().collect();
        assert_eq!(keys[0], FieldCoordinate::new(field, Some("en"), Some(1)));
        assert_eq!(fields.get(&keys[0]), Some("bye"));
    }

    #[test]
    fn removing_missing_slot_is_noop() {
        let field = Uuid::new_v4();
        let mut fields = FieldMap::new();
        fields.insert(FieldCoordinate::new(field, Some("de"), Some(1)), "x");

        let summary =
            apply_field_edits(&mut fields, &[FieldEdit::remove(field, Some("en"), Some(1))]);
        assert_eq!(summary.total(), 0);
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn shared_and_unversioned_flags_drop_axes() {
        let field = Uuid::new_v4();
        let mut fields = FieldMap::new();

        apply_field_edits(
            &mut fields,
            &[FieldEdit::set(field, Some("en"), Some(3), "logo")
                .shared()
                .unversioned()],
        );
        assert_eq!(fields.get(&FieldCoordinate::shared(field)), Some("logo"));

        apply_field_edits(
            &mut fields,
            &[FieldEdit::set(field, Some("de"), Some(7), "new-logo")
                .shared()
                .unversioned()],
        );
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get(&FieldCoordinate::shared(field)), Some("new-logo"));
    }

    #[test]
    fn exact_slot_wins_over_earlier_visible_slot() {
        let field = Uuid::new_v4();
        let mut fields = FieldMap::new();
        fields.insert(FieldCoordinate::new(field, Some("en"), None), "unversioned");
        fields.insert(FieldCoordinate::new(field, Some("en"), Some(1)), "versioned");

        apply_field_edits(&mut fields, &[FieldEdit::set(field, Some("en"), Some(1), "edited")]);

        assert_eq!(
            fields.get(&FieldCoordinate::new(field, Some("en"), None)),
            Some("unversioned")
        );
        assert_eq!(
            fields.get(&FieldCoordinate::new(field, Some("en"), Some(1))),
            Some("edited")
        );
    }

    #[test]
    fn falls_back_to_first_visible_slot_of_same_field() {
        let field = Uuid::new_v4();
        let mut fields = FieldMap::new();
        fields.insert(FieldCoordinate::new(field, Some("en"), None), "legacy");

        let summary =
            apply_field_edits(&mut fields, &[FieldEdit::set(field, Some("en"), Some(2), "v2")]);

        assert_eq!(summary.updated, 1);
        assert_eq!(fields.len(), 1);
        assert_eq!(
            fields.get(&FieldCoordinate::new(field, Some("en"), None)),
            Some("v2")
        );
    }

    #[test]
    fn property_edits_fall_back_to_current_definition() {
        let template = Uuid::new_v4();
        let mut record = ItemRecord::new(Uuid::new_v4(), "old", template, None);
        let current = ItemDefinition {
            id: record.id,
            name: "current".to_string(),
            template_id: template,
            branch_id: Uuid::nil(),
        };
        let new_template = Uuid::new_v4();

        apply_property_edits(
            &mut record,
            &PropertyChanges {
                name: None,
                template_id: Some(new_template),
                branch_id: None,
            },
            Some(&current),
        );

        assert_eq!(record.name, "current");
        assert_eq!(record.template_id, new_template);
        assert!(record.branch_id.is_nil());
    }

    #[test]
    fn property_edits_without_current_keep_record_values() {
        let mut record = ItemRecord::new(Uuid::new_v4(), "keep", Uuid::new_v4(), None);
        apply_property_edits(
            &mut record,
            &PropertyChanges {
                name: Some("renamed".to_string()),
                ..PropertyChanges::default()
            },
            None,
        );
        assert_eq!(record.name, "renamed");
    }
}
