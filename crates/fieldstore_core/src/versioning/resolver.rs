//! Version list and version allocation.
//!
//! # Invariants
//! - Only slots with both a language and a version contribute to version lists.
//! - A branched version is numbered one past the highest version among the
//!   slots visible from its base.
//! - A blank version is always version 1 of its language.
//! - Every new version owns at least one slot.

use crate::model::coordinate::{FieldCoordinate, VersionPoint};
use crate::model::item::{ItemRecord, CREATED_FIELD_ID};

/// Version number of a freshly allocated blank version.
const FIRST_VERSION: i32 = 1;

/// Lists distinct (language, version) points present in `record`.
///
/// Order follows the first slot seen for each point.
pub fn list_versions(record: &ItemRecord) -> Vec<VersionPoint> {
    let mut versions: Vec<VersionPoint> = Vec::new();
    for point in record.fields.keys().filter_map(FieldCoordinate::version_point) {
        if !versions.contains(&point) {
            versions.push(point);
        }
    }
    versions
}

/// Adds a new version to `record` and returns its number.
///
/// With a positive base version present in the record, every slot visible
/// from `base` is copied to `max + 1`, where `max` is the highest version
/// among those slots. Copies keep their field and language; a copy landing
/// on an existing slot overwrites its value. Otherwise a blank version 1 is
/// allocated, holding only an empty created-marker slot.
pub fn next_version(record: &mut ItemRecord, base: &VersionPoint) -> i32 {
    if base.version().is_some() {
        let sources: Vec<(FieldCoordinate, String)> = record
            .fields
            .matching(base)
            .map(|(coordinate, value)| (coordinate.clone(), value.to_string()))
            .collect();

        let highest = sources
            .iter()
            .filter_map(|(coordinate, _)| coordinate.version())
            .max()
            .filter(|version| *version > 0);

        if let Some(highest) = highest {
            let number = highest + 1;
            for (coordinate, value) in sources {
                record.fields.insert(coordinate.with_version(number), value);
            }
            return number;
        }
    }

    allocate_blank_version(record, base.language())
}

fn allocate_blank_version(record: &mut ItemRecord, language: Option<&str>) -> i32 {
    record.fields.insert(
        FieldCoordinate::new(CREATED_FIELD_ID, language, Some(FIRST_VERSION)),
        String::new(),
    );
    FIRST_VERSION
}
