//! Field slot addressing.
//!
//! # Responsibility
//! - Identify one field slot by field id plus optional language/version axes.
//! - Decide whether a slot is visible from a concrete (language, version) point.
//!
//! # Invariants
//! - A missing axis on a coordinate matches every value of that axis.
//! - Coordinates compare and hash by value; they are used as map keys.
//! - Stored versions are always positive; `<= 0` means "no version axis".

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a field definition.
pub type FieldId = Uuid;

/// Immutable key of one field slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawCoordinate")]
pub struct FieldCoordinate {
    field_id: FieldId,
    language: Option<String>,
    version: Option<i32>,
}

impl FieldCoordinate {
    /// Creates a coordinate, dropping blank languages and non-positive versions.
    pub fn new(field_id: FieldId, language: Option<&str>, version: Option<i32>) -> Self {
        Self {
            field_id,
            language: normalize_language(language),
            version: normalize_version(version),
        }
    }

    /// Shared, unversioned slot of `field_id`.
    pub fn shared(field_id: FieldId) -> Self {
        Self::new(field_id, None, None)
    }

    /// Slot of `field_id` at the axes of `point`.
    pub fn at(field_id: FieldId, point: &VersionPoint) -> Self {
        Self::new(field_id, point.language(), point.version())
    }

    pub fn field_id(&self) -> FieldId {
        self.field_id
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn version(&self) -> Option<i32> {
        self.version
    }

    /// Returns the same slot moved to another version number.
    pub fn with_version(&self, version: i32) -> Self {
        Self::new(self.field_id, self.language(), Some(version))
    }

    /// Returns whether this slot is visible from `point`.
    ///
    /// Both axes must match; an axis missing on the coordinate matches anything.
    pub fn matches(&self, point: &VersionPoint) -> bool {
        let language_matches = match self.language() {
            None => true,
            Some(language) => point.language() == Some(language),
        };
        let version_matches = match self.version {
            None => true,
            Some(version) => point.version() == Some(version),
        };
        language_matches && version_matches
    }

    /// Ranks how many axes this coordinate pins down.
    ///
    /// Used to pick the most specific slot when several are visible at once.
    pub fn specificity(&self) -> u8 {
        match (self.language.is_some(), self.version.is_some()) {
            (true, true) => 3,
            (true, false) => 2,
            (false, true) => 1,
            (false, false) => 0,
        }
    }

    /// Returns the concrete version point this slot lives at, if fully scoped.
    pub fn version_point(&self) -> Option<VersionPoint> {
        match (self.language(), self.version) {
            (Some(language), Some(version)) => Some(VersionPoint::new(language, version)),
            _ => None,
        }
    }
}

/// Wire form of [`FieldCoordinate`], normalized on conversion.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCoordinate {
    field_id: FieldId,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    version: Option<i32>,
}

impl From<RawCoordinate> for FieldCoordinate {
    fn from(raw: RawCoordinate) -> Self {
        Self::new(raw.field_id, raw.language.as_deref(), raw.version)
    }
}

impl Display for FieldCoordinate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}@{}#{}",
            self.field_id,
            self.language().unwrap_or("*"),
            self.version
                .map_or_else(|| "*".to_string(), |version| version.to_string())
        )
    }
}

/// A (language, version) query point.
///
/// Concrete points carry both axes. Edit scopes may leave either axis unset,
/// which then only matches coordinates that also leave it unset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawPoint")]
pub struct VersionPoint {
    language: Option<String>,
    version: Option<i32>,
}

impl VersionPoint {
    /// Concrete point in `language` at `version`.
    pub fn new(language: impl Into<String>, version: i32) -> Self {
        Self {
            language: normalize_language(Some(language.into().as_str())),
            version: normalize_version(Some(version)),
        }
    }

    /// Point with optional axes.
    pub fn scope(language: Option<&str>, version: Option<i32>) -> Self {
        Self {
            language: normalize_language(language),
            version: normalize_version(version),
        }
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn version(&self) -> Option<i32> {
        self.version
    }
}

#[derive(Deserialize)]
struct RawPoint {
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    version: Option<i32>,
}

impl From<RawPoint> for VersionPoint {
    fn from(raw: RawPoint) -> Self {
        Self::scope(raw.language.as_deref(), raw.version)
    }
}

impl Display for VersionPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}#{}",
            self.language().unwrap_or("*"),
            self.version
                .map_or_else(|| "*".to_string(), |version| version.to_string())
        )
    }
}

fn normalize_language(language: Option<&str>) -> Option<String> {
    language
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn normalize_version(version: Option<i32>) -> Option<i32> {
    version.filter(|value| *value > 0)
}
