//! Shared domain enumerations and value wrappers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// The entity kinds managed by the directory.
///
/// Each kind owns an independent family of cache entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Category,
}

impl EntityKind {
    pub const ALL: [EntityKind; 2] = [EntityKind::User, EntityKind::Category];

    /// Singular tag used for per-entity cache keys.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Category => "category",
        }
    }

    /// Plural tag used for collection cache keys.
    pub fn plural(self) -> &'static str {
        match self {
            EntityKind::User => "users",
            EntityKind::Category => "categories",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entity kind `{0}`")]
pub struct UnknownEntityKind(pub String);

impl FromStr for EntityKind {
    type Err = UnknownEntityKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" | "users" => Ok(EntityKind::User),
            "category" | "categories" | "category-user" | "category-users" => {
                Ok(EntityKind::Category)
            }
            other => Err(UnknownEntityKind(other.to_string())),
        }
    }
}

/// A single field of a partial update: either left untouched or replaced.
///
/// For nullable columns use `FieldUpdate<Option<T>>`, where `Set(None)` clears
/// the stored value. When deserialized with `#[serde(default)]`, a missing key
/// becomes `Unchanged` and an explicit `null` becomes `Set(None)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    Unchanged,
    Set(T),
}

impl<T> Default for FieldUpdate<T> {
    fn default() -> Self {
        FieldUpdate::Unchanged
    }
}

impl<T> FieldUpdate<T> {
    pub fn as_set(&self) -> Option<&T> {
        match self {
            FieldUpdate::Set(value) => Some(value),
            FieldUpdate::Unchanged => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FieldUpdate<U> {
        match self {
            FieldUpdate::Set(value) => FieldUpdate::Set(f(value)),
            FieldUpdate::Unchanged => FieldUpdate::Unchanged,
        }
    }

    /// Resolve against the current value: the new value when set, else `current`.
    pub fn apply(self, current: T) -> T {
        match self {
            FieldUpdate::Set(value) => value,
            FieldUpdate::Unchanged => current,
        }
    }
}

impl<'de, T> Deserialize<'de> for FieldUpdate<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(FieldUpdate::Set)
    }
}
