//! Write-to-invalidation rules.
//!
//! Every successful write yields an [`InvalidationPlan`]; the plan is a pure
//! value so the rules can be inspected without a backend.

use std::fmt;

use uuid::Uuid;

use crate::domain::types::EntityKind;

use super::keys::{CacheKey, InvalidationPattern, list_pattern, single_key, singles_pattern};

/// A completed mutation against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Create,
    Update(Uuid),
    Delete(Uuid),
}

impl WriteOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteOp::Create => "create",
            WriteOp::Update(_) => "update",
            WriteOp::Delete(_) => "delete",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    keys: Vec<CacheKey>,
    patterns: Vec<InvalidationPattern>,
}

impl InvalidationPlan {
    /// Entries made stale by `op` on an entity of `kind`.
    ///
    /// Inserts shift every page, so lists are always dropped wholesale. A
    /// category delete also clears the user family because the store nulls
    /// the reference on every user that pointed at it.
    pub fn for_write(kind: EntityKind, op: WriteOp) -> Self {
        let mut plan = Self::default();
        match op {
            WriteOp::Create => {}
            WriteOp::Update(id) | WriteOp::Delete(id) => plan.keys.push(single_key(kind, id)),
        }
        plan.patterns.push(list_pattern(kind));

        if let (EntityKind::Category, WriteOp::Delete(_)) = (kind, op) {
            plan.patterns.push(singles_pattern(EntityKind::User));
            plan.patterns.push(list_pattern(EntityKind::User));
        }
        plan
    }

    pub fn keys(&self) -> &[CacheKey] {
        &self.keys
    }

    pub fn patterns(&self) -> &[InvalidationPattern] {
        &self.patterns
    }
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.keys.iter().map(CacheKey::as_str).collect();
        let patterns: Vec<&str> = self.patterns.iter().map(InvalidationPattern::as_str).collect();
        write!(
            f,
            "InvalidationPlan {{ keys: [{}], patterns: [{}] }}",
            keys.join(", "),
            patterns.join(", ")
        )
    }
}
