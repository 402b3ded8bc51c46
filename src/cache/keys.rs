//! Cache key scheme.
//!
//! Keys are plain strings so every backend (Redis included) can store them
//! verbatim. Single-entity keys use the singular kind tag (`user:<id>`), list
//! keys the plural (`users:list:...`), which keeps the two families disjoint
//! under glob matching.

use std::fmt;

use uuid::Uuid;

use crate::domain::types::EntityKind;

/// Which family of entries a key or pattern belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyScope {
    Single,
    List,
}

impl KeyScope {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyScope::Single => "single",
            KeyScope::List => "list",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: EntityKind,
    scope: KeyScope,
    raw: String,
}

impl CacheKey {
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn scope(&self) -> KeyScope {
        self.scope
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Glob expression (`*` only) selecting a family of keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvalidationPattern {
    kind: EntityKind,
    scope: KeyScope,
    raw: String,
}

impl InvalidationPattern {
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn scope(&self) -> KeyScope {
        self.scope
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, key: &str) -> bool {
        glob_match(&self.raw, key)
    }
}

impl fmt::Display for InvalidationPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

pub fn single_key(kind: EntityKind, id: Uuid) -> CacheKey {
    CacheKey {
        kind,
        scope: KeyScope::Single,
        raw: format!("{}:{id}", kind.as_str()),
    }
}

pub fn list_key(kind: EntityKind, page: u32, limit: u32) -> CacheKey {
    CacheKey {
        kind,
        scope: KeyScope::List,
        raw: format!("{}:list:page:{page}:limit:{limit}", kind.plural()),
    }
}

/// Users referencing one category. Lives in the user list family.
pub fn category_members_key(category_id: Uuid, page: u32, limit: u32) -> CacheKey {
    let kind = EntityKind::User;
    CacheKey {
        kind,
        scope: KeyScope::List,
        raw: format!(
            "{}:list:category:{category_id}:page:{page}:limit:{limit}",
            kind.plural()
        ),
    }
}

pub fn list_pattern(kind: EntityKind) -> InvalidationPattern {
    InvalidationPattern {
        kind,
        scope: KeyScope::List,
        raw: format!("{}:list:*", kind.plural()),
    }
}

pub fn singles_pattern(kind: EntityKind) -> InvalidationPattern {
    InvalidationPattern {
        kind,
        scope: KeyScope::Single,
        raw: format!("{}:*", kind.as_str()),
    }
}

/// Iterative `*` glob with single-star backtracking.
fn glob_match(pattern: &str, candidate: &str) -> bool {
    let pattern = pattern.as_bytes();
    let candidate = candidate.as_bytes();
    let (mut p, mut c) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while c < candidate.len() {
        if p < pattern.len() && pattern[p] == b'*' {
            star = Some((p, c));
            p += 1;
        } else if p < pattern.len() && pattern[p] == candidate[c] {
            p += 1;
            c += 1;
        } else if let Some((star_p, star_c)) = star {
            p = star_p + 1;
            c = star_c + 1;
            star = Some((star_p, star_c + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|byte| *byte == b'*')
}
