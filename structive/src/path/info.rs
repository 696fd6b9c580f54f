//! Canonical path patterns.
//!
//! A pattern is a dot-separated sequence of segments where each segment
//! is a name or `*`. Patterns are hash-consed: equal strings share one
//! `Rc<StructuredPathInfo>`, so identity comparison is enough everywhere
//! downstream. The intern table is append-only and thread-local.

use crate::error::{ErrorCode, Result, StructiveError};
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Upper bound on `*` segments in one pattern.
pub const MAX_WILDCARDS: usize = 32;

/// Segment names that would collide with prototype machinery in the
/// template surface; rejected outright.
const RESERVED_WORDS: &[&str] = &[
    "constructor",
    "prototype",
    "__proto__",
    "toString",
    "valueOf",
    "hasOwnProperty",
    "isPrototypeOf",
    "propertyIsEnumerable",
    "toLocaleString",
];

/// Parsed, interned form of one pattern.
pub struct StructuredPathInfo {
    pub id: u32,
    pub pattern: Rc<str>,
    pub path_segments: Vec<Rc<str>>,
    pub last_segment: Rc<str>,
    pub parent_path: Option<Rc<str>>,
    pub parent_info: Option<Rc<StructuredPathInfo>>,
    /// Every non-empty prefix of the pattern, shortest first.
    pub cumulative_paths: Vec<Rc<str>>,
    pub cumulative_path_set: FxHashSet<Rc<str>>,
    /// Cumulative prefixes ending in `*`, in order.
    pub wildcard_paths: Vec<Rc<str>>,
    /// For each wildcard, the prefix one segment before it (the
    /// list-bearing path).
    pub wildcard_parent_paths: Vec<Rc<str>>,
    pub wildcard_count: usize,
    pub last_wildcard_path: Option<Rc<str>>,
    /// Wildcard-prefix pattern to its 0-based ordinal in this pattern's
    /// wildcard hierarchy.
    pub index_by_wildcard_path: FxHashMap<Rc<str>, usize>,
    children: RefCell<FxHashMap<Rc<str>, Rc<StructuredPathInfo>>>,
}

impl StructuredPathInfo {
    pub fn has_wildcard(&self) -> bool {
        self.wildcard_count > 0
    }

    pub fn last_wildcard_info(&self) -> Option<Rc<StructuredPathInfo>> {
        self.last_wildcard_path
            .as_ref()
            .and_then(|p| get_structured_path_info(p).ok())
    }

    pub fn child(&self, segment: &str) -> Option<Rc<StructuredPathInfo>> {
        self.children.borrow().get(segment).cloned()
    }

    pub fn children(&self) -> Vec<Rc<StructuredPathInfo>> {
        self.children.borrow().values().cloned().collect()
    }

    fn add_child(&self, segment: Rc<str>, info: Rc<StructuredPathInfo>) {
        self.children.borrow_mut().entry(segment).or_insert(info);
    }
}

impl PartialEq for StructuredPathInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for StructuredPathInfo {}

impl std::hash::Hash for StructuredPathInfo {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for StructuredPathInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StructuredPathInfo({})", self.pattern)
    }
}

impl fmt::Display for StructuredPathInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

thread_local! {
    static INFO_CACHE: RefCell<FxHashMap<Rc<str>, Rc<StructuredPathInfo>>> =
        RefCell::new(FxHashMap::default());
    static NEXT_INFO_ID: Cell<u32> = const { Cell::new(1) };
}

/// Intern a pattern. Equal pattern strings always return the same
/// instance; the cache is never invalidated.
pub fn get_structured_path_info(pattern: &str) -> Result<Rc<StructuredPathInfo>> {
    if let Some(hit) = INFO_CACHE.with(|cache| cache.borrow().get(pattern).cloned()) {
        return Ok(hit);
    }

    let segments: Vec<&str> = pattern.split('.').collect();
    for segment in &segments {
        if segment.is_empty() {
            return Err(StructiveError::new(
                ErrorCode::PathEmptySegment,
                format!("pattern \"{pattern}\" contains an empty segment"),
            )
            .with_context(json!({ "pattern": pattern })));
        }
        if *segment != "*" && RESERVED_WORDS.contains(segment) {
            return Err(StructiveError::new(
                ErrorCode::PathReservedWord,
                format!("pattern \"{pattern}\" uses reserved segment \"{segment}\""),
            )
            .with_context(json!({ "pattern": pattern, "segment": segment })));
        }
    }
    if segments[0] == "*" {
        return Err(StructiveError::new(
            ErrorCode::PathEmptySegment,
            format!("pattern \"{pattern}\" has no list-bearing path before its wildcard"),
        )
        .with_context(json!({ "pattern": pattern })));
    }
    let wildcard_count = segments.iter().filter(|s| **s == "*").count();
    if wildcard_count > MAX_WILDCARDS {
        return Err(StructiveError::new(
            ErrorCode::PathWildcardLimit,
            format!("pattern \"{pattern}\" exceeds {MAX_WILDCARDS} wildcards"),
        )
        .with_context(json!({ "pattern": pattern, "wildcards": wildcard_count })));
    }

    let parent_path_string = if segments.len() > 1 {
        Some(segments[..segments.len() - 1].join("."))
    } else {
        None
    };
    let parent_info = match &parent_path_string {
        Some(parent) => Some(get_structured_path_info(parent)?),
        None => None,
    };

    let path_segments: Vec<Rc<str>> = segments.iter().map(|s| Rc::from(*s)).collect();
    let last_segment = path_segments[path_segments.len() - 1].clone();

    let mut cumulative_paths: Vec<Rc<str>> = Vec::with_capacity(segments.len());
    let mut acc = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            acc.push('.');
        }
        acc.push_str(segment);
        cumulative_paths.push(Rc::from(acc.as_str()));
    }
    let cumulative_path_set: FxHashSet<Rc<str>> = cumulative_paths.iter().cloned().collect();

    let mut wildcard_paths = Vec::new();
    let mut wildcard_parent_paths = Vec::new();
    let mut index_by_wildcard_path = FxHashMap::default();
    for (i, segment) in segments.iter().enumerate() {
        if *segment == "*" {
            let wildcard_path = cumulative_paths[i].clone();
            index_by_wildcard_path.insert(wildcard_path.clone(), wildcard_paths.len());
            wildcard_paths.push(wildcard_path);
            wildcard_parent_paths.push(cumulative_paths[i - 1].clone());
        }
    }
    let last_wildcard_path = wildcard_paths.last().cloned();

    let id = NEXT_INFO_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    });

    let info = Rc::new(StructuredPathInfo {
        id,
        pattern: Rc::from(pattern),
        path_segments,
        last_segment: last_segment.clone(),
        parent_path: parent_info.as_ref().map(|p| p.pattern.clone()),
        parent_info: parent_info.clone(),
        cumulative_paths,
        cumulative_path_set,
        wildcard_paths,
        wildcard_parent_paths,
        wildcard_count,
        last_wildcard_path,
        index_by_wildcard_path,
        children: RefCell::new(FxHashMap::default()),
    });

    if let Some(parent) = &parent_info {
        parent.add_child(last_segment, info.clone());
    }

    INFO_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .insert(info.pattern.clone(), info.clone())
    });
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_returns_the_same_instance() {
        let a = get_structured_path_info("items.*.name").unwrap();
        let b = get_structured_path_info("items.*.name").unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn cumulative_paths_are_prefixes() {
        let info = get_structured_path_info("items.*.name").unwrap();
        let paths: Vec<&str> = info.cumulative_paths.iter().map(|p| p.as_ref()).collect();
        assert_eq!(paths, vec!["items", "items.*", "items.*.name"]);
        assert!(info.cumulative_path_set.contains("items.*"));
    }

    #[test]
    fn wildcard_hierarchy_is_derived() {
        let info = get_structured_path_info("a.*.b.*.c").unwrap();
        assert_eq!(info.wildcard_count, 2);
        assert_eq!(info.wildcard_count, info.wildcard_paths.len());
        let wildcards: Vec<&str> = info.wildcard_paths.iter().map(|p| p.as_ref()).collect();
        assert_eq!(wildcards, vec!["a.*", "a.*.b.*"]);
        let parents: Vec<&str> = info
            .wildcard_parent_paths
            .iter()
            .map(|p| p.as_ref())
            .collect();
        assert_eq!(parents, vec!["a", "a.*.b"]);
        assert_eq!(info.index_by_wildcard_path.get("a.*"), Some(&0));
        assert_eq!(info.index_by_wildcard_path.get("a.*.b.*"), Some(&1));
        assert_eq!(info.last_wildcard_path.as_deref(), Some("a.*.b.*"));
    }

    #[test]
    fn parent_chain_is_interned() {
        let info = get_structured_path_info("user.address.city").unwrap();
        let parent = info.parent_info.clone().unwrap();
        assert_eq!(parent.pattern.as_ref(), "user.address");
        assert_eq!(info.parent_path.as_deref(), Some("user.address"));
        let again = get_structured_path_info("user.address").unwrap();
        assert!(Rc::ptr_eq(&parent, &again));
        assert!(parent.child("city").is_some());
    }

    #[test]
    fn validation_rejects_malformed_patterns() {
        assert_eq!(
            get_structured_path_info("a..b").unwrap_err().code,
            ErrorCode::PathEmptySegment
        );
        assert_eq!(
            get_structured_path_info("a.__proto__").unwrap_err().code,
            ErrorCode::PathReservedWord
        );
        assert_eq!(
            get_structured_path_info("*.name").unwrap_err().code,
            ErrorCode::PathEmptySegment
        );
        let deep = vec!["x"; 1]
            .into_iter()
            .chain(std::iter::repeat("*").take(MAX_WILDCARDS + 1))
            .collect::<Vec<_>>()
            .join(".");
        assert_eq!(
            get_structured_path_info(&deep).unwrap_err().code,
            ErrorCode::PathWildcardLimit
        );
    }
}
