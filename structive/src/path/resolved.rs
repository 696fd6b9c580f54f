//! Concrete access strings.
//!
//! An access string may carry numeric indices in place of wildcards
//! (`items.3.name`). Resolution normalises those back to `*` for the
//! underlying pattern and classifies how the wildcards are filled.

use super::info::{get_structured_path_info, StructuredPathInfo};
use crate::error::Result;
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// How the wildcards of an access string are specified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WildcardType {
    /// No wildcards at all.
    None,
    /// Every wildcard left as `*`, to be filled from the loop context.
    Context,
    /// Every wildcard given as an explicit numeric index.
    All,
    /// A mix of explicit indices and context wildcards.
    Partial,
}

/// Interned classification of one access string.
pub struct ResolvedPathInfo {
    pub id: u32,
    /// The original access string.
    pub name: Rc<str>,
    /// The normalised pattern's info.
    pub info: Rc<StructuredPathInfo>,
    pub wildcard_type: WildcardType,
    /// One entry per wildcard: `Some(n)` when the access string spelled a
    /// numeric index at that position.
    pub wildcard_indexes: Vec<Option<usize>>,
}

impl fmt::Debug for ResolvedPathInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResolvedPathInfo({} -> {})", self.name, self.info.pattern)
    }
}

thread_local! {
    static RESOLVED_CACHE: RefCell<FxHashMap<Rc<str>, Rc<ResolvedPathInfo>>> =
        RefCell::new(FxHashMap::default());
    static NEXT_RESOLVED_ID: Cell<u32> = const { Cell::new(1) };
}

/// Intern an access string. Equal strings share one instance.
pub fn get_resolved_path_info(name: &str) -> Result<Rc<ResolvedPathInfo>> {
    if let Some(hit) = RESOLVED_CACHE.with(|cache| cache.borrow().get(name).cloned()) {
        return Ok(hit);
    }

    let mut wildcard_indexes = Vec::new();
    let mut pattern = String::with_capacity(name.len());
    for (i, segment) in name.split('.').enumerate() {
        if i > 0 {
            pattern.push('.');
        }
        if segment == "*" {
            wildcard_indexes.push(None);
            pattern.push('*');
        } else if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            wildcard_indexes.push(segment.parse::<usize>().ok());
            pattern.push('*');
        } else {
            pattern.push_str(segment);
        }
    }

    let info = get_structured_path_info(&pattern)?;
    let wildcard_type = if wildcard_indexes.is_empty() {
        WildcardType::None
    } else if wildcard_indexes.iter().all(|i| i.is_some()) {
        WildcardType::All
    } else if wildcard_indexes.iter().all(|i| i.is_none()) {
        WildcardType::Context
    } else {
        WildcardType::Partial
    };

    let id = NEXT_RESOLVED_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    });
    let resolved = Rc::new(ResolvedPathInfo {
        id,
        name: Rc::from(name),
        info,
        wildcard_type,
        wildcard_indexes,
    });
    RESOLVED_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .insert(resolved.name.clone(), resolved.clone())
    });
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_segments_normalise_to_wildcards() {
        let resolved = get_resolved_path_info("items.3.name").unwrap();
        assert_eq!(resolved.info.pattern.as_ref(), "items.*.name");
        assert_eq!(resolved.wildcard_type, WildcardType::All);
        assert_eq!(resolved.wildcard_indexes, vec![Some(3)]);
    }

    #[test]
    fn classification_covers_all_shapes() {
        assert_eq!(
            get_resolved_path_info("user.name").unwrap().wildcard_type,
            WildcardType::None
        );
        assert_eq!(
            get_resolved_path_info("items.*.name").unwrap().wildcard_type,
            WildcardType::Context
        );
        assert_eq!(
            get_resolved_path_info("rows.1.cols.*").unwrap().wildcard_type,
            WildcardType::Partial
        );
    }

    #[test]
    fn resolution_is_interned() {
        let a = get_resolved_path_info("items.0.name").unwrap();
        let b = get_resolved_path_info("items.0.name").unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        // Different spellings of the same pattern share the pattern info.
        let c = get_resolved_path_info("items.*.name").unwrap();
        assert!(Rc::ptr_eq(&a.info, &c.info));
    }
}
